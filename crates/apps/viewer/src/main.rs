use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use client::{DEFAULT_API_URL, InMemoryLayerApi, LayerApi};
use layers::{DEFAULT_CIRCLE_RADIUS_PX, InMemorySurface, MapSurface, PointRendering};
use tracing::info;
use tracing_subscriber::EnvFilter;
use viewer::{API_URL_ENV, ViewController, ViewerConfig, report};

#[derive(Debug, Parser)]
#[command(name = "gdb-viewer", about = "Browse the layers of a GDB layer service")]
struct Cli {
    /// Base url of the layer service.
    #[arg(long, env = API_URL_ENV, default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Serve layers from a fixture directory instead of the network.
    #[arg(long, value_name = "DIR")]
    fixtures: Option<PathBuf>,

    /// Layer to switch to after startup. Repeat to switch several times.
    #[arg(long = "layer", value_name = "NAME")]
    layers: Vec<String>,

    #[arg(long, value_enum, default_value_t = PointStyle::Circle)]
    points: PointStyle,

    /// Print the final state as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Copy, Clone, ValueEnum)]
enum PointStyle {
    Marker,
    Circle,
}

impl From<PointStyle> for PointRendering {
    fn from(style: PointStyle) -> Self {
        match style {
            PointStyle::Marker => PointRendering::Marker,
            PointStyle::Circle => PointRendering::CircleMarker {
                radius_px: DEFAULT_CIRCLE_RADIUS_PX,
            },
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match real_main(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn real_main(cli: Cli) -> Result<ExitCode, String> {
    let config = ViewerConfig::default()
        .with_api_base_url(cli.api_url.clone())
        .with_point_rendering(cli.points.into());
    let surface = InMemorySurface::new(config.map_view.clone());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("start runtime: {e}"))?;

    match &cli.fixtures {
        Some(dir) => {
            let api = InMemoryLayerApi::from_fixture_dir(dir).map_err(|e| e.to_string())?;
            info!(dir = %dir.display(), "serving layers from fixtures");
            let view = ViewController::new(api, surface, &config);
            runtime.block_on(run(view, &config, &cli))
        }
        None => {
            let view = ViewController::from_config(&config, surface).map_err(|e| e.to_string())?;
            info!(url = config.api_base_url.as_str(), "using layer service");
            runtime.block_on(run(view, &config, &cli))
        }
    }
}

async fn run<A: LayerApi, S: MapSurface>(
    mut view: ViewController<A, S>,
    config: &ViewerConfig,
    cli: &Cli,
) -> Result<ExitCode, String> {
    view.start();
    view.settle().await;

    for layer in &cli.layers {
        if view.catalog().error().is_some() {
            break;
        }
        if !view.catalog().contains(layer) {
            return Err(format!("unknown layer: {layer}"));
        }
        view.select(layer.clone());
        view.settle().await;
    }

    let snapshot = view.snapshot();
    if cli.json {
        let text = serde_json::to_string_pretty(&snapshot).map_err(|e| format!("encode state: {e}"))?;
        println!("{text}");
    } else {
        print!("{}", report::render(&snapshot, &config.map_view));
    }

    Ok(if snapshot.error.is_some() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
