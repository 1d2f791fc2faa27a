use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;
use std::rc::Rc;

use formats::{FeatureCollection, LayerRef, LayerSchema};
use futures_util::FutureExt as _;
use futures_util::future;

use crate::api::{ApiFuture, LayerApi};
use crate::error::FetchError;

pub const FIXTURE_LAYERS_FILE: &str = "layers.json";

/// One recorded invocation of the api.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    ListLayers,
    GeoJson(String),
    Schema(String),
}

#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    #[error("read {path}: {source}")]
    Io { path: String, source: io::Error },
    #[error("decode {path}: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },
    #[error("layer name {name:?} cannot be used as a fixture file name")]
    UnsafeName { name: String },
}

#[derive(Debug, Default)]
struct Responses {
    layers: Option<Result<Vec<LayerRef>, FetchError>>,
    geojson: HashMap<String, Result<FeatureCollection, FetchError>>,
    schema: HashMap<String, Result<LayerSchema, FetchError>>,
    calls: Vec<ApiCall>,
}

/// Layer service answered from memory.
///
/// Clones share the same responses and call log. Unknown layer names are
/// answered with a 404 status, like the real service does.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLayerApi {
    inner: Rc<RefCell<Responses>>,
}

impl InMemoryLayerApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `schema.name` to the layer list and serves both documents for it.
    pub fn with_layer(self, geojson: FeatureCollection, schema: LayerSchema) -> Self {
        {
            let mut inner = self.inner.borrow_mut();
            let name = schema.name.clone();
            if let Ok(layers) = inner.layers.get_or_insert_with(|| Ok(Vec::new())) {
                layers.push(LayerRef::new(name.clone()));
            }
            inner.geojson.insert(name.clone(), Ok(geojson));
            inner.schema.insert(name, Ok(schema));
        }
        self
    }

    pub fn set_layers(&self, result: Result<Vec<LayerRef>, FetchError>) {
        self.inner.borrow_mut().layers = Some(result);
    }

    pub fn set_geojson(&self, layer: &str, result: Result<FeatureCollection, FetchError>) {
        self.inner
            .borrow_mut()
            .geojson
            .insert(layer.to_string(), result);
    }

    pub fn set_schema(&self, layer: &str, result: Result<LayerSchema, FetchError>) {
        self.inner
            .borrow_mut()
            .schema
            .insert(layer.to_string(), result);
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.inner.borrow().calls.clone()
    }

    pub fn count_calls(&self, call: &ApiCall) -> usize {
        self.inner
            .borrow()
            .calls
            .iter()
            .filter(|c| *c == call)
            .count()
    }

    /// Loads `layers.json`, then `<name>.geojson` and `<name>.schema.json`
    /// for every listed layer. Missing per-layer files are served as 404s;
    /// undecodable ones as decode errors.
    pub fn from_fixture_dir(dir: impl AsRef<Path>) -> Result<Self, FixtureError> {
        let dir = dir.as_ref();
        let layers_path = dir.join(FIXTURE_LAYERS_FILE);
        let raw = read_fixture(&layers_path)?;
        let layers: Vec<LayerRef> =
            serde_json::from_slice(&raw).map_err(|source| FixtureError::Json {
                path: layers_path.display().to_string(),
                source,
            })?;

        let api = Self::new();
        for layer in &layers {
            if !is_plain_file_stem(&layer.name) {
                return Err(FixtureError::UnsafeName {
                    name: layer.name.clone(),
                });
            }
            let geojson_path = dir.join(format!("{}.geojson", layer.name));
            if geojson_path.is_file() {
                let raw = read_fixture(&geojson_path)?;
                let decoded = FeatureCollection::from_geojson_slice(&raw).map_err(FetchError::from);
                api.set_geojson(&layer.name, decoded);
            }

            let schema_path = dir.join(format!("{}.schema.json", layer.name));
            if schema_path.is_file() {
                let raw = read_fixture(&schema_path)?;
                let decoded =
                    serde_json::from_slice::<LayerSchema>(&raw).map_err(FetchError::from);
                api.set_schema(&layer.name, decoded);
            }
        }
        api.set_layers(Ok(layers));
        Ok(api)
    }

    fn record(&self, call: ApiCall) {
        self.inner.borrow_mut().calls.push(call);
    }
}

/// True when `name` cannot leave the fixture directory once joined to it.
fn is_plain_file_stem(name: &str) -> bool {
    !name.is_empty() && !name.contains(['/', '\\']) && !name.contains("..")
}

fn read_fixture(path: &Path) -> Result<Vec<u8>, FixtureError> {
    fs::read(path).map_err(|source| FixtureError::Io {
        path: path.display().to_string(),
        source,
    })
}

fn not_found<T>() -> Result<T, FetchError> {
    Err(FetchError::Status { status: 404 })
}

impl LayerApi for InMemoryLayerApi {
    fn list_layers(&self) -> ApiFuture<Vec<LayerRef>> {
        self.record(ApiCall::ListLayers);
        let result = self
            .inner
            .borrow()
            .layers
            .clone()
            .unwrap_or_else(|| Ok(Vec::new()));
        future::ready(result).boxed_local()
    }

    fn geojson(&self, layer: &str) -> ApiFuture<FeatureCollection> {
        self.record(ApiCall::GeoJson(layer.to_string()));
        let result = self
            .inner
            .borrow()
            .geojson
            .get(layer)
            .cloned()
            .unwrap_or_else(not_found);
        future::ready(result).boxed_local()
    }

    fn schema(&self, layer: &str) -> ApiFuture<LayerSchema> {
        self.record(ApiCall::Schema(layer.to_string()));
        let result = self
            .inner
            .borrow()
            .schema
            .get(layer)
            .cloned()
            .unwrap_or_else(not_found);
        future::ready(result).boxed_local()
    }
}

#[cfg(test)]
mod tests {
    use super::{ApiCall, FixtureError, InMemoryLayerApi};
    use crate::api::LayerApi;
    use crate::error::FetchError;
    use formats::{FeatureCollection, LayerRef, LayerSchema};
    use pretty_assertions::assert_eq;
    use std::fs;

    #[tokio::test]
    async fn serves_registered_layers_in_order() {
        let api = InMemoryLayerApi::new()
            .with_layer(FeatureCollection::default(), LayerSchema::new("sites", ["id"]))
            .with_layer(FeatureCollection::default(), LayerSchema::new("faults", ["id"]));

        let layers = api.list_layers().await.expect("layers");
        assert_eq!(layers, vec![LayerRef::new("sites"), LayerRef::new("faults")]);
        assert_eq!(
            api.schema("faults").await.expect("schema").properties,
            vec!["id".to_string()]
        );
    }

    #[tokio::test]
    async fn unknown_layers_are_not_found() {
        let api = InMemoryLayerApi::new();
        assert_eq!(
            api.geojson("nope").await,
            Err(FetchError::Status { status: 404 })
        );
    }

    #[tokio::test]
    async fn records_calls_when_issued() {
        let api = InMemoryLayerApi::new();
        let pending = api.geojson("a");
        let _ = api.schema("a");
        // Recorded before the first future is polled.
        assert_eq!(
            api.calls(),
            vec![ApiCall::GeoJson("a".into()), ApiCall::Schema("a".into())]
        );
        let _ = pending.await;
        assert_eq!(api.count_calls(&ApiCall::GeoJson("a".into())), 1);
    }

    #[tokio::test]
    async fn loads_fixture_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("layers.json"), r#"[{"name":"sites"},{"name":"faults"}]"#)
            .expect("write");
        fs::write(
            dir.path().join("sites.geojson"),
            r#"{"type":"FeatureCollection","features":[]}"#,
        )
        .expect("write");
        fs::write(dir.path().join("sites.schema.json"), r#"{"name":"sites","properties":["id"]}"#)
            .expect("write");
        fs::write(dir.path().join("faults.geojson"), "not json").expect("write");

        let api = InMemoryLayerApi::from_fixture_dir(dir.path()).expect("fixtures");
        assert_eq!(api.list_layers().await.expect("layers").len(), 2);
        assert!(api.geojson("sites").await.is_ok());
        assert!(matches!(api.geojson("faults").await, Err(FetchError::Decode(_))));
        assert_eq!(
            api.schema("faults").await,
            Err(FetchError::Status { status: 404 })
        );
    }

    #[test]
    fn missing_layer_list_is_an_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(matches!(
            InMemoryLayerApi::from_fixture_dir(dir.path()),
            Err(FixtureError::Io { .. })
        ));
    }

    #[test]
    fn layer_names_that_escape_the_directory_are_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        for name in ["../secrets", "nested/sites", "..", ""] {
            let listing = serde_json::json!([{ "name": name }]).to_string();
            fs::write(dir.path().join("layers.json"), listing).expect("write");
            assert!(
                matches!(
                    InMemoryLayerApi::from_fixture_dir(dir.path()),
                    Err(FixtureError::UnsafeName { name: ref rejected }) if rejected == name
                ),
                "{name:?} accepted"
            );
        }
    }
}
