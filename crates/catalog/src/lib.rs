use std::collections::HashSet;

use client::{ApiFuture, FetchError, Generation, LayerApi};
use formats::LayerRef;
use tracing::{debug, info, warn};

/// A layer-list fetch started by [`LayerCatalog::begin_load`].
pub struct CatalogLoad {
    pub generation: Generation,
    pub fetch: ApiFuture<Vec<LayerRef>>,
}

/// What [`LayerCatalog::finish_load`] did with a settled fetch.
#[derive(Debug, PartialEq)]
pub enum LoadOutcome<'a> {
    /// The list was replaced. Carries the default selection, if any.
    Loaded(Option<&'a LayerRef>),
    /// The list was emptied and the error kept.
    Failed(&'a FetchError),
    /// A later load was started; this result was dropped.
    Superseded,
}

/// Layers the user can pick from, in the order the server lists them.
///
/// The first entry is the default selection. Only the most recently started
/// load may change the list; it stays loading while any fetch is in flight.
#[derive(Debug, Default)]
pub struct LayerCatalog {
    layers: Vec<LayerRef>,
    generation: Generation,
    in_flight: usize,
    error: Option<FetchError>,
}

impl LayerCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues one fetch of the layer list. There is no retry; call again.
    pub fn begin_load<A: LayerApi + ?Sized>(&mut self, api: &A) -> CatalogLoad {
        self.generation = self.generation.next();
        self.in_flight += 1;
        CatalogLoad {
            generation: self.generation,
            fetch: api.list_layers(),
        }
    }

    /// Stores the outcome of a fetch started by [`Self::begin_load`].
    pub fn finish_load(
        &mut self,
        generation: Generation,
        result: Result<Vec<LayerRef>, FetchError>,
    ) -> LoadOutcome<'_> {
        self.in_flight = self.in_flight.saturating_sub(1);
        if generation != self.generation {
            debug!(generation = generation.0, latest = self.generation.0, "superseded layer list dropped");
            return LoadOutcome::Superseded;
        }
        match result {
            Ok(layers) => {
                self.layers = dedup_by_name(layers);
                self.error = None;
                info!(count = self.layers.len(), "layer catalog loaded");
                LoadOutcome::Loaded(self.layers.first())
            }
            Err(err) => {
                warn!(error = %err, "layer catalog failed");
                self.layers.clear();
                LoadOutcome::Failed(&*self.error.insert(err))
            }
        }
    }

    pub async fn load<A: LayerApi + ?Sized>(&mut self, api: &A) -> LoadOutcome<'_> {
        let CatalogLoad { generation, fetch } = self.begin_load(api);
        let result = fetch.await;
        self.finish_load(generation, result)
    }

    pub fn layers(&self) -> &[LayerRef] {
        &self.layers
    }

    pub fn first(&self) -> Option<&LayerRef> {
        self.layers.first()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.layers.iter().any(|l| l.name == name)
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight > 0
    }

    pub fn error(&self) -> Option<&FetchError> {
        self.error.as_ref()
    }
}

fn dedup_by_name(layers: Vec<LayerRef>) -> Vec<LayerRef> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(layers.len());
    for layer in layers {
        if seen.insert(layer.name.clone()) {
            out.push(layer);
        } else {
            warn!(layer = layer.name.as_str(), "duplicate layer name dropped");
        }
    }
    out
}
