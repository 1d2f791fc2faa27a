use std::fmt;

use catalog::{CatalogLoad, LayerCatalog, LoadOutcome};
use client::{FetchError, FetchKind, Generation, HttpLayerApi, LayerApi};
use formats::{CollectionSummary, LayerRef, LayerSchema};
use futures_util::future::LocalBoxFuture;
use futures_util::stream::{FuturesUnordered, StreamExt};
use futures_util::FutureExt as _;
use layers::MapSurface;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::ViewerConfig;
use crate::map_sync::{MapSync, RenderedHandle};
use crate::session::{LayerSession, SessionUpdate};

/// An unresolved fault, shown in place of the normal content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewError {
    pub kind: FetchKind,
    /// Layer whose fetch failed; `None` for the catalog.
    pub layer: Option<String>,
    pub message: String,
}

impl fmt::Display for ViewError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            FetchKind::Catalog => write!(f, "Error: {}", self.message),
            FetchKind::Geometry => write!(f, "Error loading map data: {}", self.message),
            FetchKind::Schema => write!(f, "Error loading layer schema: {}", self.message),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    CatalogLoaded {
        count: usize,
        selected: Option<String>,
    },
    CatalogFailed {
        error: FetchError,
    },
    /// A layer list arrived after a newer load was started and was dropped.
    CatalogSuperseded,
    Session(SessionUpdate),
}

/// Point-in-time state of everything the viewer shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewSnapshot {
    pub layers: Vec<String>,
    pub selected: Option<String>,
    pub busy: bool,
    pub error: Option<String>,
    pub schema: Option<LayerSchema>,
    pub summary: Option<CollectionSummary>,
    pub rendered_features: usize,
    pub undrawn_features: usize,
}

type CatalogFetch = LocalBoxFuture<'static, (Generation, Result<Vec<LayerRef>, FetchError>)>;

enum Completion {
    Catalog(Generation, Result<Vec<LayerRef>, FetchError>),
    Session(SessionUpdate),
}

/// Wires the catalog, the layer session and the map together.
///
/// All state lives here and is only touched from `&mut self`, one settled
/// fetch at a time.
pub struct ViewController<A, S> {
    catalog: LayerCatalog,
    catalog_pending: FuturesUnordered<CatalogFetch>,
    session: LayerSession<A>,
    map: MapSync<S>,
    /// Unresolved faults in the order they happened, at most one per kind.
    errors: Vec<ViewError>,
}

impl<S: MapSurface> ViewController<HttpLayerApi, S> {
    pub fn from_config(config: &ViewerConfig, surface: S) -> Result<Self, FetchError> {
        let api = HttpLayerApi::new(&config.api_base_url)?;
        Ok(Self::new(api, surface, config))
    }
}

impl<A: LayerApi, S: MapSurface> ViewController<A, S> {
    pub fn new(api: A, surface: S, config: &ViewerConfig) -> Self {
        Self {
            catalog: LayerCatalog::new(),
            catalog_pending: FuturesUnordered::new(),
            session: LayerSession::new(api),
            map: MapSync::new(surface, config.point_rendering),
            errors: Vec::new(),
        }
    }

    /// Requests the layer list. The first entry is selected when it arrives.
    pub fn start(&mut self) {
        info!("viewer starting");
        self.load_catalog();
    }

    /// Fetches the layer list again. The current selection is kept if the
    /// new list still has it. Lists from earlier loads that are still in
    /// flight are dropped when they arrive.
    pub fn reload_catalog(&mut self) {
        self.load_catalog();
    }

    fn load_catalog(&mut self) {
        let CatalogLoad { generation, fetch } = self.catalog.begin_load(self.session.api());
        self.catalog_pending
            .push(fetch.map(move |result| (generation, result)).boxed_local());
    }

    /// Selection callback of the layer list.
    pub fn select(&mut self, layer: impl Into<String>) {
        let ticket = self.session.select(layer);
        debug!(layer = ticket.layer.as_str(), "layer selected");
        self.map.reconcile(None);
    }

    fn deselect(&mut self) {
        self.session.clear();
        self.map.reconcile(None);
    }

    /// Waits for the next fetch to settle and applies it.
    ///
    /// Returns `None` once nothing is in flight.
    pub async fn next_event(&mut self) -> Option<ViewEvent> {
        let completion = tokio::select! {
            biased;
            Some((generation, result)) = self.catalog_pending.next(), if !self.catalog_pending.is_empty() => {
                Completion::Catalog(generation, result)
            }
            Some(update) = self.session.next_update(), if self.session.has_pending() => {
                Completion::Session(update)
            }
            else => return None,
        };

        Some(match completion {
            Completion::Catalog(generation, result) => self.on_catalog(generation, result),
            Completion::Session(update) => self.on_session(update),
        })
    }

    /// Drives every in-flight fetch to completion.
    pub async fn settle(&mut self) -> Vec<ViewEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.next_event().await {
            events.push(event);
        }
        events
    }

    fn on_catalog(
        &mut self,
        generation: Generation,
        result: Result<Vec<LayerRef>, FetchError>,
    ) -> ViewEvent {
        let outcome = match self.catalog.finish_load(generation, result) {
            LoadOutcome::Loaded(first) => Ok(first.map(|l| l.name.clone())),
            LoadOutcome::Failed(error) => Err(error.clone()),
            LoadOutcome::Superseded => return ViewEvent::CatalogSuperseded,
        };

        match outcome {
            Ok(first) => {
                self.resolve(FetchKind::Catalog);
                let kept = self
                    .session
                    .selected()
                    .filter(|name| self.catalog.contains(name))
                    .map(str::to_string);
                let selected = match (kept, first) {
                    (Some(name), _) => Some(name),
                    (None, Some(name)) => {
                        self.select(name.clone());
                        Some(name)
                    }
                    (None, None) => {
                        self.deselect();
                        None
                    }
                };
                ViewEvent::CatalogLoaded {
                    count: self.catalog.len(),
                    selected,
                }
            }
            Err(error) => {
                self.report(FetchKind::Catalog, None, &error);
                ViewEvent::CatalogFailed { error }
            }
        }
    }

    fn on_session(&mut self, update: SessionUpdate) -> ViewEvent {
        match &update {
            SessionUpdate::GeometryPublished { .. } => {
                self.resolve(FetchKind::Geometry);
                let published = self.session.selected().zip(self.session.geometry());
                self.map.reconcile(published);
            }
            SessionUpdate::GeometryFailed { layer, error } => {
                self.report(FetchKind::Geometry, Some(layer.as_str()), error);
            }
            SessionUpdate::SchemaPublished { .. } => self.resolve(FetchKind::Schema),
            SessionUpdate::SchemaFailed { layer, error } => {
                self.report(FetchKind::Schema, Some(layer.as_str()), error);
            }
            SessionUpdate::Discarded { .. } => {}
        }
        ViewEvent::Session(update)
    }

    fn report(&mut self, kind: FetchKind, layer: Option<&str>, error: &FetchError) {
        if self.errors.iter().any(|e| e.kind == kind) {
            return;
        }
        self.errors.push(ViewError {
            kind,
            layer: layer.map(str::to_string),
            message: error.to_string(),
        });
    }

    fn resolve(&mut self, kind: FetchKind) {
        self.errors.retain(|e| e.kind != kind);
    }

    /// True while any of the three fetch kinds is in flight.
    pub fn busy(&self) -> bool {
        self.catalog.is_loading() || self.session.is_loading()
    }

    /// The first fault that has not been cleared by a later success of the
    /// same kind.
    pub fn error(&self) -> Option<&ViewError> {
        self.errors.first()
    }

    pub fn selected(&self) -> Option<&str> {
        self.session.selected()
    }

    pub fn layers(&self) -> &[LayerRef] {
        self.catalog.layers()
    }

    pub fn schema(&self) -> Option<&LayerSchema> {
        self.session.schema()
    }

    pub fn catalog(&self) -> &LayerCatalog {
        &self.catalog
    }

    pub fn session(&self) -> &LayerSession<A> {
        &self.session
    }

    pub fn rendered(&self) -> Option<&RenderedHandle> {
        self.map.current()
    }

    pub fn surface(&self) -> &S {
        self.map.surface()
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        let rendered = self.map.current();
        ViewSnapshot {
            layers: self.catalog.layers().iter().map(|l| l.name.clone()).collect(),
            selected: self.selected().map(str::to_string),
            busy: self.busy(),
            error: self.error().map(ToString::to_string),
            schema: self.session.schema().cloned(),
            summary: self.session.geometry().map(CollectionSummary::of),
            rendered_features: rendered.map_or(0, |r| r.features),
            undrawn_features: rendered.map_or(0, |r| r.undrawn),
        }
    }
}
