use client::{FetchError, FetchKind, Generation, LayerApi};
use formats::{FeatureCollection, LayerSchema};
use futures_util::future::LocalBoxFuture;
use futures_util::stream::{FuturesUnordered, StreamExt};
use futures_util::FutureExt as _;
use tracing::{debug, info, warn};

/// Identity of one `select` call, stamped on both of its fetches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionTicket {
    pub generation: Generation,
    pub layer: String,
}

/// What applying one settled fetch did to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionUpdate {
    GeometryPublished { layer: String, features: usize },
    GeometryFailed { layer: String, error: FetchError },
    SchemaPublished { layer: String },
    SchemaFailed { layer: String, error: FetchError },
    /// The result belonged to a selection that is no longer current.
    Discarded { layer: String, kind: FetchKind },
}

impl SessionUpdate {
    pub fn geometry_changed(&self) -> bool {
        matches!(self, SessionUpdate::GeometryPublished { .. })
    }
}

enum Fetched {
    Geometry(Result<FeatureCollection, FetchError>),
    Schema(Result<LayerSchema, FetchError>),
}

impl Fetched {
    fn kind(&self) -> FetchKind {
        match self {
            Fetched::Geometry(_) => FetchKind::Geometry,
            Fetched::Schema(_) => FetchKind::Schema,
        }
    }
}

struct Settled {
    ticket: SelectionTicket,
    fetched: Fetched,
}

#[derive(Debug)]
struct Slot<T> {
    value: Option<T>,
    loading: bool,
    error: Option<FetchError>,
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self {
            value: None,
            loading: false,
            error: None,
        }
    }
}

/// Geometry and schema of the selected layer.
///
/// Each `select` issues two independent fetches. They settle in any order;
/// results are applied as they arrive, and only while their ticket is still
/// the current one. Nothing is cancelled: superseded results are dropped on
/// arrival.
pub struct LayerSession<A> {
    api: A,
    ticket: Option<SelectionTicket>,
    generation: Generation,
    geometry: Slot<FeatureCollection>,
    schema: Slot<LayerSchema>,
    pending: FuturesUnordered<LocalBoxFuture<'static, Settled>>,
}

impl<A: LayerApi> LayerSession<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            ticket: None,
            generation: Generation::default(),
            geometry: Slot::default(),
            schema: Slot::default(),
            pending: FuturesUnordered::new(),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Makes `layer` the selection and fetches its geometry and schema.
    ///
    /// Re-selecting the current layer runs the whole procedure again.
    pub fn select(&mut self, layer: impl Into<String>) -> SelectionTicket {
        let layer = layer.into();
        self.generation = self.generation.next();
        let ticket = SelectionTicket {
            generation: self.generation,
            layer: layer.clone(),
        };
        if let Some(previous) = self.ticket.replace(ticket.clone()) {
            debug!(layer = previous.layer.as_str(), generation = previous.generation.0, "selection superseded");
        }

        self.geometry.value = None;
        self.schema.value = None;
        self.geometry.loading = true;
        self.schema.loading = true;

        debug!(layer = layer.as_str(), generation = ticket.generation.0, "fetching geometry and schema");
        let geometry = self.api.geojson(&layer);
        let schema = self.api.schema(&layer);

        let geometry_ticket = ticket.clone();
        self.pending.push(
            async move {
                Settled {
                    ticket: geometry_ticket,
                    fetched: Fetched::Geometry(geometry.await),
                }
            }
            .boxed_local(),
        );
        let schema_ticket = ticket.clone();
        self.pending.push(
            async move {
                Settled {
                    ticket: schema_ticket,
                    fetched: Fetched::Schema(schema.await),
                }
            }
            .boxed_local(),
        );

        ticket
    }

    /// Drops the selection. Fetches still in flight will be discarded.
    pub fn clear(&mut self) {
        if let Some(previous) = self.ticket.take() {
            debug!(layer = previous.layer.as_str(), "selection cleared");
        }
        self.geometry = Slot::default();
        self.schema = Slot::default();
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Waits for the next fetch to settle and applies it.
    ///
    /// Returns `None` when nothing is in flight. Cancel-safe: a result is
    /// applied in the same poll that yields it.
    pub async fn next_update(&mut self) -> Option<SessionUpdate> {
        let settled = self.pending.next().await?;
        Some(self.apply(settled))
    }

    fn apply(&mut self, settled: Settled) -> SessionUpdate {
        let Settled { ticket, fetched } = settled;
        if self.ticket.as_ref() != Some(&ticket) {
            let kind = fetched.kind();
            debug!(layer = ticket.layer.as_str(), generation = ticket.generation.0, %kind, "stale result discarded");
            return SessionUpdate::Discarded {
                layer: ticket.layer,
                kind,
            };
        }

        let layer = ticket.layer;
        match fetched {
            Fetched::Geometry(result) => {
                self.geometry.loading = false;
                match result {
                    Ok(collection) => {
                        let features = collection.len();
                        info!(layer = layer.as_str(), features, "geometry published");
                        self.geometry.value = Some(collection);
                        self.geometry.error = None;
                        SessionUpdate::GeometryPublished { layer, features }
                    }
                    Err(error) => {
                        warn!(layer = layer.as_str(), %error, "geometry fetch failed");
                        self.geometry.error = Some(error.clone());
                        SessionUpdate::GeometryFailed { layer, error }
                    }
                }
            }
            Fetched::Schema(result) => {
                self.schema.loading = false;
                match result {
                    Ok(schema) => {
                        info!(layer = layer.as_str(), properties = schema.properties.len(), "schema published");
                        self.schema.value = Some(schema);
                        self.schema.error = None;
                        SessionUpdate::SchemaPublished { layer }
                    }
                    Err(error) => {
                        warn!(layer = layer.as_str(), %error, "schema fetch failed");
                        self.schema.error = Some(error.clone());
                        SessionUpdate::SchemaFailed { layer, error }
                    }
                }
            }
        }
    }

    pub fn selected(&self) -> Option<&str> {
        self.ticket.as_ref().map(|t| t.layer.as_str())
    }

    pub fn ticket(&self) -> Option<&SelectionTicket> {
        self.ticket.as_ref()
    }

    pub fn geometry(&self) -> Option<&FeatureCollection> {
        self.geometry.value.as_ref()
    }

    pub fn schema(&self) -> Option<&LayerSchema> {
        self.schema.value.as_ref()
    }

    pub fn is_geometry_loading(&self) -> bool {
        self.geometry.loading
    }

    pub fn is_schema_loading(&self) -> bool {
        self.schema.loading
    }

    pub fn is_loading(&self) -> bool {
        self.geometry.loading || self.schema.loading
    }

    pub fn geometry_error(&self) -> Option<&FetchError> {
        self.geometry.error.as_ref()
    }

    pub fn schema_error(&self) -> Option<&FetchError> {
        self.schema.error.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::{LayerSession, SessionUpdate};
    use crate::testing::{DeferredApi, points, schema};
    use client::{ApiCall, FetchError, FetchKind, InMemoryLayerApi};

    #[test]
    fn select_clears_and_marks_loading() {
        let api = InMemoryLayerApi::new().with_layer(points(2), schema("A"));
        let mut session = LayerSession::new(api.clone());

        let ticket = session.select("A");
        assert_eq!(ticket.layer, "A");
        assert_eq!(session.selected(), Some("A"));
        assert!(session.is_geometry_loading());
        assert!(session.is_schema_loading());
        assert!(session.geometry().is_none());
        assert!(session.schema().is_none());
        assert_eq!(session.pending(), 2);
        assert_eq!(
            api.calls(),
            vec![ApiCall::GeoJson("A".into()), ApiCall::Schema("A".into())]
        );
    }

    #[tokio::test]
    async fn publishes_both_results() {
        let api = InMemoryLayerApi::new().with_layer(points(3), schema("A"));
        let mut session = LayerSession::new(api);
        session.select("A");

        let mut geometry_changes = 0;
        while let Some(update) = session.next_update().await {
            if update.geometry_changed() {
                geometry_changes += 1;
            }
        }
        assert_eq!(geometry_changes, 1);
        assert_eq!(session.geometry().map(|g| g.len()), Some(3));
        assert_eq!(session.schema().map(|s| s.name.as_str()), Some("A"));
        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn results_of_superseded_selection_are_discarded() {
        let api = DeferredApi::default();
        let mut session = LayerSession::new(api.clone());
        session.select("A");
        session.select("B");

        api.resolve_geojson("B", Ok(points(2)));
        assert_eq!(
            session.next_update().await,
            Some(SessionUpdate::GeometryPublished {
                layer: "B".into(),
                features: 2
            })
        );

        api.resolve_geojson("A", Ok(points(5)));
        assert_eq!(
            session.next_update().await,
            Some(SessionUpdate::Discarded {
                layer: "A".into(),
                kind: FetchKind::Geometry
            })
        );
        assert_eq!(session.geometry().map(|g| g.len()), Some(2));

        // A's late schema must not settle B's schema flag.
        api.resolve_schema("A", Ok(schema("A")));
        session.next_update().await;
        assert!(session.is_schema_loading());
        assert!(session.schema().is_none());
    }

    #[tokio::test]
    async fn reselecting_same_layer_discards_earlier_results() {
        let api = DeferredApi::default();
        let mut session = LayerSession::new(api.clone());
        session.select("A");
        session.select("A");

        api.resolve_geojson("A", Ok(points(1)));
        assert!(matches!(
            session.next_update().await,
            Some(SessionUpdate::Discarded { .. })
        ));
        api.resolve_geojson("A", Ok(points(4)));
        assert!(matches!(
            session.next_update().await,
            Some(SessionUpdate::GeometryPublished { features: 4, .. })
        ));
    }

    #[tokio::test]
    async fn schema_failure_leaves_geometry_alone() {
        let api = InMemoryLayerApi::new().with_layer(points(2), schema("A"));
        api.set_schema("A", Err(FetchError::Status { status: 500 }));
        let mut session = LayerSession::new(api);
        session.select("A");
        while session.next_update().await.is_some() {}

        assert_eq!(session.geometry().map(|g| g.len()), Some(2));
        assert!(session.schema().is_none());
        assert_eq!(
            session.schema_error(),
            Some(&FetchError::Status { status: 500 })
        );
        assert_eq!(session.geometry_error(), None);
        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn success_clears_the_error_of_its_kind() {
        let api = InMemoryLayerApi::new().with_layer(points(1), schema("A"));
        api.set_geojson("A", Err(FetchError::Transport("refused".into())));
        let mut session = LayerSession::new(api.clone());
        session.select("A");
        while session.next_update().await.is_some() {}
        assert!(session.geometry_error().is_some());

        api.set_geojson("A", Ok(points(1)));
        session.select("A");
        while session.next_update().await.is_some() {}
        assert!(session.geometry_error().is_none());
        assert!(session.geometry().is_some());
    }

    #[tokio::test]
    async fn cleared_session_discards_in_flight_results() {
        let api = InMemoryLayerApi::new().with_layer(points(1), schema("A"));
        let mut session = LayerSession::new(api);
        session.select("A");
        session.clear();
        assert_eq!(session.selected(), None);
        assert!(!session.is_loading());

        let mut discarded = 0;
        while let Some(update) = session.next_update().await {
            assert!(matches!(update, SessionUpdate::Discarded { .. }));
            discarded += 1;
        }
        assert_eq!(discarded, 2);
        assert!(session.geometry().is_none());
    }
}
