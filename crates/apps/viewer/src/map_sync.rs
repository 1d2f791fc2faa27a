use formats::FeatureCollection;
use layers::{LayerId, MapSurface, PointRendering, RenderedGeometry};
use tracing::{debug, warn};

/// What is currently drawn for the published geometry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedHandle {
    pub id: LayerId,
    pub layer: String,
    pub features: usize,
    pub undrawn: usize,
}

/// Keeps the map surface in step with the published geometry.
///
/// The previous set is always detached before a new one is attached, so the
/// surface never holds more than one set from this viewer.
pub struct MapSync<S> {
    surface: S,
    current: Option<RenderedHandle>,
    points: PointRendering,
}

impl<S: MapSurface> MapSync<S> {
    pub fn new(surface: S, points: PointRendering) -> Self {
        Self {
            surface,
            current: None,
            points,
        }
    }

    /// Replaces whatever is drawn with `published`, or clears the map when
    /// there is nothing published.
    pub fn reconcile(&mut self, published: Option<(&str, &FeatureCollection)>) -> Option<&RenderedHandle> {
        if let Some(previous) = self.current.take() {
            if !self.surface.detach(previous.id) {
                warn!(layer = previous.layer.as_str(), "rendered set was already gone");
            }
            debug!(layer = previous.layer.as_str(), "rendered set detached");
        }

        let (layer, collection) = published?;
        let rendered = RenderedGeometry::build(layer, collection, self.points);
        let features = rendered.len();
        let undrawn = rendered.undrawn();
        let id = self.surface.attach(rendered);
        debug!(layer, features, undrawn, "rendered set attached");

        Some(&*self.current.insert(RenderedHandle {
            id,
            layer: layer.to_string(),
            features,
            undrawn,
        }))
    }

    pub fn current(&self) -> Option<&RenderedHandle> {
        self.current.as_ref()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn point_rendering(&self) -> PointRendering {
        self.points
    }
}
