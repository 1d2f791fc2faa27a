use std::collections::BTreeMap;

use formats::GeoPoint;

use crate::layer::LayerId;
use crate::vector::RenderedGeometry;

pub const OSM_TILE_URL: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";

/// Map surface the viewer draws on. Tiles and projection stay with the
/// implementation; the viewer only attaches and detaches geometry sets.
pub trait MapSurface {
    fn attach(&mut self, geometry: RenderedGeometry) -> LayerId;

    /// Returns `false` if `id` was not attached.
    fn detach(&mut self, id: LayerId) -> bool;
}

/// Initial view and base tiles of the map.
#[derive(Debug, Clone, PartialEq)]
pub struct MapView {
    pub center: GeoPoint,
    pub zoom: u8,
    pub tile_url: String,
}

impl Default for MapView {
    fn default() -> Self {
        Self {
            center: GeoPoint::new(0.0, 0.0),
            zoom: 2,
            tile_url: OSM_TILE_URL.to_string(),
        }
    }
}

/// Surface that keeps attached sets in memory.
///
/// Used by the headless viewer and by tests that inspect what is on the map.
#[derive(Debug, Default)]
pub struct InMemorySurface {
    view: MapView,
    next_id: u64,
    attached: BTreeMap<LayerId, RenderedGeometry>,
    attach_calls: u64,
    detach_calls: u64,
}

impl InMemorySurface {
    pub fn new(view: MapView) -> Self {
        Self {
            view,
            ..Self::default()
        }
    }

    pub fn view(&self) -> &MapView {
        &self.view
    }

    pub fn attached_count(&self) -> usize {
        self.attached.len()
    }

    pub fn attached(&self) -> impl Iterator<Item = (LayerId, &RenderedGeometry)> + '_ {
        self.attached.iter().map(|(id, g)| (*id, g))
    }

    /// Most recently attached set still on the map.
    pub fn current(&self) -> Option<&RenderedGeometry> {
        self.attached.values().next_back()
    }

    pub fn attach_calls(&self) -> u64 {
        self.attach_calls
    }

    pub fn detach_calls(&self) -> u64 {
        self.detach_calls
    }
}

impl MapSurface for InMemorySurface {
    fn attach(&mut self, geometry: RenderedGeometry) -> LayerId {
        self.next_id += 1;
        self.attach_calls += 1;
        let id = LayerId(self.next_id);
        self.attached.insert(id, geometry);
        id
    }

    fn detach(&mut self, id: LayerId) -> bool {
        self.detach_calls += 1;
        self.attached.remove(&id).is_some()
    }
}
