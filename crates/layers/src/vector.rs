use formats::{Feature, FeatureCollection, GeoPoint, Geometry};
use tracing::warn;

use crate::popup::describe;
use crate::symbology::{StyleAttributes, style_for};

pub const DEFAULT_CIRCLE_RADIUS_PX: f32 = 6.0;

/// How point geometries are drawn. Lines and areas always use stroke/fill.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum PointRendering {
    Marker,
    CircleMarker { radius_px: f32 },
}

impl Default for PointRendering {
    fn default() -> Self {
        PointRendering::CircleMarker {
            radius_px: DEFAULT_CIRCLE_RADIUS_PX,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Markers(Vec<GeoPoint>),
    Circles {
        centers: Vec<GeoPoint>,
        radius_px: f32,
    },
    Paths(Vec<Vec<GeoPoint>>),
    /// Polygons, each a list of rings (outer ring first).
    Areas(Vec<Vec<Vec<GeoPoint>>>),
    /// Nothing drawable; the feature keeps its style and popup.
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedFeature {
    /// Position of the feature in its collection.
    pub index: usize,
    pub shape: Shape,
    pub style: StyleAttributes,
    pub popup: Option<String>,
}

/// Graphical objects for one layer's features, attached to a surface as a unit.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RenderedGeometry {
    pub layer: String,
    pub features: Vec<RenderedFeature>,
}

impl RenderedGeometry {
    pub fn build(layer: &str, collection: &FeatureCollection, points: PointRendering) -> Self {
        let features = collection
            .features
            .iter()
            .enumerate()
            .map(|(index, feature)| render_feature(layer, index, feature, points))
            .collect();
        Self {
            layer: layer.to_string(),
            features,
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Features that could not be drawn.
    pub fn undrawn(&self) -> usize {
        self.features
            .iter()
            .filter(|f| f.shape == Shape::Empty)
            .count()
    }
}

fn render_feature(
    layer: &str,
    index: usize,
    feature: &Feature,
    points: PointRendering,
) -> RenderedFeature {
    let shape = match &feature.geometry {
        Geometry::Point(p) => point_shape(vec![*p], points),
        Geometry::MultiPoint(ps) => point_shape(ps.clone(), points),
        Geometry::LineString(line) => Shape::Paths(vec![line.clone()]),
        Geometry::MultiLineString(lines) => Shape::Paths(lines.clone()),
        Geometry::Polygon(rings) => Shape::Areas(vec![rings.clone()]),
        Geometry::MultiPolygon(polys) => Shape::Areas(polys.clone()),
        Geometry::Unsupported { type_name, reason } => {
            warn!(layer, index, type_name = type_name.as_str(), reason = reason.as_str(), "feature not drawable");
            Shape::Empty
        }
    };

    RenderedFeature {
        index,
        shape,
        style: style_for(feature.kind()),
        popup: describe(&feature.properties),
    }
}

fn point_shape(centers: Vec<GeoPoint>, points: PointRendering) -> Shape {
    match points {
        PointRendering::Marker => Shape::Markers(centers),
        PointRendering::CircleMarker { radius_px } => Shape::Circles { centers, radius_px },
    }
}
