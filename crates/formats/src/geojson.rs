use serde_json::Value;

use crate::attributes::Attributes;
use crate::summary::CollectionSummary;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GeoPoint {
    pub lon_deg: f64,
    pub lat_deg: f64,
}

impl GeoPoint {
    pub fn new(lon_deg: f64, lat_deg: f64) -> Self {
        Self { lon_deg, lat_deg }
    }
}

/// Geometry type of a feature, total over every `type` string a document
/// may carry.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GeometryKind {
    Point,
    MultiPoint,
    LineString,
    MultiLineString,
    Polygon,
    MultiPolygon,
    Other,
}

impl GeometryKind {
    pub fn from_type_name(name: &str) -> Self {
        match name {
            "Point" => Self::Point,
            "MultiPoint" => Self::MultiPoint,
            "LineString" => Self::LineString,
            "MultiLineString" => Self::MultiLineString,
            "Polygon" => Self::Polygon,
            "MultiPolygon" => Self::MultiPolygon,
            _ => Self::Other,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Point => "Point",
            Self::MultiPoint => "MultiPoint",
            Self::LineString => "LineString",
            Self::MultiLineString => "MultiLineString",
            Self::Polygon => "Polygon",
            Self::MultiPolygon => "MultiPolygon",
            Self::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(GeoPoint),
    MultiPoint(Vec<GeoPoint>),
    LineString(Vec<GeoPoint>),
    MultiLineString(Vec<Vec<GeoPoint>>),
    Polygon(Vec<Vec<GeoPoint>>),
    MultiPolygon(Vec<Vec<Vec<GeoPoint>>>),
    /// Geometry the viewer cannot draw (unknown type, `null`, or malformed
    /// coordinates). Kept so the feature still gets a style and a popup.
    Unsupported { type_name: String, reason: String },
}

impl Geometry {
    pub fn unsupported(type_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unsupported {
            type_name: type_name.into(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> GeometryKind {
        match self {
            Self::Point(_) => GeometryKind::Point,
            Self::MultiPoint(_) => GeometryKind::MultiPoint,
            Self::LineString(_) => GeometryKind::LineString,
            Self::MultiLineString(_) => GeometryKind::MultiLineString,
            Self::Polygon(_) => GeometryKind::Polygon,
            Self::MultiPolygon(_) => GeometryKind::MultiPolygon,
            Self::Unsupported { .. } => GeometryKind::Other,
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unsupported { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: Option<String>,
    pub geometry: Geometry,
    pub properties: Attributes,
}

impl Feature {
    pub fn new(geometry: Geometry, properties: Attributes) -> Self {
        Self {
            id: None,
            geometry,
            properties,
        }
    }

    pub fn kind(&self) -> GeometryKind {
        self.geometry.kind()
    }
}

/// Decoded `FeatureCollection` document for one layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GeoJsonError {
    #[error("JSON parse error: {0}")]
    Json(String),
    #[error("expected GeoJSON FeatureCollection")]
    NotAFeatureCollection,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self { features }
    }

    pub fn from_geojson_slice(payload: &[u8]) -> Result<Self, GeoJsonError> {
        let value: Value =
            serde_json::from_slice(payload).map_err(|e| GeoJsonError::Json(e.to_string()))?;
        Self::from_geojson_value(&value)
    }

    pub fn from_geojson_str(payload: &str) -> Result<Self, GeoJsonError> {
        Self::from_geojson_slice(payload.as_bytes())
    }

    /// Only the document envelope is strict. A feature that cannot be read
    /// decodes with an `Unsupported` geometry instead of failing the layer.
    pub fn from_geojson_value(value: &Value) -> Result<Self, GeoJsonError> {
        let obj = value
            .as_object()
            .ok_or(GeoJsonError::NotAFeatureCollection)?;
        let ty = obj
            .get("type")
            .and_then(Value::as_str)
            .ok_or(GeoJsonError::NotAFeatureCollection)?;
        if ty != "FeatureCollection" {
            return Err(GeoJsonError::NotAFeatureCollection);
        }

        let features = obj
            .get("features")
            .and_then(Value::as_array)
            .ok_or(GeoJsonError::NotAFeatureCollection)?
            .iter()
            .map(decode_feature)
            .collect();

        Ok(Self { features })
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn summary(&self) -> CollectionSummary {
        CollectionSummary::of(self)
    }
}

fn decode_feature(value: &Value) -> Feature {
    let Some(obj) = value.as_object() else {
        return Feature::new(
            Geometry::unsupported("invalid", "feature must be an object"),
            Attributes::new(),
        );
    };

    let id = match obj.get("id") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };

    let properties = obj
        .get("properties")
        .and_then(Value::as_object)
        .map(Attributes::from_json_object)
        .unwrap_or_default();

    let geometry = match obj.get("type").and_then(Value::as_str) {
        Some("Feature") => decode_geometry(obj.get("geometry")),
        Some(other) => Geometry::unsupported("invalid", format!("unexpected feature type: {other}")),
        None => Geometry::unsupported("invalid", "feature missing type"),
    };

    Feature {
        id,
        geometry,
        properties,
    }
}

fn decode_geometry(value: Option<&Value>) -> Geometry {
    let Some(value) = value.filter(|v| !v.is_null()) else {
        return Geometry::unsupported("null", "feature has no geometry");
    };
    let type_name = value.get("type").and_then(Value::as_str).unwrap_or("unknown");
    parse_geometry(type_name, value).unwrap_or_else(|reason| Geometry::unsupported(type_name, reason))
}

fn parse_geometry(type_name: &str, value: &Value) -> Result<Geometry, String> {
    let kind = GeometryKind::from_type_name(type_name);
    if kind == GeometryKind::Other {
        return Err(format!("unsupported geometry type: {type_name}"));
    }

    let coords = value
        .get("coordinates")
        .ok_or("geometry missing coordinates".to_string())?;

    match kind {
        GeometryKind::Point => Ok(Geometry::Point(parse_point(coords)?)),
        GeometryKind::MultiPoint => Ok(Geometry::MultiPoint(parse_points(coords)?)),
        GeometryKind::LineString => Ok(Geometry::LineString(parse_points(coords)?)),
        GeometryKind::MultiLineString => Ok(Geometry::MultiLineString(parse_lines(coords)?)),
        GeometryKind::Polygon => Ok(Geometry::Polygon(parse_lines(coords)?)),
        GeometryKind::MultiPolygon => Ok(Geometry::MultiPolygon(parse_multi_polygon(coords)?)),
        GeometryKind::Other => Err(format!("unsupported geometry type: {type_name}")),
    }
}

fn parse_point(coords: &Value) -> Result<GeoPoint, String> {
    let arr = coords
        .as_array()
        .ok_or("Point coordinates must be an array".to_string())?;
    if arr.len() < 2 {
        return Err("Point coordinates must have [lon, lat]".to_string());
    }
    let lon = arr[0]
        .as_f64()
        .ok_or("Point lon must be a number".to_string())?;
    let lat = arr[1]
        .as_f64()
        .ok_or("Point lat must be a number".to_string())?;
    Ok(GeoPoint::new(lon, lat))
}

fn parse_points(coords: &Value) -> Result<Vec<GeoPoint>, String> {
    let arr = coords
        .as_array()
        .ok_or("coordinates must be an array".to_string())?;
    arr.iter().map(parse_point).collect()
}

fn parse_lines(coords: &Value) -> Result<Vec<Vec<GeoPoint>>, String> {
    let arr = coords
        .as_array()
        .ok_or("coordinates must be an array of rings or lines".to_string())?;
    arr.iter().map(parse_points).collect()
}

fn parse_multi_polygon(coords: &Value) -> Result<Vec<Vec<Vec<GeoPoint>>>, String> {
    let polys = coords
        .as_array()
        .ok_or("MultiPolygon coordinates must be an array of polygons".to_string())?;
    polys.iter().map(parse_lines).collect()
}
