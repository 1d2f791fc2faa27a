use formats::GeometryKind;

pub const POINT_FILL_OPACITY: f32 = 0.8;
pub const AREA_FILL_OPACITY: f32 = 0.3;
pub const STROKE_WEIGHT: f32 = 1.0;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    /// Fill used for every filled feature.
    pub const FEATURE_BLUE: Color = Color::rgb(0x33, 0x88, 0xff);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct StyleAttributes {
    pub stroke_color: Color,
    pub stroke_weight: f32,
    pub stroke_opacity: f32,
    pub fill_color: Option<Color>,
    pub fill_opacity: Option<f32>,
}

impl StyleAttributes {
    pub const fn filled(fill_opacity: f32) -> Self {
        Self {
            stroke_color: Color::BLACK,
            stroke_weight: STROKE_WEIGHT,
            stroke_opacity: 1.0,
            fill_color: Some(Color::FEATURE_BLUE),
            fill_opacity: Some(fill_opacity),
        }
    }

    pub const fn stroke_only() -> Self {
        Self {
            stroke_color: Color::BLACK,
            stroke_weight: STROKE_WEIGHT,
            stroke_opacity: 1.0,
            fill_color: None,
            fill_opacity: None,
        }
    }

    pub fn has_fill(&self) -> bool {
        self.fill_color.is_some()
    }
}

impl Default for StyleAttributes {
    fn default() -> Self {
        Self::filled(POINT_FILL_OPACITY)
    }
}

/// Visual style for a geometry type.
///
/// Lines have no interior and get no fill; areas get a light fill; points
/// and anything unrecognized get the default style.
pub fn style_for(kind: GeometryKind) -> StyleAttributes {
    match kind {
        GeometryKind::LineString | GeometryKind::MultiLineString => StyleAttributes::stroke_only(),
        GeometryKind::Polygon | GeometryKind::MultiPolygon => {
            StyleAttributes::filled(AREA_FILL_OPACITY)
        }
        GeometryKind::Point | GeometryKind::MultiPoint | GeometryKind::Other => {
            StyleAttributes::default()
        }
    }
}

pub fn style_for_type_name(type_name: &str) -> StyleAttributes {
    style_for(GeometryKind::from_type_name(type_name))
}
