use client::DEFAULT_API_URL;
use layers::{MapView, PointRendering};

pub const API_URL_ENV: &str = "GDB_VIEWER_API_URL";

/// Everything the viewer needs to know before it starts.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerConfig {
    /// Prefix of every service endpoint.
    pub api_base_url: String,
    pub map_view: MapView,
    pub point_rendering: PointRendering,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            map_view: MapView::default(),
            point_rendering: PointRendering::default(),
        }
    }
}

impl ViewerConfig {
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    pub fn with_point_rendering(mut self, points: PointRendering) -> Self {
        self.point_rendering = points;
        self
    }
}
