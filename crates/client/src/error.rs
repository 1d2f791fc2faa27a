use formats::GeoJsonError;

/// Failure of a single fetch.
///
/// Callers surface every variant the same way, as its message text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// Connection-level failure; no response was received.
    #[error("network error: {0}")]
    Transport(String),
    /// The server answered with a non-success status code.
    #[error("HTTP error! status: {status}")]
    Status { status: u16 },
    /// The body was not the expected structured document.
    #[error("invalid response body: {0}")]
    Decode(String),
    #[error("invalid request url: {0}")]
    InvalidUrl(String),
}

impl From<GeoJsonError> for FetchError {
    fn from(err: GeoJsonError) -> Self {
        FetchError::Decode(err.to_string())
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Decode(err.to_string())
    }
}
