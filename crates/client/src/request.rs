use std::fmt;

use serde::Serialize;

/// The three independent fetches the viewer issues.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchKind {
    Catalog,
    Geometry,
    Schema,
}

impl FetchKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FetchKind::Catalog => "catalog",
            FetchKind::Geometry => "geometry",
            FetchKind::Schema => "schema",
        }
    }
}

impl fmt::Display for FetchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies one selection in a deterministic, stable way.
///
/// Small and copyable so it can be stamped on every in-flight fetch; a
/// result is only applied while its generation is still the current one.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Generation(pub u64);

impl Generation {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}
