pub mod attributes;
pub mod geojson;
pub mod layer;
pub mod summary;

pub use attributes::*;
pub use geojson::*;
pub use layer::*;
pub use summary::*;
