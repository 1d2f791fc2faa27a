pub mod layer;
pub mod popup;
pub mod surface;
pub mod symbology;
pub mod vector;

pub use layer::*;
pub use popup::*;
pub use surface::*;
pub use symbology::*;
pub use vector::*;
