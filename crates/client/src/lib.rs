pub mod api;
pub mod error;
pub mod http;
pub mod memory;
pub mod request;

pub use api::*;
pub use error::*;
pub use http::*;
pub use memory::*;
pub use request::*;
