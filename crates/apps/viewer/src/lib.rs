pub mod config;
pub mod controller;
pub mod map_sync;
pub mod report;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use config::*;
pub use controller::*;
pub use map_sync::*;
pub use session::*;
