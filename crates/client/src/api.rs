use formats::{FeatureCollection, LayerRef, LayerSchema};
use futures_util::future::LocalBoxFuture;

use crate::error::FetchError;

/// Pending answer from the layer service.
///
/// Single-threaded and `'static`: it never borrows the api handle, so a
/// session can keep it while the selection moves on. The request is built
/// when the method is called and sent on the first poll; callers queue the
/// future right away so nothing waits on it.
pub type ApiFuture<T> = LocalBoxFuture<'static, Result<T, FetchError>>;

/// Read-only contract of the layer service.
///
/// - `GET /layers`
/// - `GET /layers/{name}/geojson`
/// - `GET /layers/{name}/schema`
pub trait LayerApi {
    fn list_layers(&self) -> ApiFuture<Vec<LayerRef>>;
    fn geojson(&self, layer: &str) -> ApiFuture<FeatureCollection>;
    fn schema(&self, layer: &str) -> ApiFuture<LayerSchema>;
}
