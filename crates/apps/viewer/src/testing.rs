//! Test doubles whose responses are released by hand.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use client::{ApiCall, ApiFuture, FetchError, LayerApi};
use formats::{Attributes, Feature, FeatureCollection, GeoPoint, Geometry, LayerRef, LayerSchema};
use tokio::sync::oneshot;

type Reply<T> = oneshot::Sender<Result<T, FetchError>>;

#[derive(Default)]
struct Waiting {
    layers: VecDeque<Reply<Vec<LayerRef>>>,
    geojson: Vec<(String, Reply<FeatureCollection>)>,
    schema: Vec<(String, Reply<LayerSchema>)>,
    calls: Vec<ApiCall>,
}

/// Api whose fetches stay pending until the test resolves them, oldest first
/// per layer name unless a `latest` variant is used.
#[derive(Clone, Default)]
pub(crate) struct DeferredApi {
    waiting: Rc<RefCell<Waiting>>,
}

fn deferred<T: 'static>(rx: oneshot::Receiver<Result<T, FetchError>>) -> ApiFuture<T> {
    Box::pin(async move {
        rx.await
            .unwrap_or_else(|_| Err(FetchError::Transport("request dropped".into())))
    })
}

fn take_oldest<T>(queue: &mut Vec<(String, Reply<T>)>, layer: &str) -> Reply<T> {
    let pos = queue
        .iter()
        .position(|(name, _)| name == layer)
        .expect("no fetch in flight for layer");
    queue.remove(pos).1
}

impl DeferredApi {
    pub(crate) fn resolve_layers(&self, result: Result<Vec<LayerRef>, FetchError>) {
        let tx = self
            .waiting
            .borrow_mut()
            .layers
            .pop_front()
            .expect("no layer list in flight");
        let _ = tx.send(result);
    }

    pub(crate) fn resolve_latest_layers(&self, result: Result<Vec<LayerRef>, FetchError>) {
        let tx = self
            .waiting
            .borrow_mut()
            .layers
            .pop_back()
            .expect("no layer list in flight");
        let _ = tx.send(result);
    }

    pub(crate) fn resolve_geojson(&self, layer: &str, result: Result<FeatureCollection, FetchError>) {
        let tx = take_oldest(&mut self.waiting.borrow_mut().geojson, layer);
        let _ = tx.send(result);
    }

    pub(crate) fn resolve_schema(&self, layer: &str, result: Result<LayerSchema, FetchError>) {
        let tx = take_oldest(&mut self.waiting.borrow_mut().schema, layer);
        let _ = tx.send(result);
    }

    pub(crate) fn calls(&self) -> Vec<ApiCall> {
        self.waiting.borrow().calls.clone()
    }
}

impl LayerApi for DeferredApi {
    fn list_layers(&self) -> ApiFuture<Vec<LayerRef>> {
        let (tx, rx) = oneshot::channel();
        let mut waiting = self.waiting.borrow_mut();
        waiting.calls.push(ApiCall::ListLayers);
        waiting.layers.push_back(tx);
        deferred(rx)
    }

    fn geojson(&self, layer: &str) -> ApiFuture<FeatureCollection> {
        let (tx, rx) = oneshot::channel();
        let mut waiting = self.waiting.borrow_mut();
        waiting.calls.push(ApiCall::GeoJson(layer.to_string()));
        waiting.geojson.push((layer.to_string(), tx));
        deferred(rx)
    }

    fn schema(&self, layer: &str) -> ApiFuture<LayerSchema> {
        let (tx, rx) = oneshot::channel();
        let mut waiting = self.waiting.borrow_mut();
        waiting.calls.push(ApiCall::Schema(layer.to_string()));
        waiting.schema.push((layer.to_string(), tx));
        deferred(rx)
    }
}

/// `n` point features, each with an `id` attribute.
pub(crate) fn points(n: usize) -> FeatureCollection {
    let features = (0..n)
        .map(|i| {
            let mut properties = Attributes::new();
            properties.insert("id", i as i64);
            Feature::new(
                Geometry::Point(GeoPoint::new(i as f64, -(i as f64))),
                properties,
            )
        })
        .collect();
    FeatureCollection::new(features)
}

pub(crate) fn schema(name: &str) -> LayerSchema {
    LayerSchema::new(name, ["id"])
}

pub(crate) fn layer_list(names: &[&str]) -> Vec<LayerRef> {
    names.iter().map(|n| LayerRef::new(*n)).collect()
}
