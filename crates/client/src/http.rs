use formats::{FeatureCollection, LayerRef, LayerSchema};
use reqwest::header::ACCEPT;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::api::{ApiFuture, LayerApi};
use crate::error::FetchError;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Layer service reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpLayerApi {
    base_url: Url,
    http: Client,
}

impl HttpLayerApi {
    pub fn new(base_url: &str) -> Result<Self, FetchError> {
        Self::with_client(base_url, Client::new())
    }

    pub fn with_client(base_url: &str, http: Client) -> Result<Self, FetchError> {
        let parsed =
            Url::parse(base_url).map_err(|e| FetchError::InvalidUrl(format!("{base_url}: {e}")))?;
        if parsed.cannot_be_a_base() {
            return Err(FetchError::InvalidUrl(format!(
                "{base_url}: not a hierarchical url"
            )));
        }
        Ok(Self {
            base_url: parsed,
            http,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Appends `segments` to the base path. Each segment is percent-encoded,
    /// so a layer name containing `/`, `?` or spaces stays one segment.
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // Checked in `with_client`: the base can always take path segments.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn get<T, F>(&self, url: Url, decode: F) -> ApiFuture<T>
    where
        T: 'static,
        F: FnOnce(&[u8]) -> Result<T, FetchError> + 'static,
    {
        let request = self
            .http
            .get(url.clone())
            .header(ACCEPT, "application/json");
        Box::pin(async move {
            debug!(%url, "GET");
            let resp = request
                .send()
                .await
                .map_err(|e| FetchError::Transport(e.to_string()))?;

            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                warn!(%url, status = status.as_u16(), body = body.trim(), "request failed");
                return Err(FetchError::Status {
                    status: status.as_u16(),
                });
            }

            let bytes = resp
                .bytes()
                .await
                .map_err(|e| FetchError::Transport(e.to_string()))?;
            decode(&bytes)
        })
    }
}

fn decode_json<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, FetchError> {
    Ok(serde_json::from_slice(bytes)?)
}

fn decode_geojson(bytes: &[u8]) -> Result<FeatureCollection, FetchError> {
    Ok(FeatureCollection::from_geojson_slice(bytes)?)
}

impl LayerApi for HttpLayerApi {
    fn list_layers(&self) -> ApiFuture<Vec<LayerRef>> {
        self.get(self.endpoint(&["layers"]), decode_json::<Vec<LayerRef>>)
    }

    fn geojson(&self, layer: &str) -> ApiFuture<FeatureCollection> {
        self.get(self.endpoint(&["layers", layer, "geojson"]), decode_geojson)
    }

    fn schema(&self, layer: &str) -> ApiFuture<LayerSchema> {
        self.get(
            self.endpoint(&["layers", layer, "schema"]),
            decode_json::<LayerSchema>,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_API_URL, HttpLayerApi, decode_geojson};
    use crate::api::LayerApi;
    use crate::error::FetchError;
    use reqwest::Client;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Answers one request with `response` and hands back the raw request.
    async fn serve_once(response: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("accept");
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.expect("read");
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            socket.write_all(response.as_bytes()).await.expect("write");
            let _ = socket.shutdown().await;
            String::from_utf8_lossy(&request).into_owned()
        });
        (format!("http://{addr}"), handle)
    }

    fn local_api(base_url: &str) -> HttpLayerApi {
        let http = Client::builder().no_proxy().build().expect("client");
        HttpLayerApi::with_client(base_url, http).expect("api")
    }

    #[test]
    fn builds_contract_paths() {
        let api = HttpLayerApi::new(DEFAULT_API_URL).expect("api");
        assert_eq!(
            api.endpoint(&["layers"]).as_str(),
            "http://localhost:8000/layers"
        );
        assert_eq!(
            api.endpoint(&["layers", "faults", "geojson"]).as_str(),
            "http://localhost:8000/layers/faults/geojson"
        );
    }

    #[test]
    fn keeps_base_path_prefix() {
        let api = HttpLayerApi::new("https://example.org/gdb/api/").expect("api");
        assert_eq!(
            api.endpoint(&["layers", "sites", "schema"]).as_str(),
            "https://example.org/gdb/api/layers/sites/schema"
        );
    }

    #[test]
    fn encodes_reserved_characters_in_layer_names() {
        let api = HttpLayerApi::new(DEFAULT_API_URL).expect("api");
        let url = api.endpoint(&["layers", "urban areas/2010?", "geojson"]);
        assert_eq!(
            url.path(),
            "/layers/urban%20areas%2F2010%3F/geojson"
        );
    }

    #[test]
    fn rejects_unusable_base_urls() {
        assert!(matches!(
            HttpLayerApi::new("not a url"),
            Err(FetchError::InvalidUrl(_))
        ));
        assert!(matches!(
            HttpLayerApi::new("mailto:gis@example.org"),
            Err(FetchError::InvalidUrl(_))
        ));
    }

    #[test]
    fn non_json_geojson_body_is_a_decode_error() {
        assert!(matches!(
            decode_geojson(b"<!doctype html>"),
            Err(FetchError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn non_success_status_is_reported_with_its_code() {
        let (base, server) = serve_once(
            "HTTP/1.1 404 Not Found\r\ncontent-type: text/plain\r\ncontent-length: 9\r\nconnection: close\r\n\r\nnot found",
        )
        .await;
        let result = local_api(&base).schema("faults").await;
        assert_eq!(result, Err(FetchError::Status { status: 404 }));

        let request = server.await.expect("server").to_ascii_lowercase();
        assert!(request.starts_with("get /layers/faults/schema http/1.1"));
        assert!(request.contains("accept: application/json"));
    }

    #[tokio::test]
    async fn html_body_on_success_is_a_decode_error() {
        let (base, server) = serve_once(
            "HTTP/1.1 200 OK\r\ncontent-type: text/html\r\ncontent-length: 13\r\nconnection: close\r\n\r\n<html></html>",
        )
        .await;
        let result = local_api(&base).list_layers().await;
        assert!(matches!(result, Err(FetchError::Decode(_))), "{result:?}");
        server.await.expect("server");
    }

    #[tokio::test]
    async fn refused_connection_is_a_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        drop(listener);

        let result = local_api(&format!("http://{addr}")).geojson("sites").await;
        assert!(matches!(result, Err(FetchError::Transport(_))), "{result:?}");
    }
}
