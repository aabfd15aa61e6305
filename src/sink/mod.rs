//! Header sink: a local destination for relayed headers.
//!
//! `GET /` merges the request headers into the captured set (existing names
//! are overwritten, others kept) and answers `OK`. `GET /captured` returns
//! the merged set as JSON. Values are stored as received; the JSON view
//! decodes them as UTF-8, falling back to Latin-1 so no byte is lost.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use parking_lot::RwLock;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

/// Headers received so far, keyed by lowercase name.
#[derive(Debug, Clone, Default)]
pub struct CapturedHeaders {
    inner: Arc<RwLock<BTreeMap<String, HeaderValue>>>,
}

/// Text form of a header value. Latin-1 maps every byte to one char.
fn display_value(value: &HeaderValue) -> String {
    match value.to_str() {
        Ok(text) => text.to_string(),
        Err(_) => value.as_bytes().iter().map(|&b| char::from(b)).collect(),
    }
}

impl CapturedHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `headers`, overwriting names already present.
    pub fn update(&self, headers: &HeaderMap) {
        let mut captured = self.inner.write();
        for (name, value) in headers {
            captured.insert(name.as_str().to_string(), value.clone());
        }
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.get_raw(name).as_ref().map(display_value)
    }

    /// Value exactly as received.
    pub fn get_raw(&self, name: &str) -> Option<HeaderValue> {
        self.inner.read().get(&name.to_ascii_lowercase()).cloned()
    }

    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.inner
            .read()
            .iter()
            .map(|(name, value)| (name.clone(), display_value(value)))
            .collect()
    }
}

async fn receive(State(captured): State<CapturedHeaders>, headers: HeaderMap) -> impl IntoResponse {
    tracing::info!(headers = headers.len(), "Headers received");
    captured.update(&headers);
    (
        [(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"))],
        "OK",
    )
}

async fn captured(State(captured): State<CapturedHeaders>) -> Json<BTreeMap<String, String>> {
    Json(captured.snapshot())
}

pub fn setup_sink_router(captured: CapturedHeaders) -> Router {
    Router::new()
        .route("/", get(receive))
        .route("/captured", get(self::captured))
        .with_state(captured)
        .layer(TraceLayer::new_for_http())
}

/// Serve the sink until `shutdown` fires.
pub async fn run_sink(
    listener: TcpListener,
    captured: CapturedHeaders,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!(address = %addr, "Header sink starting");

    axum::serve(listener, setup_sink_router(captured))
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await?;

    tracing::info!("Header sink stopped");
    Ok(())
}
