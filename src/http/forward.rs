//! Plain HTTP forwarding with the observer tap.
//!
//! # Responsibilities
//! - Resolve the outgoing URL (absolute-form, or joined onto the upstream)
//! - Strip hop-by-hop headers and set `Host` for the real target
//! - Hand the finalized request to the observer
//! - Forward upstream and relay the response back unchanged
//!
//! # Design Decisions
//! - The observer sees the request before it is forwarded and cannot
//!   change it; forwarding never waits on relays
//! - Bodies are buffered up to the configured limit
//! - Upstream failures map to 502, never to a retry

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use url::Url;

use crate::headers::{strip_hop_by_hop, HeaderEntry};
use crate::observability::metrics;
use crate::observer::{ObservedRequest, RequestObserver};

/// Shared state of the tap handlers.
#[derive(Debug)]
pub struct TapState {
    pub observer: Arc<RequestObserver>,
    pub client: reqwest::Client,
    /// Base URL for origin-form requests.
    pub upstream: Option<Url>,
    pub max_body_size: usize,
}

/// Outgoing URL for a request URI.
///
/// Absolute-form URIs are used as-is. Origin-form URIs are appended to
/// `upstream`, keeping any path prefix it has.
pub fn target_url(uri: &Uri, upstream: Option<&Url>) -> Option<Url> {
    if uri.scheme().is_some() && uri.authority().is_some() {
        return Url::parse(&uri.to_string()).ok();
    }

    let base = upstream?;
    let path_and_query = uri.path_and_query().map(|p| p.as_str()).unwrap_or("/");
    let joined = format!("{}{}", base.as_str().trim_end_matches('/'), path_and_query);
    Url::parse(&joined).ok()
}

fn host_header(url: &Url) -> Option<HeaderValue> {
    let host = url.host_str()?;
    let value = match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };
    HeaderValue::from_str(&value).ok()
}

/// Tap handler for every non-CONNECT request.
pub async fn tap_handler(State(state): State<Arc<TapState>>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let (mut parts, body) = request.into_parts();
    let method = parts.method.clone();

    let Some(url) = target_url(&parts.uri, state.upstream.as_ref()) else {
        tracing::warn!(uri = %parts.uri, "Request is not absolute-form and no upstream is configured");
        metrics::record_tap_request(&method, 400, start);
        return (StatusCode::BAD_REQUEST, "absolute-form request URI required").into_response();
    };

    strip_hop_by_hop(&mut parts.headers);
    if let Some(host) = host_header(&url) {
        parts.headers.insert(header::HOST, host);
    }

    let body = match axum::body::to_bytes(body, state.max_body_size).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(url = %url, error = %e, "Request body rejected");
            metrics::record_tap_request(&method, 413, start);
            return (StatusCode::PAYLOAD_TOO_LARGE, "request body too large").into_response();
        }
    };

    let observed = ObservedRequest::new(
        method.clone(),
        url.clone(),
        HeaderEntry::from_header_map(&parts.headers),
    );
    state.observer.dispatch(&observed);

    let mut outgoing = parts.headers;
    outgoing.remove(header::HOST);
    outgoing.remove(header::CONTENT_LENGTH);

    tracing::debug!(request_id = %observed.id, method = %method, url = %url, "Forwarding request");

    let upstream = match state
        .client
        .request(method.clone(), url.clone())
        .headers(outgoing)
        .body(body)
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(request_id = %observed.id, url = %url, error = %e, "Upstream error");
            metrics::record_tap_request(&method, 502, start);
            return (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response();
        }
    };

    let status = upstream.status();
    let mut headers = upstream.headers().clone();
    strip_hop_by_hop(&mut headers);

    let bytes = match upstream.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(request_id = %observed.id, url = %url, error = %e, "Upstream body failed");
            metrics::record_tap_request(&method, 502, start);
            return (StatusCode::BAD_GATEWAY, "Upstream response failed").into_response();
        }
    };

    metrics::record_tap_request(&method, status.as_u16(), start);

    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}
