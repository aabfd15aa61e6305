//! Metrics collection and exposition.
//!
//! # Metrics
//! - `observer_dispatch_total` (counter): listener invocations
//! - `relay_attempts_total` (counter): relays by outcome
//! - `relay_duration_seconds` (histogram): time to reach the destination
//! - `relay_status` (gauge): 0=unknown, 1=success, 2=failure
//! - `tap_requests_total` (counter): proxied requests by method, status

use std::net::SocketAddr;
use std::time::Instant;

use axum::http::Method;
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::relay::RelayStatus;

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_observed(listeners: usize) {
    metrics::counter!("observer_dispatch_total").increment(listeners as u64);
}

pub fn record_relay(delivered: bool, start: Instant) {
    let outcome = if delivered { "success" } else { "failure" };
    metrics::counter!("relay_attempts_total", "outcome" => outcome).increment(1);
    metrics::histogram!("relay_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_status(status: RelayStatus) {
    metrics::gauge!("relay_status").set(status as u8 as f64);
}

/// Bounded label for a request method; extension methods collapse to `OTHER`.
pub fn method_label(method: &Method) -> &'static str {
    match method.as_str() {
        "GET" => "GET",
        "POST" => "POST",
        "PUT" => "PUT",
        "DELETE" => "DELETE",
        "HEAD" => "HEAD",
        "OPTIONS" => "OPTIONS",
        "CONNECT" => "CONNECT",
        "PATCH" => "PATCH",
        "TRACE" => "TRACE",
        _ => "OTHER",
    }
}

pub fn record_tap_request(method: &Method, status: u16, start: Instant) {
    metrics::counter!(
        "tap_requests_total",
        "method" => method_label(method),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("tap_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_label_is_bounded() {
        assert_eq!(method_label(&Method::GET), "GET");
        assert_eq!(method_label(&Method::PATCH), "PATCH");

        let custom = Method::from_bytes(b"PROPFIND").unwrap();
        assert_eq!(method_label(&custom), "OTHER");
        let random = Method::from_bytes(b"X-8F3A2C").unwrap();
        assert_eq!(method_label(&random), "OTHER");
    }
}
