//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): proxied requests by method, status
//! - `gateway_request_duration_seconds` (histogram): relay latency
//! - `gateway_ws_sessions_total` (counter): websocket sessions opened
//! - `gateway_ws_active_sessions` (gauge): currently relaying sessions

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on its own listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "metrics exporter started"),
        Err(e) => tracing::error!(error = %e, "failed to start metrics exporter"),
    }
}

/// Record one relayed HTTP request.
pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
    )
    .increment(1);
    histogram!(
        "gateway_request_duration_seconds",
        "method" => method.to_string(),
    )
    .record(start.elapsed().as_secs_f64());
}

/// A websocket session was paired.
pub fn ws_session_opened() {
    counter!("gateway_ws_sessions_total").increment(1);
    gauge!("gateway_ws_active_sessions").increment(1.0);
}

/// A websocket session finished tearing down.
pub fn ws_session_closed() {
    gauge!("gateway_ws_active_sessions").decrement(1.0);
}
