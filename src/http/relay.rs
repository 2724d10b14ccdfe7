//! HTTP relay: forwards ordinary (non-upgrade) requests to the upstream.
//!
//! # State Machine
//! ```text
//! Idle -> Connecting -> Streaming -> Done
//!              │
//!              └──────────────────▶ Failed (structured 5xx to the client)
//! ```
//!
//! # Design Decisions
//! - One attempt per request; retries are out of scope.
//! - The upstream wait is bounded; on expiry the attempt is abandoned and
//!   the client gets a structured timeout response.
//! - Upstream status and headers are copied verbatim, then the configured
//!   override policy (CORS allow-any-origin) is applied on top.
//! - Bodies stream in both directions; nothing is buffered.

use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, uri::Uri, HeaderValue, Request, Response, StatusCode},
    response::IntoResponse,
    Json,
};
use thiserror::Error;

use crate::config::schema::{PathPolicy, RoutingConfig};
use crate::http::headers;
use crate::http::response::ErrorBody;
use crate::http::server::AppState;

/// Failure modes when talking to the upstream.
///
/// Connection-scoped: handled at the relay boundary, surfaced to the client
/// as structured JSON, never allowed to escape to the process level.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// TCP connect to the upstream failed.
    #[error("upstream unreachable: {0}")]
    Unreachable(String),

    /// No response within the bounded wait; the attempt was abandoned.
    #[error("upstream did not respond within {0:?}")]
    Timeout(Duration),

    /// Malformed response framing or a request the client stack rejected.
    #[error("upstream protocol error: {0}")]
    Protocol(String),

    /// The upstream rejected the WebSocket upgrade handshake.
    #[error("upstream websocket handshake failed: {0}")]
    HandshakeFailed(String),
}

impl UpstreamError {
    pub fn code(&self) -> &'static str {
        match self {
            UpstreamError::Unreachable(_) => "UPSTREAM_UNREACHABLE",
            UpstreamError::Timeout(_) => "UPSTREAM_TIMEOUT",
            UpstreamError::Protocol(_) => "UPSTREAM_PROTOCOL_ERROR",
            UpstreamError::HandshakeFailed(_) => "UPSTREAM_HANDSHAKE_FAILED",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            UpstreamError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for UpstreamError {
    fn into_response(self) -> axum::response::Response {
        let body = ErrorBody {
            status: "error",
            code: self.code(),
            message: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

/// Forward one request to the upstream and stream the response back.
pub async fn forward(
    state: &AppState,
    remote: SocketAddr,
    request: Request<Body>,
) -> Result<Response<Body>, UpstreamError> {
    let (parts, body) = request.into_parts();

    let path = upstream_path(&state.config.routing, &parts.uri);
    let uri: Uri = format!(
        "{}://{}{}",
        state.config.upstream.base_url.scheme(),
        state.upstream_authority(),
        path
    )
    .parse()
    .map_err(|e: axum::http::uri::InvalidUri| UpstreamError::Protocol(e.to_string()))?;

    let mut outbound = Request::builder()
        .method(parts.method.clone())
        .uri(uri)
        .body(body)
        .map_err(|e| UpstreamError::Protocol(e.to_string()))?;
    *outbound.headers_mut() = headers::outbound_headers(
        &parts.headers,
        remote,
        state.scheme,
        state.upstream_authority(),
        false,
    );

    tracing::debug!(
        method = %parts.method,
        path = %path,
        upstream = %state.upstream_authority(),
        "relaying request"
    );

    let wait = Duration::from_millis(state.config.upstream.timeout_ms);
    let response = match tokio::time::timeout(wait, state.client.request(outbound)).await {
        Ok(Ok(response)) => response,
        Ok(Err(e)) if e.is_connect() => return Err(UpstreamError::Unreachable(e.to_string())),
        Ok(Err(e)) => return Err(UpstreamError::Protocol(e.to_string())),
        // The pending attempt is dropped here; the connection is abandoned,
        // not reused.
        Err(_) => return Err(UpstreamError::Timeout(wait)),
    };

    let (mut parts, body) = response.into_parts();
    if state.config.headers.cors_allow_any_origin {
        parts.headers.insert(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        );
    }
    Ok(Response::from_parts(parts, Body::new(body)))
}

/// Build the outbound path (with query) from the inbound URI under the
/// configured prefix policy.
pub(crate) fn upstream_path(routing: &RoutingConfig, uri: &Uri) -> String {
    let path_and_query = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    match routing.path_policy {
        PathPolicy::Preserve => path_and_query.to_string(),
        PathPolicy::Strip => match path_and_query.strip_prefix(routing.api_prefix.as_str()) {
            Some(rest) if rest.is_empty() || rest.starts_with('?') => format!("/{rest}"),
            Some(rest) => rest.to_string(),
            None => path_and_query.to_string(),
        },
    }
}
