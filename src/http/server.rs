//! Listener dispatch and request classification.
//!
//! # Responsibilities
//! - Build the Axum router (identity endpoint, API prefix, 404 fallback)
//! - Classify each request: WebSocket upgrade vs. ordinary HTTP
//! - Wire up middleware (timeout, request ID, tracing)
//! - Serve the plaintext listener with graceful shutdown; expose the
//!   make-service used by the TLS listener
//!
//! Accepted connections run as independent tasks: a slow or stalled session
//! never blocks the accept loop or unrelated sessions.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{
        connect_info::IntoMakeServiceWithConnectInfo,
        ws::{rejection::WebSocketUpgradeRejection, WebSocketUpgrade},
        ConnectInfo, State,
    },
    http::{header, HeaderMap, HeaderValue, Request, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::GatewayConfig;
use crate::http::headers::{self, Scheme};
use crate::http::relay;
use crate::http::request::RequestIdLayer;
use crate::http::response::StatusBody;
use crate::http::websocket;
use crate::observability::metrics;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub client: Client<HttpConnector, Body>,
    /// Scheme of the listener this router instance serves.
    pub scheme: Scheme,
    upstream_authority: Arc<str>,
}

impl AppState {
    pub fn upstream_authority(&self) -> &str {
        &self.upstream_authority
    }
}

/// HTTP server for one listener of the gateway.
pub struct GatewayServer {
    router: Router,
}

impl GatewayServer {
    /// Create a server for the given listener scheme.
    pub fn new(config: GatewayConfig, scheme: Scheme) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        let upstream_authority: Arc<str> = config.upstream.authority().into();
        let config = Arc::new(config);
        let state = AppState {
            config: config.clone(),
            client,
            scheme,
            upstream_authority,
        };

        Self {
            router: Self::build_router(&config, state),
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        let prefix = config.routing.api_prefix.as_str();
        Router::new()
            .route("/", get(identity_handler).fallback(fallback_handler))
            .route(prefix, any(proxy_handler))
            .route(&format!("{prefix}/{{*rest}}"), any(proxy_handler))
            .fallback(fallback_handler)
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.listeners.request_timeout_secs,
            )))
            .layer(RequestIdLayer)
            .layer(TraceLayer::new_for_http())
    }

    /// Serve connections on the given listener until shutdown triggers.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "listener started");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!(address = %addr, "listener stopped");
        Ok(())
    }

    /// Make-service for serving through `axum-server` (TLS listener path).
    pub fn into_make_service(self) -> IntoMakeServiceWithConnectInfo<Router, SocketAddr> {
        self.router.into_make_service_with_connect_info::<SocketAddr>()
    }
}

/// Route upgrade-intent requests to the WebSocket relay.
///
/// Returns `None` for ordinary HTTP traffic. A request that declares a
/// `websocket` upgrade but cannot complete a valid handshake is refused
/// with `Connection: close` so the socket is torn down, not left idle.
async fn dispatch_upgrade(
    state: &AppState,
    remote: SocketAddr,
    ws: Option<WebSocketUpgrade>,
    inbound: &HeaderMap,
    uri: &Uri,
) -> Option<Response> {
    if let Some(ws) = ws {
        return Some(websocket::handle_upgrade(state.clone(), remote, ws, inbound, uri).await);
    }

    if headers::wants_websocket_upgrade(inbound) {
        tracing::warn!(remote = %remote, "malformed websocket upgrade request");
        let mut response =
            (StatusCode::BAD_REQUEST, "invalid websocket handshake").into_response();
        response
            .headers_mut()
            .insert(header::CONNECTION, HeaderValue::from_static("close"));
        return Some(response);
    }

    None
}

/// `GET /`: identity/health metadata. Other methods on `/` fall through to
/// the structured 404, and upgrade requests are relayed instead, like on any
/// other path.
async fn identity_handler(
    State(state): State<AppState>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    request: Request<Body>,
) -> Response {
    if let Some(response) =
        dispatch_upgrade(&state, remote, ws.ok(), request.headers(), request.uri()).await
    {
        return response;
    }

    let body = StatusBody::success(&state.config.server_info, request.headers(), remote);
    Json(body).into_response()
}

/// Requests under the API prefix: hand over to the HTTP relay.
async fn proxy_handler(
    State(state): State<AppState>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    request: Request<Body>,
) -> Response {
    if let Some(response) =
        dispatch_upgrade(&state, remote, ws.ok(), request.headers(), request.uri()).await
    {
        return response;
    }

    let start = Instant::now();
    let method = request.method().to_string();

    match relay::forward(&state, remote, request).await {
        Ok(response) => {
            metrics::record_request(&method, response.status().as_u16(), start);
            response.into_response()
        }
        Err(e) => {
            tracing::warn!(remote = %remote, code = e.code(), error = %e, "upstream relay failed");
            let response = e.into_response();
            metrics::record_request(&method, response.status().as_u16(), start);
            response
        }
    }
}

/// Unmatched routes: structured 404 carrying the same identity fields as
/// the health endpoint.
async fn fallback_handler(
    State(state): State<AppState>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    request: Request<Body>,
) -> Response {
    if let Some(response) =
        dispatch_upgrade(&state, remote, ws.ok(), request.headers(), request.uri()).await
    {
        return response;
    }

    let body = StatusBody::error(&state.config.server_info, request.headers(), remote);
    (StatusCode::NOT_FOUND, Json(body)).into_response()
}
