//! Shared utilities for gateway integration tests.

use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
    extract::Request,
    response::{IntoResponse, Response},
    Json, Router,
};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use edge_gateway::config::GatewayConfig;
use edge_gateway::http::{GatewayServer, Scheme};
use edge_gateway::lifecycle::Shutdown;

/// Gateway configuration pointing at a local upstream port.
pub fn test_config(upstream_port: u16) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.upstream.base_url = format!("http://127.0.0.1:{upstream_port}")
        .parse()
        .unwrap();
    config
}

/// Start the gateway's plaintext listener on `addr`.
pub async fn start_gateway(config: GatewayConfig, addr: SocketAddr) -> Shutdown {
    let shutdown = Shutdown::new();
    let signal = shutdown.subscribe();
    let listener = TcpListener::bind(addr).await.unwrap();
    let server = GatewayServer::new(config, Scheme::Http);
    tokio::spawn(async move {
        let _ = server.run(listener, signal).await;
    });
    shutdown
}

/// Backend that reflects the request it received as JSON: method, path with
/// query, headers (comma-joined when repeated) and body.
#[allow(dead_code)]
pub async fn start_echo_backend(addr: SocketAddr) {
    async fn echo(request: Request) -> Response {
        let (parts, body) = request.into_parts();
        let bytes = axum::body::to_bytes(body, usize::MAX)
            .await
            .unwrap_or_default();

        let mut headers = serde_json::Map::new();
        for name in parts.headers.keys() {
            let joined = parts
                .headers
                .get_all(name)
                .iter()
                .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
                .collect::<Vec<_>>()
                .join(", ");
            headers.insert(name.to_string(), json!(joined));
        }

        Json(json!({
            "method": parts.method.as_str(),
            "path": parts.uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/"),
            "headers": headers,
            "body": String::from_utf8_lossy(&bytes),
        }))
        .into_response()
    }

    let app = Router::new().fallback(echo);
    let listener = TcpListener::bind(addr).await.unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
}

/// Backend that sleeps for `delay` before answering every request.
#[allow(dead_code)]
pub async fn start_slow_backend(addr: SocketAddr, delay: Duration) {
    let app = Router::new().fallback(move || async move {
        tokio::time::sleep(delay).await;
        "late"
    });
    let listener = TcpListener::bind(addr).await.unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
}

/// WebSocket upstream that echoes text and binary frames on every path.
///
/// The returned receiver yields one unit per session once that session's
/// socket has fully closed, so tests can assert close propagation.
#[allow(dead_code)]
pub async fn start_ws_echo_upstream(addr: SocketAddr) -> mpsc::UnboundedReceiver<()> {
    async fn echo_session(mut socket: WebSocket, closed: mpsc::UnboundedSender<()>) {
        while let Some(Ok(message)) = socket.recv().await {
            match message {
                Message::Close(_) => break,
                Message::Text(_) | Message::Binary(_) => {
                    if socket.send(message).await.is_err() {
                        break;
                    }
                }
                _ => {}
            }
        }
        let _ = closed.send(());
    }

    let (tx, rx) = mpsc::unbounded_channel();
    let app = Router::new().fallback(move |ws: WebSocketUpgrade| {
        let tx = tx.clone();
        async move { ws.on_upgrade(move |socket| echo_session(socket, tx)) }
    });
    let listener = TcpListener::bind(addr).await.unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    rx
}

/// WebSocket upstream that closes the session right after the first frame.
#[allow(dead_code)]
pub async fn start_ws_closing_upstream(addr: SocketAddr) {
    async fn close_after_first(mut socket: WebSocket) {
        if socket.recv().await.is_some() {
            let _ = socket
                .send(Message::Close(Some(CloseFrame {
                    code: 1000,
                    reason: "done".into(),
                })))
                .await;
        }
    }

    let app = Router::new()
        .fallback(|ws: WebSocketUpgrade| async move { ws.on_upgrade(close_after_first) });
    let listener = TcpListener::bind(addr).await.unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
}
