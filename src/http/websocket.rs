//! WebSocket session relay.
//!
//! # State Machine (per session)
//! ```text
//! Handshaking -> Paired -> Relaying -> Closing -> Closed
//!      │
//!      └─▶ (upstream handshake failed: structured 502, client socket torn
//!           down, no session ever existed)
//! ```
//!
//! # Design Decisions
//! - The upstream handshake completes before the client upgrade is
//!   finalized, so a failed pairing never leaves a half-open session.
//! - Frames are forwarded verbatim in both directions: text, binary, ping,
//!   pong and close all pass through without inspection.
//! - Each direction is its own task; whichever finishes first ends the
//!   session and the peer task is aborted, so neither direction can block
//!   forever on a socket that will never produce again.
//! - A send to an already-closed peer drops the frame and ends that
//!   direction at debug level; it never errors the still-live side.
//! - Sessions have no idle timeout; they persist until a termination
//!   trigger fires.

use std::net::SocketAddr;

use axum::{
    extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
    http::{header, HeaderMap, Uri},
    response::{IntoResponse, Response},
};
use futures_util::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async, tungstenite, tungstenite::client::IntoClientRequest, MaybeTlsStream,
    WebSocketStream,
};

use crate::http::headers;
use crate::http::relay::{self, UpstreamError};
use crate::http::server::AppState;
use crate::observability::metrics;

type UpstreamSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Complete the upstream handshake, then pair the client socket with it.
///
/// Returns either the `101 Switching Protocols` response that hands the
/// connection to [`relay_session`], or the structured error that tears the
/// client connection down.
pub async fn handle_upgrade(
    state: AppState,
    remote: SocketAddr,
    ws: WebSocketUpgrade,
    inbound: &HeaderMap,
    uri: &Uri,
) -> Response {
    let target = format!(
        "{}{}",
        state.config.upstream.ws_base(),
        relay::upstream_path(&state.config.routing, uri)
    );

    match connect_upstream(&state, remote, inbound, &target).await {
        Ok(upstream) => {
            metrics::ws_session_opened();
            tracing::info!(remote = %remote, target = %target, "websocket session paired");
            ws.on_upgrade(move |client| relay_session(client, upstream, remote))
        }
        Err(e) => {
            // Terminal: no session exists and nothing was relayed. Not
            // retried.
            tracing::warn!(
                remote = %remote,
                target = %target,
                error = %e,
                "upstream websocket handshake failed"
            );
            e.into_response()
        }
    }
}

/// Perform the client-side handshake against the upstream, carrying the
/// propagated header set.
async fn connect_upstream(
    state: &AppState,
    remote: SocketAddr,
    inbound: &HeaderMap,
    target: &str,
) -> Result<UpstreamSocket, UpstreamError> {
    let mut request = target
        .into_client_request()
        .map_err(|e| UpstreamError::HandshakeFailed(e.to_string()))?;

    let propagated = headers::outbound_headers(
        inbound,
        remote,
        state.scheme,
        state.upstream_authority(),
        true,
    );
    for (name, value) in propagated.iter() {
        // The handshake library owns its own negotiation headers; the
        // subprotocol offer is the one piece the upstream must still see.
        if *name == header::HOST || *name == header::CONNECTION || *name == header::UPGRADE {
            continue;
        }
        if headers::is_websocket_negotiation(name) && name.as_str() != "sec-websocket-protocol" {
            continue;
        }
        request.headers_mut().append(name.clone(), value.clone());
    }

    match connect_async(request).await {
        Ok((socket, response)) => {
            tracing::debug!(status = %response.status(), target, "upstream handshake complete");
            Ok(socket)
        }
        Err(e) => Err(UpstreamError::HandshakeFailed(e.to_string())),
    }
}

/// Pump frames in both directions until either side closes or errors.
///
/// The session owns both sockets for its entire lifetime. When one
/// direction ends, the other is aborted and both halves drop, closing the
/// underlying sockets; teardown happens exactly once.
async fn relay_session(client: WebSocket, upstream: UpstreamSocket, remote: SocketAddr) {
    let (client_sink, client_stream) = client.split();
    let (upstream_sink, upstream_stream) = upstream.split();

    let mut client_to_upstream = tokio::spawn(pump_client_to_upstream(client_stream, upstream_sink));
    let mut upstream_to_client = tokio::spawn(pump_upstream_to_client(upstream_stream, client_sink));

    tokio::select! {
        _ = &mut client_to_upstream => upstream_to_client.abort(),
        _ = &mut upstream_to_client => client_to_upstream.abort(),
    }

    metrics::ws_session_closed();
    tracing::info!(remote = %remote, "websocket session closed");
}

async fn pump_client_to_upstream(
    mut client: SplitStream<WebSocket>,
    mut upstream: SplitSink<UpstreamSocket, tungstenite::Message>,
) {
    while let Some(received) = client.next().await {
        let message = match received {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!(error = %e, "client socket error");
                break;
            }
        };
        let closing = matches!(message, Message::Close(_));
        if let Err(e) = upstream.send(to_upstream_message(message)).await {
            tracing::debug!(error = %e, "dropping frame for closed upstream");
            break;
        }
        if closing {
            break;
        }
    }
    let _ = upstream.close().await;
}

async fn pump_upstream_to_client(
    mut upstream: SplitStream<UpstreamSocket>,
    mut client: SplitSink<WebSocket, Message>,
) {
    while let Some(received) = upstream.next().await {
        let message = match received {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!(error = %e, "upstream socket error");
                break;
            }
        };
        let closing = matches!(message, tungstenite::Message::Close(_));
        let Some(forward) = to_client_message(message) else {
            continue;
        };
        if let Err(e) = client.send(forward).await {
            tracing::debug!(error = %e, "dropping frame for closed client");
            break;
        }
        if closing {
            break;
        }
    }
    let _ = client.close().await;
}

fn to_upstream_message(message: Message) -> tungstenite::Message {
    match message {
        Message::Text(text) => tungstenite::Message::Text(text.as_str().into()),
        Message::Binary(data) => tungstenite::Message::Binary(data),
        Message::Ping(data) => tungstenite::Message::Ping(data),
        Message::Pong(data) => tungstenite::Message::Pong(data),
        Message::Close(frame) => tungstenite::Message::Close(frame.map(|f| {
            tungstenite::protocol::CloseFrame {
                code: f.code.into(),
                reason: f.reason.as_str().into(),
            }
        })),
    }
}

fn to_client_message(message: tungstenite::Message) -> Option<Message> {
    match message {
        tungstenite::Message::Text(text) => Some(Message::Text(text.as_str().into())),
        tungstenite::Message::Binary(data) => Some(Message::Binary(data)),
        tungstenite::Message::Ping(data) => Some(Message::Ping(data)),
        tungstenite::Message::Pong(data) => Some(Message::Pong(data)),
        tungstenite::Message::Close(frame) => Some(Message::Close(frame.map(|f| CloseFrame {
            code: f.code.into(),
            reason: f.reason.as_str().into(),
        }))),
        // Raw frames only appear under manual framing configs; nothing to
        // relay.
        tungstenite::Message::Frame(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_frames_convert_verbatim() {
        let out = to_upstream_message(Message::Text("hello".into()));
        assert_eq!(out, tungstenite::Message::Text("hello".into()));

        let back = to_client_message(tungstenite::Message::Text("hello".into())).unwrap();
        assert_eq!(back, Message::Text("hello".into()));
    }

    #[test]
    fn binary_frames_convert_verbatim() {
        let payload = axum::body::Bytes::from_static(&[0x01, 0x02, 0xff]);
        let out = to_upstream_message(Message::Binary(payload.clone()));
        assert_eq!(out, tungstenite::Message::Binary(payload.clone()));

        let back = to_client_message(tungstenite::Message::Binary(payload.clone())).unwrap();
        assert_eq!(back, Message::Binary(payload));
    }

    #[test]
    fn close_frames_keep_code_and_reason() {
        let out = to_upstream_message(Message::Close(Some(CloseFrame {
            code: 1001,
            reason: "going away".into(),
        })));
        match out {
            tungstenite::Message::Close(Some(frame)) => {
                assert_eq!(u16::from(frame.code), 1001);
                assert_eq!(frame.reason.as_str(), "going away");
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn raw_frames_are_not_relayed() {
        let frame = tungstenite::protocol::frame::Frame::pong(vec![]);
        assert!(to_client_message(tungstenite::Message::Frame(frame)).is_none());
    }
}
