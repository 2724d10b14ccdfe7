//! Header propagation policy.
//!
//! A pure transformation from the inbound header set to the outbound one,
//! plus the client-address helpers shared with the identity responder.
//!
//! # Rules
//! - All inbound headers pass through except hop-by-hop headers and `Host`.
//! - `Host` is rewritten to the upstream authority (origin change).
//! - `X-Forwarded-For` gets the transport remote address appended.
//! - `X-Real-IP` is the transport remote address.
//! - `X-Forwarded-Proto` reflects the accepting listener's scheme.
//! - Upgrade requests keep `Upgrade` and force `Connection: upgrade`.

use std::net::SocketAddr;

use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};

pub static X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
pub static X_REAL_IP: HeaderName = HeaderName::from_static("x-real-ip");
pub static X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");

/// Scheme of the listener that accepted the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

/// Resolve the client address: first `X-Forwarded-For` value when present,
/// else the transport remote address. Never an "unknown" placeholder.
pub fn client_ip(headers: &HeaderMap, remote: SocketAddr) -> String {
    headers
        .get(&X_FORWARDED_FOR)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
        .unwrap_or_else(|| remote.ip().to_string())
}

/// Classify an address textually: IPv6 iff it contains a colon.
pub fn ip_type(ip: &str) -> &'static str {
    if ip.contains(':') {
        "IPv6"
    } else {
        "IPv4"
    }
}

/// Case-insensitive check for a declared `websocket` upgrade intent.
pub fn wants_websocket_upgrade(headers: &HeaderMap) -> bool {
    headers
        .get(header::UPGRADE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.eq_ignore_ascii_case("websocket"))
        .unwrap_or(false)
}

/// WebSocket negotiation headers owned by whichever side performs the
/// handshake; they are never copied between legs.
pub fn is_websocket_negotiation(name: &HeaderName) -> bool {
    name.as_str().starts_with("sec-websocket-")
}

/// Connection-scoped headers that must not be forwarded verbatim.
fn is_hop_by_hop(name: &HeaderName) -> bool {
    matches!(
        name.as_str(),
        "connection"
            | "keep-alive"
            | "proxy-connection"
            | "proxy-authenticate"
            | "proxy-authorization"
            | "te"
            | "trailer"
            | "transfer-encoding"
            | "upgrade"
    )
}

/// Produce the outbound header set for one relay operation.
pub fn outbound_headers(
    inbound: &HeaderMap,
    remote: SocketAddr,
    scheme: Scheme,
    upstream_authority: &str,
    upgrade: bool,
) -> HeaderMap {
    let mut outbound = HeaderMap::with_capacity(inbound.len() + 4);

    for (name, value) in inbound.iter() {
        if is_hop_by_hop(name) || *name == header::HOST {
            continue;
        }
        outbound.append(name.clone(), value.clone());
    }

    // Origin change: the upstream sees its own authority, not ours.
    if let Ok(host) = HeaderValue::from_str(upstream_authority) {
        outbound.insert(header::HOST, host);
    }

    let remote_ip = remote.ip().to_string();
    // An empty inbound chain must not contribute an empty list member.
    let forwarded_for = match inbound
        .get(&X_FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|existing| !existing.is_empty())
    {
        Some(existing) => format!("{existing}, {remote_ip}"),
        None => remote_ip.clone(),
    };
    if let Ok(value) = HeaderValue::from_str(&forwarded_for) {
        outbound.insert(X_FORWARDED_FOR.clone(), value);
    }
    if let Ok(value) = HeaderValue::from_str(&remote_ip) {
        outbound.insert(X_REAL_IP.clone(), value);
    }
    outbound.insert(
        X_FORWARDED_PROTO.clone(),
        HeaderValue::from_static(scheme.as_str()),
    );

    if upgrade {
        if let Some(value) = inbound.get(header::UPGRADE) {
            outbound.insert(header::UPGRADE, value.clone());
        }
        outbound.insert(header::CONNECTION, HeaderValue::from_static("upgrade"));
    }

    outbound
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote() -> SocketAddr {
        "198.51.100.9:40123".parse().unwrap()
    }

    #[test]
    fn client_ip_prefers_first_forwarded_value() {
        let mut headers = HeaderMap::new();
        headers.insert(
            X_FORWARDED_FOR.clone(),
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        assert_eq!(client_ip(&headers, remote()), "203.0.113.7");
    }

    #[test]
    fn client_ip_falls_back_to_remote_address() {
        assert_eq!(client_ip(&HeaderMap::new(), remote()), "198.51.100.9");

        // An empty header value must not produce an empty or placeholder IP.
        let mut headers = HeaderMap::new();
        headers.insert(X_FORWARDED_FOR.clone(), HeaderValue::from_static(""));
        assert_eq!(client_ip(&headers, remote()), "198.51.100.9");
    }

    #[test]
    fn ip_classification() {
        assert_eq!(ip_type("203.0.113.7"), "IPv4");
        assert_eq!(ip_type("2001:db8::1"), "IPv6");
        assert_eq!(ip_type("::1"), "IPv6");
    }

    #[test]
    fn upgrade_detection_is_case_insensitive() {
        let mut headers = HeaderMap::new();
        headers.insert(header::UPGRADE, HeaderValue::from_static("WebSocket"));
        assert!(wants_websocket_upgrade(&headers));
        assert!(!wants_websocket_upgrade(&HeaderMap::new()));
    }

    #[test]
    fn outbound_rewrites_host_and_adds_proxy_headers() {
        let mut inbound = HeaderMap::new();
        inbound.insert(header::HOST, HeaderValue::from_static("edge.example.com"));
        inbound.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

        let out = outbound_headers(&inbound, remote(), Scheme::Https, "10.0.0.5:8080", false);

        assert_eq!(out.get(header::HOST).unwrap(), "10.0.0.5:8080");
        assert_eq!(out.get(header::ACCEPT).unwrap(), "application/json");
        assert_eq!(out.get(&X_FORWARDED_FOR).unwrap(), "198.51.100.9");
        assert_eq!(out.get(&X_REAL_IP).unwrap(), "198.51.100.9");
        assert_eq!(out.get(&X_FORWARDED_PROTO).unwrap(), "https");
    }

    #[test]
    fn outbound_appends_to_existing_forwarded_for() {
        let mut inbound = HeaderMap::new();
        inbound.insert(
            X_FORWARDED_FOR.clone(),
            HeaderValue::from_static("203.0.113.7"),
        );

        let out = outbound_headers(&inbound, remote(), Scheme::Http, "backend:80", false);

        assert_eq!(
            out.get(&X_FORWARDED_FOR).unwrap(),
            "203.0.113.7, 198.51.100.9"
        );
    }

    #[test]
    fn outbound_ignores_empty_forwarded_for() {
        let mut inbound = HeaderMap::new();
        inbound.insert(X_FORWARDED_FOR.clone(), HeaderValue::from_static(""));

        let out = outbound_headers(&inbound, remote(), Scheme::Http, "backend:80", false);

        assert_eq!(out.get(&X_FORWARDED_FOR).unwrap(), "198.51.100.9");
    }

    #[test]
    fn outbound_drops_hop_by_hop_headers() {
        let mut inbound = HeaderMap::new();
        inbound.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        inbound.insert(
            header::TRANSFER_ENCODING,
            HeaderValue::from_static("chunked"),
        );
        inbound.insert(header::UPGRADE, HeaderValue::from_static("websocket"));

        let out = outbound_headers(&inbound, remote(), Scheme::Http, "backend:80", false);

        assert!(out.get(header::CONNECTION).is_none());
        assert!(out.get(header::TRANSFER_ENCODING).is_none());
        assert!(out.get(header::UPGRADE).is_none());
    }

    #[test]
    fn upgrade_requests_force_connection_upgrade() {
        let mut inbound = HeaderMap::new();
        inbound.insert(header::UPGRADE, HeaderValue::from_static("websocket"));
        inbound.insert(header::CONNECTION, HeaderValue::from_static("close"));

        let out = outbound_headers(&inbound, remote(), Scheme::Http, "backend:80", true);

        assert_eq!(out.get(header::UPGRADE).unwrap(), "websocket");
        assert_eq!(out.get(header::CONNECTION).unwrap(), "upgrade");
    }
}
