//! JSON response shapes.
//!
//! Two shapes leave the gateway itself (proxied responses pass through
//! untouched): the identity/health payload served by `GET /` and unmatched
//! routes, and the machine-readable error payload for relay failures.

use std::net::SocketAddr;

use axum::http::{header, HeaderMap};
use serde::Serialize;

use crate::config::schema::ServerInfo;
use crate::http::headers;

/// Identity/health payload: process identity plus caller metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusBody {
    pub status: &'static str,
    pub environment: String,
    pub service: String,
    pub version: String,
    pub user_agent: String,
    pub ip_address: String,
    pub ip_type: &'static str,
}

impl StatusBody {
    fn new(
        status: &'static str,
        info: &ServerInfo,
        headers: &HeaderMap,
        remote: SocketAddr,
    ) -> Self {
        let ip_address = headers::client_ip(headers, remote);
        Self {
            status,
            environment: info.environment.clone(),
            service: info.service.clone(),
            version: info.version.clone(),
            user_agent: headers
                .get(header::USER_AGENT)
                .and_then(|value| value.to_str().ok())
                .unwrap_or("unknown")
                .to_string(),
            ip_type: headers::ip_type(&ip_address),
            ip_address,
        }
    }

    pub fn success(info: &ServerInfo, headers: &HeaderMap, remote: SocketAddr) -> Self {
        Self::new("success", info, headers, remote)
    }

    pub fn error(info: &ServerInfo, headers: &HeaderMap, remote: SocketAddr) -> Self {
        Self::new("error", info, headers, remote)
    }
}

/// Machine-readable error payload for relay failures. Clients never see a
/// raw error string or stack trace.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub status: &'static str,
    pub code: &'static str,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn remote() -> SocketAddr {
        "192.0.2.4:55000".parse().unwrap()
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let mut headers = HeaderMap::new();
        headers.insert(header::USER_AGENT, HeaderValue::from_static("curl/8.0"));

        let body = StatusBody::success(&ServerInfo::default(), &headers, remote());
        let json: serde_json::Value = serde_json::to_value(&body).unwrap();

        assert_eq!(json["status"], "success");
        assert_eq!(json["environment"], "unknown");
        assert_eq!(json["service"], "unnamedService");
        assert_eq!(json["version"], "v1.0.0");
        assert_eq!(json["userAgent"], "curl/8.0");
        assert_eq!(json["ipAddress"], "192.0.2.4");
        assert_eq!(json["ipType"], "IPv4");
    }

    #[test]
    fn missing_user_agent_reads_unknown() {
        let body = StatusBody::error(&ServerInfo::default(), &HeaderMap::new(), remote());
        assert_eq!(body.status, "error");
        assert_eq!(body.user_agent, "unknown");
    }

    #[test]
    fn forwarded_address_drives_classification() {
        let mut headers = HeaderMap::new();
        headers.insert(
            headers::X_FORWARDED_FOR.clone(),
            HeaderValue::from_static("2001:db8::1"),
        );

        let body = StatusBody::success(&ServerInfo::default(), &headers, remote());
        assert_eq!(body.ip_address, "2001:db8::1");
        assert_eq!(body.ip_type, "IPv6");
    }
}
