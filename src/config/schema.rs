//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits so the snapshot can be logged or exported.

use serde::{Deserialize, Serialize};
use url::Url;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Process identity reported by the health endpoint.
    pub server_info: ServerInfo,

    /// The single upstream everything is proxied to.
    pub upstream: UpstreamConfig,

    /// API prefix matching and path rewrite policy.
    pub routing: RoutingConfig,

    /// Listener ports and optional TLS material.
    pub listeners: ListenerConfig,

    /// Response header override policy.
    pub headers: HeaderPolicyConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Immutable process identity, set once at startup from the environment.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerInfo {
    /// Deployment environment name (e.g. "production").
    pub environment: String,

    /// Service name.
    pub service: String,

    /// Service version string.
    pub version: String,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            environment: "unknown".to_string(),
            service: "unnamedService".to_string(),
            version: "v1.0.0".to_string(),
        }
    }
}

/// Upstream target configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL of the upstream service (scheme + host + port).
    pub base_url: Url,

    /// Bounded wait for an upstream response, in milliseconds.
    pub timeout_ms: u64,
}

impl UpstreamConfig {
    /// Upstream authority (`host` or `host:port`) used for the rewritten
    /// `Host` header and outbound request URIs.
    pub fn authority(&self) -> String {
        let host = self.base_url.host_str().unwrap_or("localhost");
        match self.base_url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        }
    }

    /// WebSocket base (`ws://...` or `wss://...`) derived from the HTTP base.
    pub fn ws_base(&self) -> String {
        let scheme = if self.base_url.scheme() == "https" {
            "wss"
        } else {
            "ws"
        };
        format!("{scheme}://{}", self.authority())
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse("http://127.0.0.1:3000").expect("static default URL"),
            timeout_ms: 1000,
        }
    }
}

/// How the API prefix is treated when building the upstream path.
///
/// One policy applies process-wide; it never varies per route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PathPolicy {
    /// Forward the inbound path unchanged, prefix included.
    #[default]
    Preserve,
    /// Remove the API prefix before forwarding.
    Strip,
}

/// Routing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Path prefix under which requests are proxied upstream.
    pub api_prefix: String,

    /// Prefix rewrite policy applied when building the upstream path.
    pub path_policy: PathPolicy,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            api_prefix: "/api".to_string(),
            path_policy: PathPolicy::Preserve,
        }
    }
}

/// Paths to PEM-encoded TLS material.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsPaths {
    /// Path to the certificate file.
    pub cert_path: String,

    /// Path to the private key file.
    pub key_path: String,
}

/// Listener configuration.
///
/// The plaintext and TLS listeners start independently: missing TLS
/// material must never prevent the plaintext listener from serving.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Plaintext listener port.
    pub http_port: u16,

    /// TLS listener port, used only when `tls` material loads.
    pub https_port: u16,

    /// Optional TLS material; `None` when the environment does not provide
    /// both a key and a certificate path.
    pub tls: Option<TlsPaths>,

    /// Outer per-request timeout in seconds (whole handler, not just the
    /// upstream wait).
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            http_port: 80,
            https_port: 443,
            tls: None,
            request_timeout_secs: 30,
        }
    }
}

/// Response header override policy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct HeaderPolicyConfig {
    /// Force `Access-Control-Allow-Origin: *` on proxied responses after the
    /// upstream headers are copied.
    pub cors_allow_any_origin: bool,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default tracing filter (overridden by `RUST_LOG`).
    pub log_filter: String,

    /// Enable the Prometheus metrics exporter.
    pub metrics_enabled: bool,

    /// Metrics exporter bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_filter: "edge_gateway=debug,tower_http=debug".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
