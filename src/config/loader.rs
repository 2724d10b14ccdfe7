//! Configuration loading from the process environment.

use thiserror::Error;
use url::Url;

use crate::config::schema::{
    GatewayConfig, HeaderPolicyConfig, ListenerConfig, ObservabilityConfig, PathPolicy,
    RoutingConfig, ServerInfo, TlsPaths, UpstreamConfig,
};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable was present but could not be parsed.
    #[error("invalid {name}={value}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

impl GatewayConfig {
    /// Build the configuration snapshot from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    ///
    /// Pure over the lookup, so tests can feed a map instead of mutating
    /// process-global environment state.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let server_info = ServerInfo {
            environment: lookup("APP_MODE").unwrap_or_else(|| "unknown".to_string()),
            service: lookup("APP_NAME").unwrap_or_else(|| "unnamedService".to_string()),
            version: lookup("APP_VERSION").unwrap_or_else(|| "v1.0.0".to_string()),
        };

        let base_url = match lookup("API_PROXY_URL") {
            Some(raw) => Url::parse(&raw).map_err(|e| ConfigError::Invalid {
                name: "API_PROXY_URL",
                value: raw,
                reason: e.to_string(),
            })?,
            None => UpstreamConfig::default().base_url,
        };
        let upstream = UpstreamConfig {
            base_url,
            timeout_ms: parse_or(&lookup, "PROXY_TIMEOUT_MS", 1000),
        };

        let routing = RoutingConfig {
            api_prefix: normalize_prefix(lookup("API_PREFIX")),
            path_policy: if flag(&lookup, "API_PREFIX_STRIP") {
                PathPolicy::Strip
            } else {
                PathPolicy::Preserve
            },
        };

        // TLS is configured only when both paths are present; anything less
        // downgrades to plaintext-only serving at listener startup.
        let tls = match (lookup("SSL_CERT_PATH"), lookup("SSL_KEY_PATH")) {
            (Some(cert_path), Some(key_path)) => Some(TlsPaths {
                cert_path,
                key_path,
            }),
            _ => None,
        };
        let listeners = ListenerConfig {
            http_port: parse_or(&lookup, "HTTP_PORT", 80),
            https_port: parse_or(&lookup, "HTTPS_PORT", 443),
            tls,
            request_timeout_secs: parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 30),
        };

        let headers = HeaderPolicyConfig {
            cors_allow_any_origin: flag(&lookup, "CORS_ALLOW_ANY_ORIGIN"),
        };

        let defaults = ObservabilityConfig::default();
        let observability = ObservabilityConfig {
            log_filter: lookup("LOG_FILTER").unwrap_or(defaults.log_filter),
            metrics_enabled: flag(&lookup, "METRICS_ENABLED"),
            metrics_address: lookup("METRICS_ADDRESS").unwrap_or(defaults.metrics_address),
        };

        Ok(Self {
            server_info,
            upstream,
            routing,
            listeners,
            headers,
            observability,
        })
    }
}

/// Parse a numeric variable, falling back to the default on absence or a
/// value that does not parse.
fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> T {
    match lookup(name) {
        Some(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(name, value = %raw, "unparseable value, using default");
                default
            }
        },
        None => default,
    }
}

fn flag(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> bool {
    matches!(
        lookup(name).as_deref(),
        Some("1") | Some("true") | Some("yes")
    )
}

/// Ensure the API prefix is a non-root absolute path.
fn normalize_prefix(raw: Option<String>) -> String {
    let default = RoutingConfig::default().api_prefix;
    let Some(raw) = raw else { return default };
    let trimmed = raw.trim_end_matches('/');
    if trimmed.is_empty() || !trimmed.starts_with('/') {
        tracing::warn!(value = %raw, "API_PREFIX must be an absolute non-root path, using default");
        return default;
    }
    trimmed.to_string()
}
