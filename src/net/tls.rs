//! TLS configuration and certificate loading.

use std::io;
use std::path::Path;

use axum_server::tls_rustls::RustlsConfig;

use crate::config::schema::ListenerConfig;

/// Load TLS configuration from certificate and key files.
pub async fn load_tls_config(cert_path: &Path, key_path: &Path) -> Result<RustlsConfig, io::Error> {
    if !cert_path.exists() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("certificate file not found: {cert_path:?}"),
        ));
    }
    if !key_path.exists() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("private key file not found: {key_path:?}"),
        ));
    }

    // Reject key files with no parseable private key up front; the error
    // from the TLS stack for that case is opaque.
    let key_bytes = tokio::fs::read(key_path).await?;
    let mut reader = io::BufReader::new(key_bytes.as_slice());
    let has_key = rustls_pemfile::read_all(&mut reader)
        .filter_map(Result::ok)
        .any(|item| {
            matches!(
                item,
                rustls_pemfile::Item::Pkcs1Key(_)
                    | rustls_pemfile::Item::Pkcs8Key(_)
                    | rustls_pemfile::Item::Sec1Key(_)
            )
        });
    if !has_key {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("no private key found in {key_path:?}"),
        ));
    }

    RustlsConfig::from_pem_file(cert_path, key_path).await
}

/// Load the configured TLS material, if any.
///
/// Missing or invalid material is a warning, never fatal: the TLS listener
/// is skipped and the plaintext listener serves alone.
pub async fn try_load(listeners: &ListenerConfig) -> Option<RustlsConfig> {
    let tls = match &listeners.tls {
        Some(tls) => tls,
        None => {
            tracing::warn!("SSL_CERT_PATH/SSL_KEY_PATH not set, serving plaintext only");
            return None;
        }
    };

    match load_tls_config(Path::new(&tls.cert_path), Path::new(&tls.key_path)).await {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!(
                cert_path = %tls.cert_path,
                key_path = %tls.key_path,
                error = %e,
                "TLS material unavailable, skipping TLS listener"
            );
            None
        }
    }
}
