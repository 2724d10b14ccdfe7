use std::net::SocketAddr;

use tokio::net::TcpListener;

use edge_gateway::config::GatewayConfig;
use edge_gateway::http::headers::Scheme;
use edge_gateway::http::GatewayServer;
use edge_gateway::lifecycle::Shutdown;
use edge_gateway::net::tls;
use edge_gateway::observability::{logging, metrics};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = GatewayConfig::from_env()?;

    logging::init(&config.observability.log_filter);
    logging::install_panic_hook();

    tracing::info!(
        environment = %config.server_info.environment,
        service = %config.server_info.service,
        version = %config.server_info.version,
        upstream = %config.upstream.base_url,
        api_prefix = %config.routing.api_prefix,
        "edge-gateway starting"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let shutdown = Shutdown::new();

    // TLS listener, only when the material actually loads. Absence or bad
    // material downgrades to plaintext-only serving.
    if let Some(tls_config) = tls::try_load(&config.listeners).await {
        let https_addr = SocketAddr::from(([0, 0, 0, 0], config.listeners.https_port));
        let server = GatewayServer::new(config.clone(), Scheme::Https);
        tracing::info!(address = %https_addr, "TLS listener started");
        tokio::spawn(async move {
            if let Err(e) = axum_server::bind_rustls(https_addr, tls_config)
                .serve(server.into_make_service())
                .await
            {
                tracing::error!(error = %e, "TLS listener failed");
            }
        });
    }

    // Plaintext listener always serves.
    let http_addr = SocketAddr::from(([0, 0, 0, 0], config.listeners.http_port));
    let listener = TcpListener::bind(http_addr).await?;

    let signal = shutdown.subscribe();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown signal received");
            shutdown.trigger();
        }
    });

    let server = GatewayServer::new(config, Scheme::Http);
    server.run(listener, signal).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
