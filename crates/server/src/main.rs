use anyhow::Result;
use axum::serve;
use chainlens_core::{
    config::AppConfig,
    dispatch::{DispatchEngine, SharedContext},
    metrics::init_metrics,
};
use rustls::crypto::{ring::default_provider, CryptoProvider};
use server::{build_cache_store, create_app, init_logging};
use std::sync::Arc;
use tokio::{signal, sync::broadcast};
use tracing::{debug, error, info};

#[tokio::main]
async fn main() -> Result<()> {
    CryptoProvider::install_default(default_provider())
        .map_err(|e| anyhow::anyhow!("Failed to install crypto provider: {e:?}"))?;

    let config =
        AppConfig::load().map_err(|e| anyhow::anyhow!("Configuration loading failed: {e}"))?;
    config.validate().map_err(|e| anyhow::anyhow!("Configuration validation failed: {e}"))?;

    init_logging(&config.logging);
    info!("Starting chainlens");
    debug!(
        cache_backend = config.cache.backend.as_str(),
        bind_port = config.server.bind_port,
        metrics_enabled = config.metrics.enabled,
        "Configuration loaded"
    );

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    let metrics_collector =
        init_metrics().map_err(|e| anyhow::anyhow!("Failed to initialize metrics: {e}"))?;
    let store = build_cache_store(&config.cache, shutdown_tx.subscribe()).await?;
    let ctx = SharedContext::from_config(&config, store, metrics_collector)
        .map_err(|e| anyhow::anyhow!("Dispatch engine initialization failed: {e}"))?;
    info!(chains = ctx.registry.len(), "Chain registry initialized");

    let engine = Arc::new(DispatchEngine::new(ctx));
    let app = create_app(engine, &config);

    let addr = config.socket_addr().map_err(|e| anyhow::anyhow!(e))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, "chainlens listening");

    if let Err(e) = serve(listener, app).with_graceful_shutdown(shutdown_signal()).await {
        error!(error = %e, "Server error occurred");
    }

    let _ = shutdown_tx.send(());
    info!("Server shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install signal handler");
                () = std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown");
}
