use axum::{error_handling::HandleErrorLayer, routing::get, BoxError, Router};
use chainlens_core::{
    cache::{CacheStore, MemoryStore, RedisStore},
    config::{AppConfig, CacheBackend, CacheConfig},
    dispatch::DispatchEngine,
};
use std::{sync::Arc, time::Duration};
use tokio::sync::broadcast;
use tower::{limit::ConcurrencyLimitLayer, timeout::error::Elapsed, ServiceBuilder};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::{error::ApiError, middleware, router};

/// How often expired entries are swept from the in-process cache.
const MEMORY_PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// Builds the full HTTP application.
///
/// Empty trailing segments (`/api/v1/blocks/latest/`) are routed to handlers that pass an
/// empty identifier to the engine, so the engine's validation error is what the client sees.
pub fn create_app(engine: Arc<DispatchEngine>, config: &AppConfig) -> Router {
    let (set_request_id, propagate_request_id) = middleware::create_request_id_layers();
    let request_timeout = config.request_timeout();

    let mut public = Router::new().route("/health", get(router::handle_health));
    if config.metrics.enabled {
        public = public.route("/metrics", get(router::handle_metrics));
    }

    let api = Router::new()
        .route("/api/v1/blocks/latest/{chain}", get(router::handle_latest_block))
        .route("/api/v1/blocks/latest/", get(router::handle_latest_block_missing))
        .route("/api/v1/blocks/latest", get(router::handle_latest_block_missing))
        .route("/api/v1/tx/total/{chain}", get(router::handle_total_tx))
        .route("/api/v1/tx/total/", get(router::handle_total_tx_missing))
        .route("/api/v1/tx/{hash}", get(router::handle_search))
        .route("/api/v1/tx/", get(router::handle_search_missing))
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(move |err: BoxError| async move {
                    deadline_error(&err, request_timeout)
                }))
                .timeout(request_timeout),
        )
        .layer(ConcurrencyLimitLayer::new(config.server.max_concurrent_requests));

    let trace = TraceLayer::new_for_http()
        .make_span_with(middleware::make_request_span::<axum::body::Body>);

    // Layers run bottom-up: the ID is set first, then the span sees it.
    public
        .merge(api)
        .with_state(engine)
        .layer(trace)
        .layer(propagate_request_id)
        .layer(set_request_id)
}

/// Maps a failure from the timeout stack onto the JSON error body.
fn deadline_error(err: &BoxError, limit: Duration) -> ApiError {
    if err.is::<Elapsed>() {
        warn!(timeout_secs = limit.as_secs_f64(), "request deadline exceeded");
        ApiError::Timeout(limit)
    } else {
        ApiError::Layer(err.to_string())
    }
}

/// Connects the configured cache backend.
///
/// The in-process store gets a background sweeper that stops on `shutdown`.
///
/// # Errors
///
/// Fails if the Redis backend is selected and cannot be reached.
pub async fn build_cache_store(
    config: &CacheConfig,
    shutdown: broadcast::Receiver<()>,
) -> anyhow::Result<Arc<dyn CacheStore>> {
    match config.backend {
        CacheBackend::Redis => {
            let url = config
                .redis_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("cache.redis_url is required for redis"))?;
            let store = RedisStore::connect(url)
                .await
                .map_err(|e| anyhow::anyhow!("Redis cache initialization failed: {e}"))?;
            Ok(Arc::new(store))
        }
        CacheBackend::Memory => {
            let store = Arc::new(MemoryStore::new());
            spawn_memory_purge(store.clone(), shutdown);
            info!("using in-process cache");
            Ok(store)
        }
    }
}

fn spawn_memory_purge(store: Arc<MemoryStore>, mut shutdown: broadcast::Receiver<()>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(MEMORY_PURGE_INTERVAL);
        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                _ = interval.tick() => {
                    let removed = store.purge_expired();
                    if removed > 0 {
                        debug!(removed = removed, remaining = store.len(), "purged expired cache entries");
                    }
                }
            }
        }
    });
}
