use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::{
    collections::BTreeMap,
    future::Future,
    sync::Arc,
    time::{Duration, Instant},
};
use tracing::{debug, warn};

use crate::{
    analytics::{AnalyticsClient, AnalyticsError},
    cache::{CacheKey, CacheStore, ResponseCache},
    chain::{ChainDescriptor, ChainId, ChainRegistry, RegistryError},
    config::AppConfig,
    metrics::{DispatchOutcome, MetricsCollector},
    protocol::ProtocolAdapter,
    upstream::{HttpClient, HttpClientConfig, UpstreamError},
};

use super::{
    errors::DispatchError,
    handlers::{BlocksHandler, TransactionsHandler, TxCountHandler},
};

/// Search result: chain → opaque per-chain payload, ordered by chain.
pub type AggregatedResult = BTreeMap<ChainId, Value>;

/// Timeouts and TTLs the handlers need beyond what the cache itself carries.
#[derive(Debug, Clone, Copy)]
pub struct DispatchSettings {
    pub rpc_timeout: Duration,
    pub search_timeout: Duration,
    pub search_ttl: Duration,
    pub count_ttl: Duration,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            rpc_timeout: Duration::from_secs(10),
            search_timeout: Duration::from_secs(30),
            search_ttl: Duration::from_secs(3600),
            count_ttl: Duration::from_secs(300),
        }
    }
}

impl DispatchSettings {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            rpc_timeout: config.chains.rpc_timeout(),
            search_timeout: config.dispatch.search_timeout(),
            search_ttl: config.cache.search_ttl(),
            count_ttl: config.cache.count_ttl(),
        }
    }
}

/// Failures while assembling a [`SharedContext`] from configuration.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("chain registry: {0}")]
    Registry(#[from] RegistryError),

    #[error("http client: {0}")]
    Http(#[from] UpstreamError),

    #[error("analytics client: {0}")]
    Analytics(#[from] AnalyticsError),
}

/// Shared context for all dispatch handlers.
///
/// Everything in here is immutable or internally synchronized, so handlers share one
/// `Arc<SharedContext>` and fan-out units clone out the pieces they need.
#[derive(Clone)]
pub struct SharedContext {
    pub registry: Arc<ChainRegistry>,
    pub cache: ResponseCache,
    pub http: Arc<HttpClient>,
    pub analytics: Arc<AnalyticsClient>,
    pub metrics_collector: Arc<MetricsCollector>,
    pub settings: DispatchSettings,
}

impl SharedContext {
    /// Builds the registry, HTTP pool and analytics client described by `config` around an
    /// already connected cache store.
    ///
    /// # Errors
    ///
    /// Returns [`InitError`] if the chain configuration is invalid or a client cannot be
    /// constructed.
    pub fn from_config(
        config: &AppConfig,
        store: Arc<dyn CacheStore>,
        metrics_collector: Arc<MetricsCollector>,
    ) -> Result<Self, InitError> {
        let registry = Arc::new(ChainRegistry::from_config(&config.chains)?);
        let http = Arc::new(HttpClient::with_config(HttpClientConfig {
            concurrent_limit: config.chains.max_concurrent_rpc,
            ..HttpClientConfig::default()
        })?);
        let analytics = Arc::new(AnalyticsClient::new(http.clone(), &config.analytics)?);
        let cache =
            ResponseCache::new(store, &config.cache.namespace, config.cache.default_ttl());

        Ok(Self {
            registry,
            cache,
            http,
            analytics,
            metrics_collector,
            settings: DispatchSettings::from_config(config),
        })
    }

    /// Resolves a chain identifier, rejecting empty input first.
    ///
    /// # Errors
    ///
    /// [`DispatchError::Validation`] for an empty identifier,
    /// [`DispatchError::UnsupportedChain`] for anything the registry does not know.
    pub fn resolve(&self, identifier: &str) -> Result<Arc<ChainDescriptor>, DispatchError> {
        if identifier.is_empty() {
            return Err(DispatchError::Validation("missing chain".into()));
        }
        Ok(self.registry.resolve(identifier)?.clone())
    }

    /// Builds the protocol adapter for a descriptor.
    ///
    /// # Errors
    ///
    /// An unusable endpoint surfaces as [`DispatchError::ClientConnection`].
    pub fn connect(&self, descriptor: &Arc<ChainDescriptor>) -> Result<ProtocolAdapter, DispatchError> {
        ProtocolAdapter::connect(descriptor.clone(), self.http.clone(), self.settings.rpc_timeout)
            .map_err(|e| self.upstream_failure(descriptor.id(), e))
    }

    /// Counts an upstream failure and converts it to the caller-facing error.
    pub fn upstream_failure(&self, chain: ChainId, error: UpstreamError) -> DispatchError {
        self.metrics_collector.record_upstream_error(chain.as_str(), &error);
        DispatchError::from_upstream(chain, error)
    }

    /// Cache-aside read. Backend and decode failures are logged and behave as a miss.
    pub async fn cache_lookup<T: DeserializeOwned>(&self, key: &CacheKey<'_>) -> Option<T> {
        match self.cache.get_json(key).await {
            Ok(Some(value)) => {
                debug!(key = %key, "cache hit");
                self.metrics_collector.record_cache_hit(key.kind());
                Some(value)
            }
            Ok(None) => {
                self.metrics_collector.record_cache_miss(key.kind());
                None
            }
            Err(e) => {
                warn!(key = %key, error = %e, "cache read failed, treating as miss");
                self.metrics_collector.record_cache_error(key.kind(), "get");
                self.metrics_collector.record_cache_miss(key.kind());
                None
            }
        }
    }

    /// Cache-aside write. Failures are logged and never reach the caller.
    pub async fn cache_store<T: Serialize + ?Sized>(
        &self,
        key: &CacheKey<'_>,
        value: &T,
        ttl: Option<Duration>,
    ) {
        let result = match ttl {
            Some(ttl) => self.cache.set_json_with_ttl(key, value, ttl).await,
            None => self.cache.set_json(key, value).await,
        };
        if let Err(e) = result {
            warn!(key = %key, error = %e, "cache write failed");
            self.metrics_collector.record_cache_error(key.kind(), "set");
        }
    }
}

/// Entry point for the three query operations.
///
/// Each call validates its input, consults the cache, and only on a miss reaches the
/// chain endpoints or the analytics API. Thread-safe; share it behind an `Arc`.
pub struct DispatchEngine {
    ctx: Arc<SharedContext>,
    blocks_handler: BlocksHandler,
    transactions_handler: TransactionsHandler,
    tx_count_handler: TxCountHandler,
}

impl DispatchEngine {
    #[must_use]
    pub fn new(ctx: SharedContext) -> Self {
        let ctx = Arc::new(ctx);
        Self {
            blocks_handler: BlocksHandler::new(ctx.clone()),
            transactions_handler: TransactionsHandler::new(ctx.clone()),
            tx_count_handler: TxCountHandler::new(ctx.clone()),
            ctx,
        }
    }

    #[must_use]
    pub fn context(&self) -> &Arc<SharedContext> {
        &self.ctx
    }

    /// Latest block of `chain` as JSON.
    ///
    /// # Errors
    ///
    /// See [`BlocksHandler::latest_block`].
    pub async fn get_latest_block(&self, chain: &str) -> Result<Value, DispatchError> {
        self.observe("latest_block", self.blocks_handler.latest_block(chain)).await
    }

    /// Every chain on which `hash` was found, with its per-chain payload.
    ///
    /// # Errors
    ///
    /// See [`TransactionsHandler::search`].
    pub async fn search_transaction_hash(
        &self,
        hash: &str,
    ) -> Result<AggregatedResult, DispatchError> {
        self.observe("search_tx_hash", self.transactions_handler.search(hash)).await
    }

    /// Transactions committed on `chain` in the trailing 24 hours.
    ///
    /// # Errors
    ///
    /// See [`TxCountHandler::total_last_24h`].
    pub async fn count_total_tx_last_24h(&self, chain: &str) -> Result<i64, DispatchError> {
        self.observe("count_tx_24h", self.tx_count_handler.total_last_24h(chain)).await
    }

    async fn observe<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<(T, DispatchOutcome), DispatchError>>,
    ) -> Result<T, DispatchError> {
        let start = Instant::now();
        let result = call.await;
        let latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        match result {
            Ok((value, outcome)) => {
                self.ctx.metrics_collector.record_dispatch(operation, outcome, latency_ms);
                Ok(value)
            }
            Err(e) => {
                self.ctx.metrics_collector.record_dispatch(
                    operation,
                    DispatchOutcome::Failed,
                    latency_ms,
                );
                if e.is_client_error() {
                    debug!(operation = operation, error = %e, "request rejected");
                } else {
                    warn!(operation = operation, error = %e, "request failed");
                }
                Err(e)
            }
        }
    }
}
