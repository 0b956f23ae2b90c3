use std::sync::Arc;
use tracing::debug;

use crate::{
    cache::CacheKey,
    dispatch::{engine::SharedContext, errors::DispatchError},
    metrics::DispatchOutcome,
};

/// Serves 24h transaction counts from the analytics API, cached for the count TTL.
pub struct TxCountHandler {
    ctx: Arc<SharedContext>,
}

impl TxCountHandler {
    #[must_use]
    pub fn new(ctx: Arc<SharedContext>) -> Self {
        Self { ctx }
    }

    /// # Errors
    /// - [`DispatchError::Validation`] / [`DispatchError::UnsupportedChain`] as for blocks
    /// - [`DispatchError::TxCountUnsupported`] for chains the analytics API does not index,
    ///   raised before any network call
    /// - [`DispatchError::Analytics`] when the analytics call fails
    pub async fn total_last_24h(
        &self,
        identifier: &str,
    ) -> Result<(i64, DispatchOutcome), DispatchError> {
        let descriptor = self.ctx.resolve(identifier)?;
        let chain = descriptor.id();
        if !descriptor.supports_tx_count() {
            return Err(DispatchError::TxCountUnsupported(chain));
        }

        let key = CacheKey::TotalTx(chain);
        if let Some(total) = self.ctx.cache_lookup::<i64>(&key).await {
            return Ok((total, DispatchOutcome::CacheHit));
        }

        debug!(chain = %chain, "querying analytics for 24h transaction count");
        let result = self.ctx.analytics.count_transactions_24h(chain).await;
        self.ctx.metrics_collector.record_analytics_request(chain.as_str(), result.is_ok());
        let total = result?;

        self.ctx.cache_store(&key, &total, Some(self.ctx.settings.count_ttl)).await;
        Ok((total, DispatchOutcome::Computed))
    }
}
