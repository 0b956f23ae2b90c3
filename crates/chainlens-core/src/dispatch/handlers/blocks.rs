use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::{
    cache::CacheKey,
    dispatch::{engine::SharedContext, errors::DispatchError},
    metrics::DispatchOutcome,
    protocol::ChainClient,
};

/// Serves the latest block of a chain, cached for the default TTL.
pub struct BlocksHandler {
    ctx: Arc<SharedContext>,
}

impl BlocksHandler {
    #[must_use]
    pub fn new(ctx: Arc<SharedContext>) -> Self {
        Self { ctx }
    }

    /// Latest block of the chain named by `identifier`.
    ///
    /// The payload returned on a miss is exactly what later hits return: both are the
    /// cached JSON.
    ///
    /// # Errors
    /// - [`DispatchError::Validation`] for an empty identifier
    /// - [`DispatchError::UnsupportedChain`] for an unknown or disabled chain
    /// - [`DispatchError::ClientConnection`] if the endpoint cannot be reached
    /// - [`DispatchError::BlockNotFound`] if the endpoint returns `null`
    /// - [`DispatchError::Upstream`] for RPC, HTTP status and decoding failures
    pub async fn latest_block(
        &self,
        identifier: &str,
    ) -> Result<(Value, DispatchOutcome), DispatchError> {
        let descriptor = self.ctx.resolve(identifier)?;
        let chain = descriptor.id();
        let key = CacheKey::LatestBlock(chain);

        if let Some(block) = self.ctx.cache_lookup::<Value>(&key).await {
            return Ok((block, DispatchOutcome::CacheHit));
        }

        debug!(chain = %chain, family = descriptor.family().as_str(), "fetching latest block");
        let adapter = self.ctx.connect(&descriptor)?;
        let block = adapter
            .latest_block()
            .await
            .map_err(|e| self.ctx.upstream_failure(chain, e))?
            .ok_or(DispatchError::BlockNotFound(chain))?;

        self.ctx.cache_store(&key, &block, None).await;
        Ok((block, DispatchOutcome::Computed))
    }
}
