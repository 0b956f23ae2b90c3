//! Cross-chain search by transaction hash.
//!
//! The hash's shape picks exactly one protocol family. One task per candidate chain is
//! spawned into a [`JoinSet`]; each task returns its own contribution and a single
//! collector merges them, so no state is shared between units.
//!
//! ```text
//!            classify(hash)
//!                 │
//!     ┌───────────┼───────────┐
//!     ▼           ▼           ▼
//!  unit(bsc)  unit(eth)  …  unit(klaytn)      JoinSet
//!     │           │           │
//!     └──── Option<(ChainId, Value)> ────┐
//!                                        ▼
//!                                   collector ──► AggregatedResult
//! ```

use serde_json::{json, Value};
use std::{sync::Arc, time::Duration};
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::{
    cache::CacheKey,
    chain::{ChainDescriptor, ChainId, ProtocolFamily},
    dispatch::{
        classify::HashShape,
        engine::{AggregatedResult, SharedContext},
        errors::DispatchError,
    },
    metrics::{DispatchOutcome, MetricsCollector, UnitOutcome},
    protocol::{ChainClient, ProtocolAdapter},
    upstream::{HttpClient, UpstreamError},
};

type Contribution = Option<(ChainId, Value)>;

/// Serves hash searches, cached for the search TTL.
pub struct TransactionsHandler {
    ctx: Arc<SharedContext>,
}

impl TransactionsHandler {
    #[must_use]
    pub fn new(ctx: Arc<SharedContext>) -> Self {
        Self { ctx }
    }

    /// Searches every chain whose family matches the shape of `hash`.
    ///
    /// Chains that fail or do not know the hash are left out of the result. A hash that
    /// matches no known shape yields an empty result without any RPC call.
    ///
    /// # Errors
    /// - [`DispatchError::Validation`] for an empty hash
    /// - [`DispatchError::Internal`] if a unit panics or the search deadline expires
    pub async fn search(
        &self,
        hash: &str,
    ) -> Result<(AggregatedResult, DispatchOutcome), DispatchError> {
        if hash.is_empty() {
            return Err(DispatchError::Validation("missing tx hash".into()));
        }

        let key = CacheKey::TxHash(hash);
        if let Some(result) = self.ctx.cache_lookup::<AggregatedResult>(&key).await {
            return Ok((result, DispatchOutcome::CacheHit));
        }

        let shape = HashShape::classify(hash);
        let candidates = self.candidates(shape);
        debug!(shape = shape.as_str(), candidates = candidates.len(), "searching transaction hash");

        let hash: Arc<str> = Arc::from(hash);
        let mut units = JoinSet::new();
        for descriptor in candidates {
            let unit = SearchUnit {
                descriptor,
                http: self.ctx.http.clone(),
                timeout: self.ctx.settings.rpc_timeout,
                metrics_collector: self.ctx.metrics_collector.clone(),
                hash: hash.clone(),
            };
            units.spawn(unit.run());
        }

        let result = collect_within(units, self.ctx.settings.search_timeout).await?;
        debug!(found = result.len(), "transaction hash search complete");

        self.ctx.cache_store(&key, &result, Some(self.ctx.settings.search_ttl)).await;
        Ok((result, DispatchOutcome::Computed))
    }

    fn candidates(&self, shape: HashShape) -> Vec<Arc<ChainDescriptor>> {
        let registry = &self.ctx.registry;
        match shape {
            HashShape::Evm => registry.chains_in_family(|f| f.shares_evm_hash_format()),
            HashShape::Solana => registry.chains_in_family(|f| f == ProtocolFamily::Solana),
            HashShape::Near => registry.chains_in_family(|f| f == ProtocolFamily::Near),
            HashShape::Unknown => Vec::new(),
        }
    }
}

/// Drains `units` into one map, bounded by `deadline`.
///
/// Returning early drops the set, which aborts every unit still running.
async fn collect_within(
    mut units: JoinSet<Contribution>,
    deadline: Duration,
) -> Result<AggregatedResult, DispatchError> {
    match tokio::time::timeout(deadline, collect(&mut units)).await {
        Ok(result) => result,
        Err(_) => Err(DispatchError::Internal(format!(
            "search did not complete within {}s",
            deadline.as_secs_f64()
        ))),
    }
}

async fn collect(units: &mut JoinSet<Contribution>) -> Result<AggregatedResult, DispatchError> {
    let mut merged = AggregatedResult::new();
    while let Some(joined) = units.join_next().await {
        match joined {
            Ok(Some((chain, data))) => {
                merged.insert(chain, data);
            }
            Ok(None) => {}
            Err(e) => return Err(DispatchError::Internal(format!("search unit failed: {e}"))),
        }
    }
    Ok(merged)
}

/// One chain's share of a search. Owns everything it needs so it can run as a task.
struct SearchUnit {
    descriptor: Arc<ChainDescriptor>,
    http: Arc<HttpClient>,
    timeout: Duration,
    metrics_collector: Arc<MetricsCollector>,
    hash: Arc<str>,
}

impl SearchUnit {
    async fn run(self) -> Contribution {
        let chain = self.descriptor.id();
        let family = self.descriptor.family();
        let outcome = match ProtocolAdapter::connect(self.descriptor, self.http, self.timeout) {
            Ok(adapter) => lookup(&adapter, family, &self.hash).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(Some(data)) => {
                self.metrics_collector.record_fanout_unit(chain.as_str(), UnitOutcome::Found);
                Some((chain, data))
            }
            Ok(None) => {
                self.metrics_collector.record_fanout_unit(chain.as_str(), UnitOutcome::NotFound);
                None
            }
            Err(e) => {
                warn!(chain = %chain, error = %e, "search unit failed");
                self.metrics_collector.record_upstream_error(chain.as_str(), &e);
                self.metrics_collector.record_fanout_unit(chain.as_str(), UnitOutcome::Error);
                None
            }
        }
    }
}

async fn lookup(
    adapter: &ProtocolAdapter,
    family: ProtocolFamily,
    hash: &str,
) -> Result<Option<Value>, UpstreamError> {
    match family {
        ProtocolFamily::Evm | ProtocolFamily::JsonRpc => receipt_with_transaction(adapter, hash).await,
        ProtocolFamily::Solana => adapter.transaction(hash).await,
        ProtocolFamily::Near => adapter.transaction_receipt(hash).await,
    }
}

/// `{receipt, tx}` for EVM-shaped chains. The transaction is looked up by the hash the
/// receipt reports. A failed lookup fails the whole unit; `tx` is null only when the
/// node has no such transaction or the receipt carries no hash.
async fn receipt_with_transaction(
    adapter: &ProtocolAdapter,
    hash: &str,
) -> Result<Option<Value>, UpstreamError> {
    let Some(receipt) = adapter.transaction_receipt(hash).await? else {
        return Ok(None);
    };

    let tx = match receipt.get("transactionHash").and_then(Value::as_str) {
        Some(tx_hash) => adapter.transaction(tx_hash).await?,
        None => None,
    };

    Ok(Some(json!({ "receipt": receipt, "tx": tx })))
}
