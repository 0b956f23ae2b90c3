//! Fixtures and an engine harness wired to mock endpoints.

use chainlens_core::{
    analytics::AnalyticsClient,
    cache::{CacheStore, MemoryStore, ResponseCache},
    chain::{ChainDescriptor, ChainId, ChainRegistry},
    config::AnalyticsConfig,
    dispatch::{DispatchEngine, DispatchSettings, SharedContext},
    metrics::MetricsCollector,
    upstream::{HttpClient, RetryPolicy},
};
use serde_json::{json, Value};
use std::{sync::Arc, time::Duration};

pub const EVM_HASH: &str = "0x88df016429689c079f3b2f6ad39fa052532c56795b733da78a91ebe6a713944b";
pub const SOLANA_SIGNATURE: &str =
    "5VERv8NMvzbJMEkV8xnrLkEaWRtSz9CosKDYjCJjBRnbJLgp8uirBgmQpjKhoR4tjF3ZpRzrFmBV6UjKdiSZkQUW";
/// 43 characters: inside the NEAR length window, not an EVM hash.
pub const NEAR_RECEIPT_ID: &str = "9ZbDTHaQVTZDR8QJpVD6QfyT2T8TqgJH2BGbbSZYyYz";

/// Engine plus handles on its in-process store and metrics, for assertions.
pub struct TestHarness {
    pub engine: DispatchEngine,
    pub store: Arc<MemoryStore>,
    pub metrics: Arc<MetricsCollector>,
}

/// Builds an engine over `chains`, each pointed at its own endpoint, caching in memory.
///
/// The analytics client does not back off between attempts.
#[must_use]
pub fn harness(chains: &[(ChainId, String)], analytics_url: &str) -> TestHarness {
    let store = Arc::new(MemoryStore::new());
    let (engine, metrics) = engine_with_backend(chains, analytics_url, store.clone());
    TestHarness { engine, store, metrics }
}

/// Same wiring as [`harness`] over an arbitrary cache backend.
#[must_use]
#[allow(clippy::expect_used)]
pub fn engine_with_backend(
    chains: &[(ChainId, String)],
    analytics_url: &str,
    backend: Arc<dyn CacheStore>,
) -> (DispatchEngine, Arc<MetricsCollector>) {
    let registry =
        ChainRegistry::new(chains.iter().map(|(id, url)| ChainDescriptor::new(*id, url.as_str())));
    let http = Arc::new(HttpClient::new().expect("http client"));
    let analytics = AnalyticsClient::new(
        http.clone(),
        &AnalyticsConfig {
            url: analytics_url.to_string(),
            api_key: "test-key".to_string(),
            ..AnalyticsConfig::default()
        },
    )
    .expect("analytics client")
    .with_retry_policy(RetryPolicy::exponential(3, Duration::from_millis(1)));
    let metrics = Arc::new(MetricsCollector::new().expect("metrics collector"));

    let ctx = SharedContext {
        registry: Arc::new(registry),
        cache: ResponseCache::new(backend, "chain", Duration::from_secs(60)),
        http,
        analytics: Arc::new(analytics),
        metrics_collector: metrics.clone(),
        settings: DispatchSettings {
            rpc_timeout: Duration::from_secs(5),
            ..DispatchSettings::default()
        },
    };

    (DispatchEngine::new(ctx), metrics)
}

#[must_use]
pub fn evm_block_header(number: u64) -> Value {
    json!({
        "number": format!("0x{number:x}"),
        "hash": format!("0x{number:064x}"),
        "parentHash": format!("0x{:064x}", number.saturating_sub(1)),
        "timestamp": format!("0x{:x}", 1_600_000_000 + number),
        "miner": "0x0000000000000000000000000000000000000001",
        "gasUsed": "0x5208",
        "gasLimit": "0x1c9c380"
    })
}

#[must_use]
pub fn evm_receipt(tx_hash: &str) -> Value {
    json!({
        "transactionHash": tx_hash,
        "transactionIndex": "0x0",
        "blockNumber": "0x10",
        "status": "0x1",
        "gasUsed": "0x5208",
        "logs": []
    })
}

#[must_use]
pub fn evm_transaction(tx_hash: &str) -> Value {
    json!({
        "hash": tx_hash,
        "nonce": "0x0",
        "from": "0x0000000000000000000000000000000000000001",
        "to": "0x0000000000000000000000000000000000000002",
        "value": "0x0",
        "input": "0x"
    })
}

#[must_use]
pub fn solana_transaction(slot: u64) -> Value {
    json!({
        "slot": slot,
        "blockTime": 1_700_000_000,
        "meta": { "err": null, "fee": 5000 },
        "transaction": { "signatures": [SOLANA_SIGNATURE] }
    })
}

#[must_use]
pub fn near_receipt(receipt_id: &str) -> Value {
    json!({
        "receipt_id": receipt_id,
        "predecessor_id": "alice.near",
        "receiver_id": "bob.near",
        "receipt": { "Action": { "actions": [] } }
    })
}

/// Successful analytics response carrying one row.
#[must_use]
pub fn analytics_body(total: &str) -> Value {
    json!({
        "code": 0,
        "message": "ok",
        "data": {
            "task_id": "task",
            "rows": 1,
            "rows_read": 1,
            "bytes_read": 8,
            "elapsed": 0.01,
            "meta": [{ "name": "total", "type": "UInt64" }],
            "result": [{ "total": total }],
            "err_msg": ""
        }
    })
}
