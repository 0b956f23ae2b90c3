//! Cache-aside behaviour when the backend misbehaves.

use crate::mock_infrastructure::{
    engine_with_backend, evm_block_header, evm_receipt, evm_transaction, harness, AnalyticsMock,
    RpcMockBuilder, EVM_HASH,
};
use async_trait::async_trait;
use chainlens_core::{
    cache::{CacheError, CacheStore, MemoryStore},
    chain::ChainId,
};
use serde_json::json;
use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

const UNREACHABLE: &str = "http://127.0.0.1:1";

/// Reads succeed against an inner store; writes always fail.
struct ReadOnlyStore {
    inner: MemoryStore,
    failed_writes: AtomicUsize,
}

#[async_trait]
impl CacheStore for ReadOnlyStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.inner.get(key).await
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), CacheError> {
        self.failed_writes.fetch_add(1, Ordering::SeqCst);
        Err(CacheError::Backend("READONLY You can't write against a read only replica.".into()))
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, CacheError> {
        self.inner.expire(key, ttl).await
    }

    fn backend_name(&self) -> &'static str {
        "read-only"
    }
}

/// Every operation fails.
struct UnavailableStore;

#[async_trait]
impl CacheStore for UnavailableStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Err(CacheError::Backend("connection reset by peer".into()))
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), CacheError> {
        Err(CacheError::Backend("connection reset by peer".into()))
    }

    async fn expire(&self, _key: &str, _ttl: Duration) -> Result<bool, CacheError> {
        Err(CacheError::Backend("connection reset by peer".into()))
    }

    fn backend_name(&self) -> &'static str {
        "unavailable"
    }
}

#[tokio::test]
async fn test_failed_writes_still_return_results() {
    let mut eth = RpcMockBuilder::new().await;
    eth.mock_result_times("eth_getBlockByNumber", evm_block_header(3), 2).await;
    let store = Arc::new(ReadOnlyStore { inner: MemoryStore::new(), failed_writes: AtomicUsize::new(0) });
    let (engine, metrics) =
        engine_with_backend(&[(ChainId::Ethereum, eth.url())], UNREACHABLE, store.clone());

    let first = engine.get_latest_block("ethereum").await.unwrap();
    let second = engine.get_latest_block("ethereum").await.unwrap();

    assert_eq!(first, second);
    eth.assert_all().await;
    assert_eq!(store.failed_writes.load(Ordering::SeqCst), 2);

    let summary = metrics.summary();
    assert_eq!(summary.cache_errors, 2);
    assert_eq!(summary.cache_misses, 2);
    assert_eq!(summary.total_failures, 0);
}

#[tokio::test]
async fn test_unavailable_backend_degrades_every_operation() {
    let mut eth = RpcMockBuilder::new().await;
    eth.mock_result_times("eth_getTransactionReceipt", evm_receipt(EVM_HASH), 2)
        .await
        .mock_result_times("eth_getTransactionByHash", evm_transaction(EVM_HASH), 2)
        .await;
    let mut analytics = AnalyticsMock::new().await;
    analytics.mock_total("ethereum", "42", 2).await;
    let (engine, metrics) = engine_with_backend(
        &[(ChainId::Ethereum, eth.url())],
        &analytics.url(),
        Arc::new(UnavailableStore),
    );

    for _ in 0..2 {
        let found = engine.search_transaction_hash(EVM_HASH).await.unwrap();
        assert!(found.contains_key(&ChainId::Ethereum));
        assert_eq!(engine.count_total_tx_last_24h("ethereum").await.unwrap(), 42);
    }

    eth.assert_all().await;
    analytics.assert_all().await;
    // one failed read and one failed write per call
    assert_eq!(metrics.summary().cache_errors, 8);
    assert_eq!(metrics.summary().cache_hits, 0);
}

#[tokio::test]
async fn test_undecodable_entry_is_refetched_and_replaced() {
    let mut eth = RpcMockBuilder::new().await;
    eth.mock_result_times("eth_getBlockByNumber", evm_block_header(9), 1).await;
    let h = harness(&[(ChainId::Ethereum, eth.url())], UNREACHABLE);
    h.store
        .set("chain:latest_block:ethereum", "{not json", Duration::from_secs(60))
        .await
        .unwrap();

    let first = h.engine.get_latest_block("ethereum").await.unwrap();
    let second = h.engine.get_latest_block("ethereum").await.unwrap();

    assert_eq!(first["number"], "0x9");
    assert_eq!(first, second);
    eth.assert_all().await;

    let stored = h.store.get("chain:latest_block:ethereum").await.unwrap().unwrap();
    assert_eq!(stored, serde_json::to_string(&first).unwrap());
    assert_eq!(h.metrics.summary().cache_errors, 1);
}

#[tokio::test]
async fn test_hit_returns_stored_payload_verbatim() {
    let eth = RpcMockBuilder::new().await;
    let h = harness(&[(ChainId::Ethereum, eth.url())], UNREACHABLE);
    let cached = json!({ "number": "0xff", "hash": "0xcached" });
    h.store
        .set("chain:latest_block:ethereum", &cached.to_string(), Duration::from_secs(60))
        .await
        .unwrap();

    let payload = h.engine.get_latest_block("ethereum").await.unwrap();

    assert_eq!(payload, cached);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_callers_see_same_block() {
    let mut eth = RpcMockBuilder::new().await;
    eth.mock_result("eth_getBlockByNumber", evm_block_header(77)).await;
    let h = harness(&[(ChainId::Ethereum, eth.url())], UNREACHABLE);
    let engine = Arc::new(h.engine);

    let mut tasks = Vec::new();
    for _ in 0..16 {
        let engine = engine.clone();
        tasks.push(tokio::spawn(async move { engine.get_latest_block("ethereum").await }));
    }

    for task in tasks {
        let payload = task.await.unwrap().unwrap();
        assert_eq!(payload["number"], "0x4d");
    }
    assert_eq!(h.store.len(), 1);
}
