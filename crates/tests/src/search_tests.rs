//! Cross-chain hash search: candidate selection, fan-out merge and caching.

use crate::mock_infrastructure::{
    evm_receipt, evm_transaction, harness, near_receipt, solana_transaction, RpcMockBuilder,
    EVM_HASH, NEAR_RECEIPT_ID, SOLANA_SIGNATURE,
};
use chainlens_core::{chain::ChainId, dispatch::DispatchError};
use serde_json::{json, Value};
use std::time::Duration;

const UNREACHABLE: &str = "http://127.0.0.1:1";

#[tokio::test]
async fn test_only_chain_with_receipt_contributes() {
    let mut bsc = RpcMockBuilder::new().await;
    bsc.mock_result_times("eth_getTransactionReceipt", json!(null), 1).await;
    let mut eth = RpcMockBuilder::new().await;
    eth.mock_result_times("eth_getTransactionReceipt", evm_receipt(EVM_HASH), 1)
        .await
        .mock_result_with_params("eth_getTransactionByHash", json!([EVM_HASH]), evm_transaction(EVM_HASH))
        .await;
    let mut polygon = RpcMockBuilder::new().await;
    polygon.mock_result_times("eth_getTransactionReceipt", json!(null), 1).await;

    let h = harness(
        &[
            (ChainId::Bsc, bsc.url()),
            (ChainId::Ethereum, eth.url()),
            (ChainId::Polygon, polygon.url()),
        ],
        UNREACHABLE,
    );

    let result = h.engine.search_transaction_hash(EVM_HASH).await.unwrap();

    assert_eq!(result.len(), 1);
    let entry = &result[&ChainId::Ethereum];
    assert_eq!(entry["receipt"]["transactionHash"], EVM_HASH);
    assert_eq!(entry["tx"]["hash"], EVM_HASH);

    bsc.assert_all().await;
    eth.assert_all().await;
    polygon.assert_all().await;
}

#[tokio::test]
async fn test_transaction_lookup_uses_hash_from_receipt() {
    let reported = format!("0x{}", "ab".repeat(32));
    let mut eth = RpcMockBuilder::new().await;
    eth.mock_result("eth_getTransactionReceipt", evm_receipt(&reported))
        .await
        .mock_result_with_params("eth_getTransactionByHash", json!([reported]), evm_transaction(&reported))
        .await;
    let h = harness(&[(ChainId::Ethereum, eth.url())], UNREACHABLE);

    let result = h.engine.search_transaction_hash(EVM_HASH).await.unwrap();

    assert_eq!(result[&ChainId::Ethereum]["tx"]["hash"], reported.as_str());
    eth.assert_all().await;
}

#[tokio::test]
async fn test_failed_transaction_lookup_drops_chain() {
    let mut eth = RpcMockBuilder::new().await;
    eth.mock_result("eth_getTransactionReceipt", evm_receipt(EVM_HASH))
        .await
        .mock_rpc_error("eth_getTransactionByHash", -32603, "internal error")
        .await;
    let h = harness(&[(ChainId::Ethereum, eth.url())], UNREACHABLE);

    let result = h.engine.search_transaction_hash(EVM_HASH).await.unwrap();

    assert!(result.is_empty(), "{result:?}");
    assert_eq!(h.metrics.summary().upstream_errors, 1);
}

#[tokio::test]
async fn test_missing_transaction_keeps_receipt() {
    let mut eth = RpcMockBuilder::new().await;
    eth.mock_result("eth_getTransactionReceipt", evm_receipt(EVM_HASH))
        .await
        .mock_result("eth_getTransactionByHash", json!(null))
        .await;
    let mut polygon = RpcMockBuilder::new().await;
    let mut hashless = evm_receipt(EVM_HASH);
    hashless.as_object_mut().unwrap().remove("transactionHash");
    polygon
        .mock_result("eth_getTransactionReceipt", hashless)
        .await
        .mock_result_times("eth_getTransactionByHash", json!(null), 0)
        .await;
    let h = harness(
        &[(ChainId::Ethereum, eth.url()), (ChainId::Polygon, polygon.url())],
        UNREACHABLE,
    );

    let result = h.engine.search_transaction_hash(EVM_HASH).await.unwrap();

    assert_eq!(result.len(), 2);
    assert_eq!(result[&ChainId::Ethereum]["receipt"]["status"], "0x1");
    assert_eq!(result[&ChainId::Ethereum]["tx"], Value::Null);
    assert_eq!(result[&ChainId::Polygon]["tx"], Value::Null);
    polygon.assert_all().await;
}

#[tokio::test]
async fn test_klaytn_joins_evm_fanout() {
    let mut klaytn = RpcMockBuilder::new().await;
    klaytn
        .mock_result_times("klay_getTransactionReceipt", evm_receipt(EVM_HASH), 1)
        .await
        .mock_result_times("klay_getTransactionByHash", evm_transaction(EVM_HASH), 1)
        .await;
    let mut optimism = RpcMockBuilder::new().await;
    optimism.mock_result_times("eth_getTransactionReceipt", json!(null), 1).await;
    let h = harness(
        &[(ChainId::Klaytn, klaytn.url()), (ChainId::Optimism, optimism.url())],
        UNREACHABLE,
    );

    let result = h.engine.search_transaction_hash(EVM_HASH).await.unwrap();

    assert_eq!(result.keys().copied().collect::<Vec<_>>(), vec![ChainId::Klaytn]);
    klaytn.assert_all().await;
    optimism.assert_all().await;
}

#[tokio::test]
async fn test_failing_chain_is_omitted() {
    let mut arbitrum = RpcMockBuilder::new().await;
    arbitrum.mock_server_error().await;
    let mut avalanche = RpcMockBuilder::new().await;
    avalanche
        .mock_result("eth_getTransactionReceipt", evm_receipt(EVM_HASH))
        .await
        .mock_result("eth_getTransactionByHash", evm_transaction(EVM_HASH))
        .await;
    let h = harness(
        &[
            (ChainId::Arbitrum, arbitrum.url()),
            (ChainId::Avalanche, avalanche.url()),
            (ChainId::Fantom, UNREACHABLE.to_string()),
        ],
        UNREACHABLE,
    );

    let result = h.engine.search_transaction_hash(EVM_HASH).await.unwrap();

    assert_eq!(result.len(), 1);
    assert!(result.contains_key(&ChainId::Avalanche));
    assert_eq!(h.metrics.summary().upstream_errors, 2);
}

#[tokio::test]
async fn test_solana_signature_searches_solana_only() {
    let mut solana = RpcMockBuilder::new().await;
    solana
        .mock_result_with_params(
            "getTransaction",
            json!([SOLANA_SIGNATURE, { "encoding": "json", "maxSupportedTransactionVersion": 0 }]),
            solana_transaction(123),
        )
        .await;
    let mut eth = RpcMockBuilder::new().await;
    eth.expect_no_calls().await;
    let mut near = RpcMockBuilder::new().await;
    near.expect_no_calls().await;
    let h = harness(
        &[
            (ChainId::Solana, solana.url()),
            (ChainId::Ethereum, eth.url()),
            (ChainId::Near, near.url()),
        ],
        UNREACHABLE,
    );

    let result = h.engine.search_transaction_hash(SOLANA_SIGNATURE).await.unwrap();

    assert_eq!(result.len(), 1);
    assert_eq!(result[&ChainId::Solana]["slot"], 123);
    solana.assert_all().await;
    eth.assert_all().await;
    near.assert_all().await;
}

#[tokio::test]
async fn test_near_receipt_id_searches_near_only() {
    let mut near = RpcMockBuilder::new().await;
    near.mock_result_with_params(
        "EXPERIMENTAL_receipt",
        json!({ "receipt_id": NEAR_RECEIPT_ID }),
        near_receipt(NEAR_RECEIPT_ID),
    )
    .await;
    let mut solana = RpcMockBuilder::new().await;
    solana.expect_no_calls().await;
    let h = harness(&[(ChainId::Near, near.url()), (ChainId::Solana, solana.url())], UNREACHABLE);

    let result = h.engine.search_transaction_hash(NEAR_RECEIPT_ID).await.unwrap();

    assert_eq!(result[&ChainId::Near]["receiver_id"], "bob.near");
    near.assert_all().await;
    solana.assert_all().await;
}

#[tokio::test]
async fn test_near_rpc_error_yields_empty_result() {
    let mut near = RpcMockBuilder::new().await;
    near.mock_rpc_error("EXPERIMENTAL_receipt", -32000, "UNKNOWN_RECEIPT").await;
    let h = harness(&[(ChainId::Near, near.url())], UNREACHABLE);

    let result = h.engine.search_transaction_hash(NEAR_RECEIPT_ID).await.unwrap();

    assert!(result.is_empty());
}

#[tokio::test]
async fn test_unrecognized_hash_makes_no_rpc_calls() {
    let mut eth = RpcMockBuilder::new().await;
    eth.expect_no_calls().await;
    let mut solana = RpcMockBuilder::new().await;
    solana.expect_no_calls().await;
    let mut near = RpcMockBuilder::new().await;
    near.expect_no_calls().await;
    let h = harness(
        &[
            (ChainId::Ethereum, eth.url()),
            (ChainId::Solana, solana.url()),
            (ChainId::Near, near.url()),
        ],
        UNREACHABLE,
    );

    let oversized = "a".repeat(100);
    for hash in ["short", "0x1234", oversized.as_str()] {
        let result = h.engine.search_transaction_hash(hash).await.unwrap();
        assert!(result.is_empty(), "{hash}");
    }

    eth.assert_all().await;
    solana.assert_all().await;
    near.assert_all().await;
}

#[tokio::test]
async fn test_repeat_search_is_served_from_cache() {
    let mut eth = RpcMockBuilder::new().await;
    eth.mock_result_times("eth_getTransactionReceipt", evm_receipt(EVM_HASH), 1)
        .await
        .mock_result_times("eth_getTransactionByHash", evm_transaction(EVM_HASH), 1)
        .await;
    let h = harness(&[(ChainId::Ethereum, eth.url())], UNREACHABLE);

    let first = h.engine.search_transaction_hash(EVM_HASH).await.unwrap();
    let second = h.engine.search_transaction_hash(EVM_HASH).await.unwrap();

    assert_eq!(first, second);
    eth.assert_all().await;

    let key = format!("chain:tx_hash:{EVM_HASH}");
    assert_eq!(h.store.ttl_of(&key), Some(Duration::from_secs(3600)));
}

#[tokio::test]
async fn test_empty_result_is_cached() {
    let mut eth = RpcMockBuilder::new().await;
    eth.mock_result_times("eth_getTransactionReceipt", json!(null), 1).await;
    let h = harness(&[(ChainId::Ethereum, eth.url())], UNREACHABLE);

    assert!(h.engine.search_transaction_hash(EVM_HASH).await.unwrap().is_empty());
    assert!(h.engine.search_transaction_hash(EVM_HASH).await.unwrap().is_empty());

    eth.assert_all().await;
    assert_eq!(h.metrics.summary().cache_hits, 1);
}

#[tokio::test]
async fn test_result_keys_serialize_as_chain_identifiers() {
    let mut bsc = RpcMockBuilder::new().await;
    bsc.mock_result("eth_getTransactionReceipt", evm_receipt(EVM_HASH))
        .await
        .mock_result("eth_getTransactionByHash", evm_transaction(EVM_HASH))
        .await;
    let mut nitro = RpcMockBuilder::new().await;
    nitro
        .mock_result("eth_getTransactionReceipt", evm_receipt(EVM_HASH))
        .await
        .mock_result("eth_getTransactionByHash", evm_transaction(EVM_HASH))
        .await;
    let h = harness(
        &[(ChainId::Bsc, bsc.url()), (ChainId::ArbitrumNitro, nitro.url())],
        UNREACHABLE,
    );

    let result = h.engine.search_transaction_hash(EVM_HASH).await.unwrap();
    let rendered = serde_json::to_value(&result).unwrap();

    let mut keys: Vec<_> = rendered.as_object().unwrap().keys().cloned().collect();
    keys.sort();
    assert_eq!(keys, vec!["arbitrum-nitro", "bsc"]);
}

#[tokio::test]
async fn test_empty_hash_is_rejected() {
    let h = harness(&[(ChainId::Ethereum, UNREACHABLE.to_string())], UNREACHABLE);

    let err = h.engine.search_transaction_hash("").await.unwrap_err();

    assert!(matches!(err, DispatchError::Validation(_)));
    assert!(h.store.is_empty());
}
