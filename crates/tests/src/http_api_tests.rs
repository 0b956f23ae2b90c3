//! The HTTP surface end to end, over mocked chains.

use crate::mock_infrastructure::{
    evm_block_header, evm_receipt, evm_transaction, harness, AnalyticsMock, RpcMockBuilder,
    EVM_HASH,
};
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use chainlens_core::{chain::ChainId, config::AppConfig};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const UNREACHABLE: &str = "http://127.0.0.1:1";

fn app(chains: &[(ChainId, String)], analytics_url: &str) -> Router {
    let h = harness(chains, analytics_url);
    server::create_app(Arc::new(h.engine), &AppConfig::default())
}

async fn send(app: Router, uri: &str) -> (StatusCode, Option<String>, Value) {
    let request = Request::builder()
        .uri(uri)
        .header("x-request-id", "req-123")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let request_id = response
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if body.is_empty() { Value::Null } else { serde_json::from_slice(&body).unwrap() };
    (status, request_id, json)
}

fn assert_error_body(body: &Value, code: &str) {
    let error = body["error"].as_object().unwrap();
    assert_eq!(error.len(), 2, "{body}");
    assert_eq!(error["code"], code);
    assert!(!error["message"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_latest_block_route() {
    let mut eth = RpcMockBuilder::new().await;
    eth.mock_result("eth_getBlockByNumber", evm_block_header(0x20)).await;
    let app = app(&[(ChainId::Ethereum, eth.url())], UNREACHABLE);

    let (status, request_id, body) = send(app, "/api/v1/blocks/latest/ethereum").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(request_id.as_deref(), Some("req-123"));
    assert_eq!(body["number"], "0x20");
}

#[tokio::test]
async fn test_null_block_is_not_found() {
    let mut eth = RpcMockBuilder::new().await;
    eth.mock_result("eth_getBlockByNumber", json!(null)).await;
    let app = app(&[(ChainId::Ethereum, eth.url())], UNREACHABLE);

    let (status, _, body) = send(app, "/api/v1/blocks/latest/ethereum").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_error_body(&body, "block_not_found");
}

#[tokio::test]
async fn test_upstream_failures_are_server_errors() {
    let mut eth = RpcMockBuilder::new().await;
    eth.mock_rpc_error("eth_getBlockByNumber", -32000, "boom").await;
    let app = app(
        &[(ChainId::Ethereum, eth.url()), (ChainId::Solana, UNREACHABLE.to_string())],
        UNREACHABLE,
    );

    let (status, _, body) = send(app.clone(), "/api/v1/blocks/latest/ethereum").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_error_body(&body, "upstream");

    let (status, _, body) = send(app, "/api/v1/blocks/latest/solana").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_error_body(&body, "client_connection");
}

#[tokio::test]
async fn test_search_route_renders_chain_keyed_map() {
    let mut eth = RpcMockBuilder::new().await;
    eth.mock_result("eth_getTransactionReceipt", evm_receipt(EVM_HASH))
        .await
        .mock_result("eth_getTransactionByHash", evm_transaction(EVM_HASH))
        .await;
    let mut bsc = RpcMockBuilder::new().await;
    bsc.mock_result("eth_getTransactionReceipt", json!(null)).await;
    let app = app(&[(ChainId::Ethereum, eth.url()), (ChainId::Bsc, bsc.url())], UNREACHABLE);

    let (status, _, body) = send(app, &format!("/api/v1/tx/{EVM_HASH}")).await;

    assert_eq!(status, StatusCode::OK);
    let chains: Vec<_> = body.as_object().unwrap().keys().cloned().collect();
    assert_eq!(chains, vec!["ethereum"]);
    assert_eq!(body["ethereum"]["tx"]["hash"], EVM_HASH);
}

#[tokio::test]
async fn test_search_without_hits_is_not_found() {
    let mut bsc = RpcMockBuilder::new().await;
    bsc.mock_result("eth_getTransactionReceipt", json!(null)).await;
    let app = app(&[(ChainId::Bsc, bsc.url())], UNREACHABLE);

    let (status, _, body) = send(app, &format!("/api/v1/tx/{EVM_HASH}")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_error_body(&body, "transaction_not_found");
}

#[tokio::test]
async fn test_total_route() {
    let mut analytics = AnalyticsMock::new().await;
    analytics.mock_total("polygon", "987", 1).await;
    let app = app(&[(ChainId::Polygon, UNREACHABLE.to_string())], &analytics.url());

    let (status, _, body) = send(app, "/api/v1/tx/total/polygon").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "total": 987 }));
    analytics.assert_all().await;
}

#[tokio::test]
async fn test_client_errors_are_bad_request() {
    let app = app(
        &[(ChainId::Ethereum, UNREACHABLE.to_string()), (ChainId::Klaytn, UNREACHABLE.to_string())],
        UNREACHABLE,
    );

    let cases = [
        ("/api/v1/blocks/latest/", "validation"),
        ("/api/v1/blocks/latest/tron", "unsupported_chain"),
        ("/api/v1/tx/total/tron", "unsupported_chain"),
        ("/api/v1/tx/total/klaytn", "tx_count_unsupported"),
        ("/api/v1/tx/", "validation"),
    ];
    for (uri, code) in cases {
        let (status, _, body) = send(app.clone(), uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_error_body(&body, code);
    }
}

#[tokio::test]
async fn test_health_lists_registered_chains() {
    let app = app(
        &[(ChainId::Near, UNREACHABLE.to_string()), (ChainId::Bsc, UNREACHABLE.to_string())],
        UNREACHABLE,
    );

    let (status, request_id, body) = send(app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(request_id.as_deref(), Some("req-123"));
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["chains"], json!(["bsc", "near"]));
    assert_eq!(body["cache_backend"], "memory");
}

#[tokio::test]
async fn test_slow_analytics_hits_request_deadline() {
    // Accepts connections and never answers.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let analytics_url = format!("http://{}", listener.local_addr().unwrap());
    let stalled = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let h = harness(&[(ChainId::Ethereum, UNREACHABLE.to_string())], &analytics_url);
    let mut config = AppConfig::default();
    config.server.request_timeout_seconds = 1;
    let app = server::create_app(Arc::new(h.engine), &config);

    let started = std::time::Instant::now();
    let (status, request_id, body) = send(app, "/api/v1/tx/total/ethereum").await;

    assert!(started.elapsed() < std::time::Duration::from_secs(10));
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(request_id.as_deref(), Some("req-123"));
    assert_error_body(&body, "timeout");
    stalled.abort();
}
