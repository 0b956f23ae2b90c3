use async_trait::async_trait;
use serde_json::{json, Value};

use super::{ChainChannel, ChainClient};
use crate::{chain::RpcOperation, upstream::UpstreamError};

/// Adapter for EVM-shaped JSON-RPC chains whose payloads are not guaranteed to decode as
/// EVM types (Klaytn's `klay_*` namespace). Same calls as [`super::EvmClient`], untyped
/// results.
pub struct JsonRpcClient {
    channel: ChainChannel,
}

impl JsonRpcClient {
    #[must_use]
    pub fn new(channel: ChainChannel) -> Self {
        Self { channel }
    }
}

#[async_trait]
impl ChainClient for JsonRpcClient {
    async fn latest_block(&self) -> Result<Option<Value>, UpstreamError> {
        self.channel.call(RpcOperation::GetBlockByNumber, json!(["latest", false])).await
    }

    async fn transaction_receipt(&self, id: &str) -> Result<Option<Value>, UpstreamError> {
        self.channel.call(RpcOperation::GetTransactionReceipt, json!([id])).await
    }

    async fn transaction(&self, id: &str) -> Result<Option<Value>, UpstreamError> {
        self.channel.call(RpcOperation::GetTransactionByHash, json!([id])).await
    }
}
