use async_trait::async_trait;
use serde_json::{json, Value};

use super::{ChainChannel, ChainClient};
use crate::{chain::RpcOperation, upstream::UpstreamError};

/// Adapter for NEAR JSON-RPC. Parameters are named objects, not positional arrays.
pub struct NearClient {
    channel: ChainChannel,
}

impl NearClient {
    #[must_use]
    pub fn new(channel: ChainChannel) -> Self {
        Self { channel }
    }
}

#[async_trait]
impl ChainClient for NearClient {
    async fn latest_block(&self) -> Result<Option<Value>, UpstreamError> {
        self.channel.call(RpcOperation::GetBlockByNumber, json!({"finality": "final"})).await
    }

    async fn transaction_receipt(&self, id: &str) -> Result<Option<Value>, UpstreamError> {
        self.channel.call(RpcOperation::GetTransactionReceipt, json!({"receipt_id": id})).await
    }

    // NEAR's tx lookup needs the sender account, which a bare identifier does not carry.
    async fn transaction(&self, _id: &str) -> Result<Option<Value>, UpstreamError> {
        Err(UpstreamError::UnsupportedOperation(RpcOperation::GetTransactionByHash.as_str()))
    }
}
