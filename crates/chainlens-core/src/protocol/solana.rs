use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::trace;

use super::{ChainChannel, ChainClient};
use crate::{chain::RpcOperation, upstream::UpstreamError};

/// Highest transaction version the decoder accepts; versioned blocks fail without it.
const MAX_SUPPORTED_TRANSACTION_VERSION: u8 = 0;

/// Adapter for Solana JSON-RPC.
///
/// The latest block takes two round trips: `getSlot`, then `getBlock` at that slot with
/// transaction details and rewards suppressed.
pub struct SolanaClient {
    channel: ChainChannel,
}

impl SolanaClient {
    #[must_use]
    pub fn new(channel: ChainChannel) -> Self {
        Self { channel }
    }

    async fn current_slot(&self) -> Result<u64, UpstreamError> {
        let slot: Option<Value> = self.channel.call(RpcOperation::GetSlot, json!([])).await?;
        slot.as_ref()
            .and_then(Value::as_u64)
            .ok_or_else(|| UpstreamError::InvalidResponse(format!("getSlot returned {slot:?}")))
    }

    async fn signature_lookup(&self, signature: &str) -> Result<Option<Value>, UpstreamError> {
        self.channel
            .call(
                RpcOperation::GetTransaction,
                json!([signature, {
                    "encoding": "json",
                    "maxSupportedTransactionVersion": MAX_SUPPORTED_TRANSACTION_VERSION
                }]),
            )
            .await
    }
}

#[async_trait]
impl ChainClient for SolanaClient {
    async fn latest_block(&self) -> Result<Option<Value>, UpstreamError> {
        let slot = self.current_slot().await?;
        trace!(slot = slot, "latest solana slot");

        self.channel
            .call(
                RpcOperation::GetBlockByNumber,
                json!([slot, {
                    "encoding": "base64",
                    "transactionDetails": "none",
                    "rewards": false,
                    "maxSupportedTransactionVersion": MAX_SUPPORTED_TRANSACTION_VERSION
                }]),
            )
            .await
    }

    // Solana has no separate receipt: execution metadata ships inside the transaction.
    async fn transaction_receipt(&self, id: &str) -> Result<Option<Value>, UpstreamError> {
        self.signature_lookup(id).await
    }

    async fn transaction(&self, id: &str) -> Result<Option<Value>, UpstreamError> {
        self.signature_lookup(id).await
    }
}
