use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::trace;

use super::{ChainChannel, ChainClient};
use crate::{chain::RpcOperation, upstream::UpstreamError};

/// Block header as returned by `eth_getBlockByNumber(_, false)`.
///
/// Quantities stay hex strings so the payload served to callers matches the node's.
/// Only the fields every EVM chain returns are required; fork-specific fields are optional
/// and omitted from the output when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvmBlockHeader {
    pub number: String,
    pub hash: String,
    pub parent_hash: String,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha3_uncles: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub miner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_root: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transactions_root: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipts_root: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs_bloom: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_limit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_used: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mix_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_fee_per_gas: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub withdrawals_root: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blob_gas_used: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excess_blob_gas: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_beacon_block_root: Option<String>,
}

impl EvmBlockHeader {
    /// Block number as an integer, if the quantity is well formed.
    #[must_use]
    pub fn block_number(&self) -> Option<u64> {
        parse_hex_quantity(&self.number)
    }
}

/// Parses a `0x`-prefixed hex quantity.
#[must_use]
pub fn parse_hex_quantity(quantity: &str) -> Option<u64> {
    let digits = quantity.strip_prefix("0x")?;
    if digits.is_empty() {
        return None;
    }
    u64::from_str_radix(digits, 16).ok()
}

/// Adapter for EVM chains (`eth_*` methods).
pub struct EvmClient {
    channel: ChainChannel,
}

impl EvmClient {
    #[must_use]
    pub fn new(channel: ChainChannel) -> Self {
        Self { channel }
    }

    /// Fetches and decodes the latest block header.
    ///
    /// # Errors
    ///
    /// Transport and RPC failures, or [`UpstreamError::InvalidResponse`] if the block does
    /// not decode as an EVM header.
    pub async fn latest_header(&self) -> Result<Option<EvmBlockHeader>, UpstreamError> {
        let Some(raw) =
            self.channel.call(RpcOperation::GetBlockByNumber, json!(["latest", false])).await?
        else {
            return Ok(None);
        };

        let header: EvmBlockHeader = serde_json::from_value(raw)
            .map_err(|e| UpstreamError::InvalidResponse(format!("block header: {e}")))?;
        trace!(
            chain = %self.channel.descriptor().id(),
            block = ?header.block_number(),
            "latest evm block"
        );
        Ok(Some(header))
    }
}

#[async_trait]
impl ChainClient for EvmClient {
    async fn latest_block(&self) -> Result<Option<Value>, UpstreamError> {
        match self.latest_header().await? {
            Some(header) => serde_json::to_value(header)
                .map(Some)
                .map_err(|e| UpstreamError::InvalidResponse(format!("block header: {e}"))),
            None => Ok(None),
        }
    }

    async fn transaction_receipt(&self, id: &str) -> Result<Option<Value>, UpstreamError> {
        self.channel.call(RpcOperation::GetTransactionReceipt, json!([id])).await
    }

    async fn transaction(&self, id: &str) -> Result<Option<Value>, UpstreamError> {
        self.channel.call(RpcOperation::GetTransactionByHash, json!([id])).await
    }
}
