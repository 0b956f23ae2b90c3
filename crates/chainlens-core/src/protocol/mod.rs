//! Per-family protocol adapters.
//!
//! Every chain speaks JSON-RPC over HTTP, but the method names, parameter shapes and the
//! number of round trips differ per [`ProtocolFamily`]. The dispatch engine never branches
//! on the family itself: it asks [`ProtocolAdapter::connect`] for the adapter matching a
//! descriptor and talks to it through the [`ChainClient`] trait.
//!
//! | Family    | latest block                        | receipt                     | transaction              |
//! |-----------|-------------------------------------|-----------------------------|--------------------------|
//! | EVM       | `eth_getBlockByNumber` (typed)      | `eth_getTransactionReceipt` | `eth_getTransactionByHash` |
//! | JSON-RPC  | `klay_getBlockByNumber` (untyped)   | `klay_getTransactionReceipt`| `klay_getTransactionByHash`|
//! | Solana    | `getSlot` + `getBlock`              | `getTransaction`            | `getTransaction`         |
//! | NEAR      | `block` at final finality           | `EXPERIMENTAL_receipt`      | unsupported              |

pub mod evm;
pub mod generic;
pub mod near;
pub mod solana;

pub use evm::{EvmBlockHeader, EvmClient};
pub use generic::JsonRpcClient;
pub use near::NearClient;
pub use solana::SolanaClient;

use async_trait::async_trait;
use serde_json::Value;
use std::{sync::Arc, time::Duration};

use crate::{
    chain::{ChainDescriptor, ProtocolFamily, RpcOperation},
    upstream::{HttpClient, RpcClient, UpstreamError},
};

/// Chain-agnostic read operations used by the dispatch engine.
///
/// `Ok(None)` means the endpoint answered and the object does not exist; errors are
/// reserved for transport and protocol failures.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Latest block, at the strongest finality the chain offers through this call.
    async fn latest_block(&self) -> Result<Option<Value>, UpstreamError>;

    /// Receipt (or receipt-like execution record) for an identifier.
    async fn transaction_receipt(&self, id: &str) -> Result<Option<Value>, UpstreamError>;

    /// Transaction body for an identifier.
    async fn transaction(&self, id: &str) -> Result<Option<Value>, UpstreamError>;
}

/// Closed set of adapters, one variant per [`ProtocolFamily`].
pub enum ProtocolAdapter {
    Evm(EvmClient),
    JsonRpc(JsonRpcClient),
    Solana(SolanaClient),
    Near(NearClient),
}

impl ProtocolAdapter {
    /// Builds the adapter selected by the descriptor's family.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::InvalidUrl`] if the descriptor's endpoint is unusable.
    pub fn connect(
        descriptor: Arc<ChainDescriptor>,
        http: Arc<HttpClient>,
        timeout: Duration,
    ) -> Result<Self, UpstreamError> {
        let rpc = RpcClient::connect(http, descriptor.endpoint(), timeout)?;
        let channel = ChainChannel { descriptor, rpc };

        Ok(match channel.descriptor.family() {
            ProtocolFamily::Evm => Self::Evm(EvmClient::new(channel)),
            ProtocolFamily::JsonRpc => Self::JsonRpc(JsonRpcClient::new(channel)),
            ProtocolFamily::Solana => Self::Solana(SolanaClient::new(channel)),
            ProtocolFamily::Near => Self::Near(NearClient::new(channel)),
        })
    }

    #[must_use]
    pub fn family(&self) -> ProtocolFamily {
        match self {
            Self::Evm(_) => ProtocolFamily::Evm,
            Self::JsonRpc(_) => ProtocolFamily::JsonRpc,
            Self::Solana(_) => ProtocolFamily::Solana,
            Self::Near(_) => ProtocolFamily::Near,
        }
    }

    fn client(&self) -> &dyn ChainClient {
        match self {
            Self::Evm(c) => c,
            Self::JsonRpc(c) => c,
            Self::Solana(c) => c,
            Self::Near(c) => c,
        }
    }
}

#[async_trait]
impl ChainClient for ProtocolAdapter {
    async fn latest_block(&self) -> Result<Option<Value>, UpstreamError> {
        self.client().latest_block().await
    }

    async fn transaction_receipt(&self, id: &str) -> Result<Option<Value>, UpstreamError> {
        self.client().transaction_receipt(id).await
    }

    async fn transaction(&self, id: &str) -> Result<Option<Value>, UpstreamError> {
        self.client().transaction(id).await
    }
}

/// A descriptor paired with an RPC client bound to its endpoint.
pub struct ChainChannel {
    descriptor: Arc<ChainDescriptor>,
    rpc: RpcClient,
}

impl ChainChannel {
    fn method(&self, operation: RpcOperation) -> Result<&'static str, UpstreamError> {
        self.descriptor
            .method(operation)
            .ok_or(UpstreamError::UnsupportedOperation(operation.as_str()))
    }

    async fn call(
        &self,
        operation: RpcOperation,
        params: Value,
    ) -> Result<Option<Value>, UpstreamError> {
        let method = self.method(operation)?;
        self.rpc.call(method, params).await
    }

    #[must_use]
    pub fn descriptor(&self) -> &ChainDescriptor {
        &self.descriptor
    }
}
