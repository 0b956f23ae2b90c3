//! Chain identities and the immutable chain registry.
//!
//! Every request names a chain by its wire identifier (`"ethereum"`, `"solana"`, ...) or
//! carries a hash whose shape implies a set of chains. This module owns the closed set of
//! supported chains and the static facts attached to each of them:
//!
//! - [`ChainId`]: the closed enum of supported chains, parsed case-sensitively
//! - [`ProtocolFamily`]: the RPC dialect a chain speaks, which selects the protocol adapter
//! - [`RpcOperation`]: logical operations mapped to protocol-specific method names
//! - [`ChainRegistry`]: the read-only table built once at startup and shared via `Arc`
//!
//! # Ownership
//!
//! ```text
//!              ┌──────────────────────┐
//!              │    ChainRegistry     │  built once from ChainsConfig
//!              │  (never mutated)     │
//!              └──────────┬───────────┘
//!                         │ Arc<ChainRegistry>
//!          ┌──────────────┼──────────────┐
//!          ▼              ▼              ▼
//!    BlocksHandler  TransactionsHandler  TxCountHandler
//! ```
//!
//! Reads need no synchronization: the registry is immutable after construction.

pub mod registry;

pub use registry::{ChainDescriptor, ChainRegistry, RegistryError};

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Closed set of chains the service knows how to talk to.
///
/// Serializes as its wire identifier so it can be used directly as a JSON map key in
/// aggregated search results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ChainId {
    #[serde(rename = "bsc")]
    Bsc,
    #[serde(rename = "ethereum")]
    Ethereum,
    #[serde(rename = "polygon")]
    Polygon,
    #[serde(rename = "optimism")]
    Optimism,
    #[serde(rename = "arbitrum")]
    Arbitrum,
    #[serde(rename = "avalanche")]
    Avalanche,
    #[serde(rename = "arbitrum-nitro")]
    ArbitrumNitro,
    #[serde(rename = "fantom")]
    Fantom,
    #[serde(rename = "solana")]
    Solana,
    #[serde(rename = "near")]
    Near,
    #[serde(rename = "klaytn")]
    Klaytn,
}

impl ChainId {
    /// All supported chains in declaration order.
    pub const ALL: [ChainId; 11] = [
        ChainId::Bsc,
        ChainId::Ethereum,
        ChainId::Polygon,
        ChainId::Optimism,
        ChainId::Arbitrum,
        ChainId::Avalanche,
        ChainId::ArbitrumNitro,
        ChainId::Fantom,
        ChainId::Solana,
        ChainId::Near,
        ChainId::Klaytn,
    ];

    /// Returns the wire identifier used in URLs, cache keys and analytics queries.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bsc => "bsc",
            Self::Ethereum => "ethereum",
            Self::Polygon => "polygon",
            Self::Optimism => "optimism",
            Self::Arbitrum => "arbitrum",
            Self::Avalanche => "avalanche",
            Self::ArbitrumNitro => "arbitrum-nitro",
            Self::Fantom => "fantom",
            Self::Solana => "solana",
            Self::Near => "near",
            Self::Klaytn => "klaytn",
        }
    }

    /// Returns the protocol family this chain speaks.
    #[must_use]
    pub fn family(&self) -> ProtocolFamily {
        match self {
            Self::Bsc |
            Self::Ethereum |
            Self::Polygon |
            Self::Optimism |
            Self::Arbitrum |
            Self::Avalanche |
            Self::ArbitrumNitro |
            Self::Fantom => ProtocolFamily::Evm,
            Self::Solana => ProtocolFamily::Solana,
            Self::Near => ProtocolFamily::Near,
            Self::Klaytn => ProtocolFamily::JsonRpc,
        }
    }

    /// Whether the analytics provider indexes this chain's transactions.
    #[must_use]
    pub fn supports_tx_count(&self) -> bool {
        !matches!(self, Self::ArbitrumNitro | Self::Near | Self::Klaytn)
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not one of the supported chain identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown chain identifier: {0}")]
pub struct UnknownChain(pub String);

impl FromStr for ChainId {
    type Err = UnknownChain;

    /// Exact, case-sensitive match against the wire identifiers.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|chain| chain.as_str() == s)
            .ok_or_else(|| UnknownChain(s.to_string()))
    }
}

/// RPC dialect spoken by a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolFamily {
    /// Ethereum JSON-RPC with typed block headers.
    Evm,
    /// Solana JSON-RPC (slots, signatures).
    Solana,
    /// NEAR JSON-RPC (finality-based block queries, receipts).
    Near,
    /// EVM-shaped JSON-RPC whose payloads are not guaranteed to decode as EVM types.
    JsonRpc,
}

impl ProtocolFamily {
    /// Whether `0x`-prefixed 32-byte transaction hashes belong to this family.
    #[must_use]
    pub fn shares_evm_hash_format(&self) -> bool {
        matches!(self, Self::Evm | Self::JsonRpc)
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Evm => "evm",
            Self::Solana => "solana",
            Self::Near => "near",
            Self::JsonRpc => "json_rpc",
        }
    }
}

/// Logical RPC operation, resolved to a method name through the chain's descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RpcOperation {
    GetBlockByNumber,
    GetTransactionReceipt,
    GetTransactionByHash,
    GetSlot,
    GetTransaction,
}

impl RpcOperation {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GetBlockByNumber => "get_block_by_number",
            Self::GetTransactionReceipt => "get_transaction_receipt",
            Self::GetTransactionByHash => "get_transaction_by_hash",
            Self::GetSlot => "get_slot",
            Self::GetTransaction => "get_transaction",
        }
    }
}
