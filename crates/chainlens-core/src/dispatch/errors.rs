use crate::{
    analytics::AnalyticsError,
    chain::{ChainId, RegistryError},
    upstream::UpstreamError,
};

/// Errors surfaced to callers of the dispatch engine.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Unsupported chain: {0}")]
    UnsupportedChain(String),

    #[error("Chain {0} does not support transaction counting")]
    TxCountUnsupported(ChainId),

    /// The chain's endpoint could not be reached, whatever adapter was in use.
    #[error("Failed to connect to {chain}: {source}")]
    ClientConnection {
        chain: ChainId,
        #[source]
        source: UpstreamError,
    },

    #[error("Block not found on {0}")]
    BlockNotFound(ChainId),

    #[error("Upstream error from {chain}: {source}")]
    Upstream {
        chain: ChainId,
        #[source]
        source: UpstreamError,
    },

    #[error("Analytics error: {0}")]
    Analytics(#[from] AnalyticsError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DispatchError {
    /// Splits upstream failures into connection failures and everything else.
    #[must_use]
    pub fn from_upstream(chain: ChainId, source: UpstreamError) -> Self {
        if source.is_connection_failure() {
            Self::ClientConnection { chain, source }
        } else {
            Self::Upstream { chain, source }
        }
    }

    /// Stable snake_case identifier used in error bodies.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::UnsupportedChain(_) => "unsupported_chain",
            Self::TxCountUnsupported(_) => "tx_count_unsupported",
            Self::ClientConnection { .. } => "client_connection",
            Self::BlockNotFound(_) => "block_not_found",
            Self::Upstream { .. } => "upstream",
            Self::Analytics(_) => "analytics",
            Self::Internal(_) => "internal",
        }
    }

    /// True for errors caused by the request itself rather than a backend.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::UnsupportedChain(_) | Self::TxCountUnsupported(_)
        )
    }
}

impl From<RegistryError> for DispatchError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::Unsupported(id) => Self::UnsupportedChain(id),
            other @ RegistryError::InvalidConfig { .. } => Self::Internal(other.to_string()),
        }
    }
}
