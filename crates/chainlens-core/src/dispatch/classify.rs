//! Hash-shape classification for search requests.

use crate::utils::is_base58;

/// Length of a `0x`-prefixed 32-byte hex hash.
pub const EVM_HASH_LEN: usize = 66;

/// Length of a base-58 encoded 64-byte Solana signature.
pub const SOLANA_SIGNATURE_LEN: usize = 88;

/// Accepted lengths for NEAR receipt identifiers.
pub const NEAR_ID_LEN: std::ops::RangeInclusive<usize> = 42..=44;

/// Protocol family a search identifier is assumed to belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashShape {
    Evm,
    Solana,
    Near,
    Unknown,
}

impl HashShape {
    /// Classifies `hash` by shape alone. First match wins, so exactly one family is ever
    /// searched for a given identifier.
    ///
    /// The NEAR rule is a length window only: any 42 to 44 character string that is not an
    /// EVM hash or Solana signature, including a `0x` address, is searched on NEAR.
    #[must_use]
    pub fn classify(hash: &str) -> Self {
        let len = hash.len();
        if hash.starts_with("0x") && len == EVM_HASH_LEN {
            Self::Evm
        } else if len == SOLANA_SIGNATURE_LEN && is_base58(hash) {
            Self::Solana
        } else if NEAR_ID_LEN.contains(&len) {
            Self::Near
        } else {
            Self::Unknown
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Evm => "evm",
            Self::Solana => "solana",
            Self::Near => "near",
            Self::Unknown => "unknown",
        }
    }
}
