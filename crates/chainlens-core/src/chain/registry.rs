use std::{collections::BTreeMap, collections::HashMap, sync::Arc};

use tracing::debug;

use super::{ChainId, ProtocolFamily, RpcOperation};
use crate::{config::ChainsConfig, utils::parse_http_url};

/// Errors raised while building or querying the [`ChainRegistry`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// The identifier is not a supported chain, or the chain is disabled.
    #[error("not supported chain: {0}")]
    Unsupported(String),

    /// A configured endpoint override or enabled entry is unusable.
    #[error("invalid chain configuration for {chain}: {reason}")]
    InvalidConfig { chain: String, reason: String },
}

/// Static facts about one chain: where to reach it and how to talk to it.
#[derive(Debug, Clone)]
pub struct ChainDescriptor {
    id: ChainId,
    endpoint: Arc<str>,
    family: ProtocolFamily,
    methods: HashMap<RpcOperation, &'static str>,
    supports_tx_count: bool,
}

impl ChainDescriptor {
    /// Builds a descriptor with the default method table and capabilities for `id`.
    #[must_use]
    pub fn new(id: ChainId, endpoint: impl Into<Arc<str>>) -> Self {
        Self {
            id,
            endpoint: endpoint.into(),
            family: id.family(),
            methods: default_methods(id),
            supports_tx_count: id.supports_tx_count(),
        }
    }

    #[must_use]
    pub fn id(&self) -> ChainId {
        self.id
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    #[must_use]
    pub fn family(&self) -> ProtocolFamily {
        self.family
    }

    /// Protocol-specific method name for a logical operation, if the chain supports it.
    #[must_use]
    pub fn method(&self, operation: RpcOperation) -> Option<&'static str> {
        self.methods.get(&operation).copied()
    }

    /// Whether the 24h transaction count is available for this chain.
    #[must_use]
    pub fn supports_tx_count(&self) -> bool {
        self.supports_tx_count
    }
}

fn default_methods(id: ChainId) -> HashMap<RpcOperation, &'static str> {
    let entries: &[(RpcOperation, &'static str)] = match id.family() {
        ProtocolFamily::Evm => &[
            (RpcOperation::GetBlockByNumber, "eth_getBlockByNumber"),
            (RpcOperation::GetTransactionReceipt, "eth_getTransactionReceipt"),
            (RpcOperation::GetTransactionByHash, "eth_getTransactionByHash"),
        ],
        ProtocolFamily::JsonRpc => &[
            (RpcOperation::GetBlockByNumber, "klay_getBlockByNumber"),
            (RpcOperation::GetTransactionReceipt, "klay_getTransactionReceipt"),
            (RpcOperation::GetTransactionByHash, "klay_getTransactionByHash"),
        ],
        ProtocolFamily::Solana => &[
            (RpcOperation::GetSlot, "getSlot"),
            (RpcOperation::GetBlockByNumber, "getBlock"),
            (RpcOperation::GetTransaction, "getTransaction"),
        ],
        ProtocolFamily::Near => &[
            (RpcOperation::GetBlockByNumber, "block"),
            (RpcOperation::GetTransactionReceipt, "EXPERIMENTAL_receipt"),
        ],
    };
    entries.iter().copied().collect()
}

/// Default NodeReal endpoint for a chain.
#[must_use]
pub fn default_endpoint(id: ChainId, api_key: &str) -> String {
    match id {
        ChainId::Bsc => format!("https://bsc-mainnet.nodereal.io/v1/{api_key}"),
        ChainId::Ethereum => format!("https://eth-mainnet.nodereal.io/v1/{api_key}"),
        ChainId::Polygon => format!("https://polygon-mainnet.nodereal.io/v1/{api_key}"),
        ChainId::Optimism => format!("https://opt-mainnet.nodereal.io/v1/{api_key}"),
        ChainId::Arbitrum => format!("https://open-platform.nodereal.io/{api_key}/arbitrum/"),
        ChainId::Avalanche => {
            format!("https://open-platform.nodereal.io/{api_key}/avalanche-c/ext/bc/C/rpc")
        }
        ChainId::ArbitrumNitro => {
            format!("https://open-platform.nodereal.io/{api_key}/arbitrum-nitro/")
        }
        ChainId::Fantom => format!("https://open-platform.nodereal.io/{api_key}/fantom/"),
        ChainId::Solana => format!("https://open-platform.nodereal.io/{api_key}/solana/"),
        ChainId::Near => format!("https://open-platform.nodereal.io/{api_key}/near/"),
        ChainId::Klaytn => format!("https://open-platform.nodereal.io/{api_key}/klaytn/"),
    }
}

/// Immutable table of the chains this process serves.
///
/// Built once at startup and shared by `Arc`; every lookup is a pure in-memory read.
#[derive(Debug, Clone, Default)]
pub struct ChainRegistry {
    chains: BTreeMap<ChainId, Arc<ChainDescriptor>>,
}

impl ChainRegistry {
    /// Creates a registry from explicit descriptors. Later duplicates replace earlier ones.
    #[must_use]
    pub fn new(descriptors: impl IntoIterator<Item = ChainDescriptor>) -> Self {
        let chains = descriptors.into_iter().map(|d| (d.id(), Arc::new(d))).collect();
        Self { chains }
    }

    /// Builds the registry from configuration: enabled set, API key, endpoint overrides.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidConfig`] if an enabled entry or override names an
    /// unknown chain, or if an override is not an http(s) URL.
    pub fn from_config(config: &ChainsConfig) -> Result<Self, RegistryError> {
        let enabled: Vec<ChainId> = match &config.enabled {
            Some(names) => names
                .iter()
                .map(|name| {
                    name.parse::<ChainId>().map_err(|e| RegistryError::InvalidConfig {
                        chain: name.clone(),
                        reason: e.to_string(),
                    })
                })
                .collect::<Result<_, _>>()?,
            None => ChainId::ALL.to_vec(),
        };

        let mut overrides = HashMap::with_capacity(config.endpoints.len());
        for (name, url) in &config.endpoints {
            let chain = name.parse::<ChainId>().map_err(|e| RegistryError::InvalidConfig {
                chain: name.clone(),
                reason: e.to_string(),
            })?;
            parse_http_url(url).map_err(|reason| RegistryError::InvalidConfig {
                chain: name.clone(),
                reason: format!("endpoint must be an http(s) URL: {reason}"),
            })?;
            overrides.insert(chain, url.clone());
        }

        let descriptors = enabled.into_iter().map(|chain| {
            let endpoint = overrides
                .remove(&chain)
                .unwrap_or_else(|| default_endpoint(chain, &config.nodereal_api_key));
            ChainDescriptor::new(chain, endpoint)
        });

        let registry = Self::new(descriptors);
        debug!(chains = registry.len(), "chain registry built");
        Ok(registry)
    }

    /// Resolves a wire identifier to its descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Unsupported`] for identifiers outside the closed set and
    /// for supported chains that are not enabled in this registry.
    pub fn resolve(&self, identifier: &str) -> Result<&Arc<ChainDescriptor>, RegistryError> {
        identifier
            .parse::<ChainId>()
            .ok()
            .and_then(|chain| self.chains.get(&chain))
            .ok_or_else(|| RegistryError::Unsupported(identifier.to_string()))
    }

    #[must_use]
    pub fn get(&self, chain: ChainId) -> Option<&Arc<ChainDescriptor>> {
        self.chains.get(&chain)
    }

    /// Descriptors whose family satisfies `predicate`, in chain order.
    pub fn chains_in_family(
        &self,
        predicate: impl Fn(ProtocolFamily) -> bool,
    ) -> Vec<Arc<ChainDescriptor>> {
        self.chains.values().filter(|d| predicate(d.family())).cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ChainDescriptor>> {
        self.chains.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.chains.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}
