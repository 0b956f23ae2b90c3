//! Application configuration with layered loading.
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded in this order (later overrides earlier):
//!
//! 1. **Compiled defaults**: `Default` implementations and `set_default` calls
//! 2. **Config file**: TOML file specified by the `CHAINLENS_CONFIG` env var
//! 3. **Environment variables**: `CHAINLENS__*` env vars override specific fields
//!
//! # Configuration Sections
//!
//! - [`ServerConfig`]: HTTP server settings (bind address, concurrency)
//! - [`ChainsConfig`]: NodeReal API key, enabled chains, endpoint overrides
//! - [`CacheConfig`]: cache backend and TTLs
//! - [`AnalyticsConfig`]: SQL analytics API used for 24h transaction counts
//! - [`DispatchConfig`]: fan-out deadline
//! - [`MetricsConfig`]: Prometheus metrics endpoint
//! - [`LoggingConfig`]: Log level and format
//!
//! # Example
//!
//! ```toml
//! [server]
//! bind_address = "0.0.0.0"
//! bind_port = 8080
//!
//! [chains]
//! nodereal_api_key = "YOUR_KEY"
//! enabled = ["ethereum", "bsc", "solana"]
//!
//! [chains.endpoints]
//! solana = "http://127.0.0.1:8899"
//!
//! [cache]
//! backend = "redis"
//! redis_url = "redis://127.0.0.1:6379"
//! ```

use crate::{
    analytics::RETRY_BASE_DELAY as ANALYTICS_RETRY_BASE_DELAY,
    chain::ChainId,
    upstream::RetryPolicy,
    utils::parse_http_url,
};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, path::Path, time::Duration};

/// HTTP server configuration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// IP address to bind the server to. Defaults to `127.0.0.1`.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Port number to listen on. Must be greater than 0. Defaults to `8080`.
    #[serde(default = "default_bind_port")]
    pub bind_port: u16,

    /// Maximum number of in-flight HTTP requests. Defaults to `100`.
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,

    /// Whole-request timeout in seconds. Must outlast the search deadline and the
    /// analytics worst case (every attempt timing out plus backoff). Defaults to `240`.
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_bind_port() -> u16 {
    8080
}

fn default_max_concurrent_requests() -> usize {
    100
}

fn default_request_timeout_seconds() -> u64 {
    240
}

/// Which chains are served and where their RPC endpoints live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainsConfig {
    /// API key substituted into the default NodeReal endpoint templates.
    #[serde(default)]
    pub nodereal_api_key: String,

    /// Wire identifiers of the chains to serve. `None` serves every supported chain.
    #[serde(default)]
    pub enabled: Option<Vec<String>>,

    /// Per-chain endpoint overrides, keyed by wire identifier.
    #[serde(default)]
    pub endpoints: HashMap<String, String>,

    /// Per-call timeout for RPC requests in seconds. Defaults to `10`.
    #[serde(default = "default_rpc_timeout_seconds")]
    pub rpc_timeout_seconds: u64,

    /// Upper bound on concurrent outbound RPC requests. Defaults to `200`.
    #[serde(default = "default_max_concurrent_rpc")]
    pub max_concurrent_rpc: usize,
}

fn default_rpc_timeout_seconds() -> u64 {
    10
}

fn default_max_concurrent_rpc() -> usize {
    200
}

/// Storage engine behind the cache-aside layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Redis,
    Memory,
}

impl CacheBackend {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Redis => "redis",
            Self::Memory => "memory",
        }
    }
}

/// Cache-aside configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Backend to use. Defaults to `memory`.
    #[serde(default = "default_cache_backend")]
    pub backend: CacheBackend,

    /// Redis connection URL, required when `backend = "redis"`.
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Prefix prepended to every key. Defaults to `"chain"`.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// TTL used for latest-block entries. Defaults to `60`.
    #[serde(default = "default_ttl_seconds")]
    pub default_ttl_seconds: u64,

    /// TTL applied to search results. Defaults to `3600`.
    #[serde(default = "default_search_ttl_seconds")]
    pub search_ttl_seconds: u64,

    /// TTL applied to 24h transaction counts. Defaults to `300`.
    #[serde(default = "default_count_ttl_seconds")]
    pub count_ttl_seconds: u64,
}

fn default_cache_backend() -> CacheBackend {
    CacheBackend::Memory
}

fn default_namespace() -> String {
    "chain".to_string()
}

fn default_ttl_seconds() -> u64 {
    60
}

fn default_search_ttl_seconds() -> u64 {
    3600
}

fn default_count_ttl_seconds() -> u64 {
    300
}

/// Analytics API used for 24h transaction counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// SQL query endpoint.
    #[serde(default = "default_analytics_url")]
    pub url: String,

    /// Value sent in the `X-API-KEY` header.
    #[serde(default)]
    pub api_key: String,

    /// Per-attempt timeout in seconds. Defaults to `60`.
    #[serde(default = "default_analytics_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Total attempts including the first one. Defaults to `3`.
    #[serde(default = "default_analytics_max_attempts")]
    pub max_attempts: u32,
}

fn default_analytics_url() -> String {
    "https://api.chainbase.online/v1/dw/query".to_string()
}

/// Upper bound for every cache TTL: 30 days.
pub const MAX_TTL_SECONDS: u64 = 30 * 24 * 60 * 60;

fn default_analytics_timeout_seconds() -> u64 {
    60
}

fn default_analytics_max_attempts() -> u32 {
    3
}

/// Dispatch engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Deadline for the whole search fan-out in seconds. Defaults to `30`.
    #[serde(default = "default_search_timeout_seconds")]
    pub search_timeout_seconds: u64,
}

fn default_search_timeout_seconds() -> u64 {
    30
}

/// Prometheus metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Whether metrics collection and the `/metrics` route are enabled. Defaults to `true`.
    pub enabled: bool,
}

/// Application logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g., "trace", "debug", "info", "warn", "error"). Defaults to `"info"`.
    pub level: String,

    /// Output format: `"json"` or `"pretty"`. Defaults to `"pretty"`.
    pub format: String,
}

/// Root application configuration containing all subsystem settings.
///
/// Loaded with the `CHAINLENS` prefix for environment overrides using `__` as a separator,
/// e.g. `CHAINLENS__CACHE__BACKEND=redis`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub chains: ChainsConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub analytics: AnalyticsConfig,

    #[serde(default)]
    pub dispatch: DispatchConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            bind_port: default_bind_port(),
            max_concurrent_requests: default_max_concurrent_requests(),
            request_timeout_seconds: default_request_timeout_seconds(),
        }
    }
}

impl Default for ChainsConfig {
    fn default() -> Self {
        Self {
            nodereal_api_key: String::new(),
            enabled: None,
            endpoints: HashMap::new(),
            rpc_timeout_seconds: default_rpc_timeout_seconds(),
            max_concurrent_rpc: default_max_concurrent_rpc(),
        }
    }
}

impl ChainsConfig {
    #[must_use]
    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_seconds)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: default_cache_backend(),
            redis_url: None,
            namespace: default_namespace(),
            default_ttl_seconds: default_ttl_seconds(),
            search_ttl_seconds: default_search_ttl_seconds(),
            count_ttl_seconds: default_count_ttl_seconds(),
        }
    }
}

impl CacheConfig {
    #[must_use]
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_seconds)
    }

    #[must_use]
    pub fn search_ttl(&self) -> Duration {
        Duration::from_secs(self.search_ttl_seconds)
    }

    #[must_use]
    pub fn count_ttl(&self) -> Duration {
        Duration::from_secs(self.count_ttl_seconds)
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            url: default_analytics_url(),
            api_key: String::new(),
            timeout_seconds: default_analytics_timeout_seconds(),
            max_attempts: default_analytics_max_attempts(),
        }
    }
}

impl AnalyticsConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::exponential(self.max_attempts, ANALYTICS_RETRY_BASE_DELAY)
    }

    /// Longest a single count can take: every attempt times out, with backoff in between.
    #[must_use]
    pub fn worst_case_duration(&self) -> Duration {
        self.timeout()
            .saturating_mul(self.max_attempts.max(1))
            .saturating_add(self.retry_policy().total_backoff())
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self { search_timeout_seconds: default_search_timeout_seconds() }
    }
}

impl DispatchConfig {
    #[must_use]
    pub fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.search_timeout_seconds)
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: "pretty".to_string() }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file with environment variable overrides.
    ///
    /// Environment variables with the `CHAINLENS__` prefix can override any value, using
    /// `__` as a separator for nested fields (e.g., `CHAINLENS__SERVER__BIND_PORT=9000`).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, parsed, or deserialized.
    pub fn from_file<P: AsRef<Path>>(config_path: P) -> Result<Self, ConfigError> {
        let config_builder = Config::builder()
            .set_default("server.bind_address", default_bind_address())?
            .set_default("server.bind_port", i64::from(default_bind_port()))?
            .set_default("chains.rpc_timeout_seconds", default_rpc_timeout_seconds())?
            .set_default("cache.backend", "memory")?
            .set_default("cache.namespace", default_namespace())?
            .set_default("analytics.url", default_analytics_url())?
            .set_default("analytics.max_attempts", i64::from(default_analytics_max_attempts()))?
            .set_default("dispatch.search_timeout_seconds", default_search_timeout_seconds())?
            .set_default("metrics.enabled", true)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name(&config_path.as_ref().to_string_lossy()).required(false))
            .add_source(Environment::with_prefix("CHAINLENS").prefix_separator("__").separator("__"))
            .build()?;

        config_builder.try_deserialize()
    }

    /// Loads configuration from `config/config.toml` with fallback to defaults.
    ///
    /// The path can be overridden with the `CHAINLENS_CONFIG` environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration cannot be loaded or parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("CHAINLENS_CONFIG").unwrap_or_else(|_| "config/config.toml".to_string());
        Self::from_file(&config_path)
    }

    /// Returns the parsed socket address for the HTTP server.
    ///
    /// # Errors
    ///
    /// Returns an error string if the address cannot be parsed into a valid [`SocketAddr`].
    ///
    /// [`SocketAddr`]: std::net::SocketAddr
    pub fn socket_addr(&self) -> Result<std::net::SocketAddr, String> {
        format!("{}:{}", self.server.bind_address, self.server.bind_port)
            .parse()
            .map_err(|_| {
                format!(
                    "Invalid socket address: {}:{}",
                    self.server.bind_address, self.server.bind_port
                )
            })
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_seconds)
    }

    /// Validates the configuration for correctness and consistency.
    ///
    /// Checks include:
    /// - enabled chains and endpoint overrides name supported chains
    /// - override and analytics URLs are http(s)
    /// - the Redis backend has a URL
    /// - timeouts, TTLs and limits are greater than zero, TTLs at most [`MAX_TTL_SECONDS`]
    /// - the request timeout outlasts the search deadline and the analytics worst case
    /// - logging format is either `"json"` or `"pretty"`
    ///
    /// # Errors
    ///
    /// Returns a descriptive error string if validation fails.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(enabled) = &self.chains.enabled {
            if enabled.is_empty() {
                return Err("Enabled chain list is empty".to_string());
            }
            for name in enabled {
                name.parse::<ChainId>().map_err(|e| format!("Invalid enabled chain: {e}"))?;
            }
        }

        for (name, url) in &self.chains.endpoints {
            name.parse::<ChainId>().map_err(|e| format!("Invalid endpoint override: {e}"))?;
            parse_http_url(url)
                .map_err(|e| format!("Invalid endpoint URL for chain {name}: {e}"))?;
        }

        if self.chains.rpc_timeout_seconds == 0 {
            return Err("RPC timeout must be greater than 0".to_string());
        }

        if self.chains.max_concurrent_rpc == 0 {
            return Err("Max concurrent RPC requests must be greater than 0".to_string());
        }

        if self.cache.backend == CacheBackend::Redis &&
            self.cache.redis_url.as_deref().map_or(true, str::is_empty)
        {
            return Err("Redis cache backend requires cache.redis_url".to_string());
        }

        if self.cache.default_ttl_seconds == 0 ||
            self.cache.search_ttl_seconds == 0 ||
            self.cache.count_ttl_seconds == 0
        {
            return Err("Cache TTLs must be greater than 0".to_string());
        }

        if self.cache.default_ttl_seconds > MAX_TTL_SECONDS ||
            self.cache.search_ttl_seconds > MAX_TTL_SECONDS ||
            self.cache.count_ttl_seconds > MAX_TTL_SECONDS
        {
            return Err(format!("Cache TTLs must not exceed {MAX_TTL_SECONDS} seconds"));
        }

        parse_http_url(&self.analytics.url)
            .map_err(|e| format!("Invalid analytics URL {}: {e}", self.analytics.url))?;

        if self.analytics.timeout_seconds == 0 {
            return Err("Analytics timeout must be greater than 0".to_string());
        }

        if self.analytics.max_attempts == 0 {
            return Err("Analytics max attempts must be greater than 0".to_string());
        }

        if self.dispatch.search_timeout_seconds == 0 {
            return Err("Search timeout must be greater than 0".to_string());
        }

        if self.server.max_concurrent_requests == 0 {
            return Err("Max concurrent requests must be greater than 0".to_string());
        }

        if self.server.request_timeout_seconds == 0 {
            return Err("Request timeout must be greater than 0".to_string());
        }

        let request_timeout = self.request_timeout();
        if request_timeout <= self.dispatch.search_timeout() {
            return Err(format!(
                "Request timeout ({}s) must exceed the search timeout ({}s)",
                self.server.request_timeout_seconds, self.dispatch.search_timeout_seconds
            ));
        }

        let analytics_worst_case = self.analytics.worst_case_duration();
        if request_timeout <= analytics_worst_case {
            return Err(format!(
                "Request timeout ({}s) must exceed the analytics worst case ({:.1}s)",
                self.server.request_timeout_seconds,
                analytics_worst_case.as_secs_f64()
            ));
        }

        if self.server.bind_port == 0 {
            return Err("Bind port must be greater than 0".to_string());
        }

        if !["json", "pretty"].contains(&self.logging.format.as_str()) {
            return Err("Logging format must be 'json' or 'pretty'".to_string());
        }

        Ok(())
    }
}
