//! # Chainlens Core
//!
//! Core library for the chainlens multi-chain query API.
//!
//! This crate provides the foundational components for:
//!
//! - **[`chain`]**: The closed set of supported chains and the immutable registry mapping
//!   each to its endpoint, RPC method table and protocol family.
//!
//! - **[`upstream`]**: Pooled HTTP client with a concurrency semaphore and a JSON-RPC 2.0
//!   call layer on top of it.
//!
//! - **[`protocol`]**: Per-family adapters (EVM, generic JSON-RPC, Solana, NEAR) behind
//!   one `ChainClient` trait.
//!
//! - **[`cache`]**: Cache-aside layer over Redis or an in-process store.
//!
//! - **[`dispatch`]**: The engine serving latest-block, hash-search and 24h-count queries,
//!   including the cross-chain fan-out.
//!
//! - **[`analytics`]**: Client for the SQL analytics API used for transaction counts.
//!
//! - **[`metrics`]**: Prometheus metrics collection.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        DispatchEngine                        │
//! │  ┌───────────────┐  ┌───────────────┐  ┌──────────────────┐  │
//! │  │ ChainRegistry │  │ ResponseCache │  │ MetricsCollector │  │
//! │  └───────┬───────┘  └───────┬───────┘  └────────┬─────────┘  │
//! │          │                  │                   │            │
//! │  ┌───────▼───────┐  ┌───────▼───────┐  ┌────────▼─────────┐  │
//! │  │ProtocolAdapter│  │ RedisStore /  │  │    Prometheus    │  │
//! │  │ RpcClient     │  │ MemoryStore   │  │     Exporter     │  │
//! │  │ HttpClient    │  └───────────────┘  └──────────────────┘  │
//! │  └───────────────┘                                           │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod analytics;
pub mod cache;
pub mod chain;
pub mod config;
pub mod dispatch;
pub mod metrics;
pub mod protocol;
pub mod types;
pub mod upstream;
pub mod utils;
