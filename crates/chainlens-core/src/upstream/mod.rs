//! Outbound HTTP plumbing shared by every chain and the analytics API.
//!
//! - [`HttpClient`]: pooled `reqwest` client with a semaphore concurrency limit and an
//!   opt-in [`RetryPolicy`]
//! - [`RpcClient`]: JSON-RPC 2.0 call layer bound to one endpoint
//! - [`UpstreamError`]: transport and protocol failures
//!
//! ```text
//! protocol adapter ──► RpcClient ──┐
//!                                  ├──► HttpClient (one pool, one semaphore)
//! AnalyticsClient ─────────────────┘
//! ```

pub mod errors;
pub mod http_client;
pub mod rpc_client;

pub use errors::UpstreamError;
pub use http_client::{HttpClient, HttpClientConfig, RetryPolicy};
pub use rpc_client::RpcClient;
