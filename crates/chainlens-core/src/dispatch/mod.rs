//! Chain dispatch and fan-out aggregation.
//!
//! Turns an opaque identifier (a chain name or a hash) into the right RPC calls, caches the
//! answer, and reports failures in the [`DispatchError`] taxonomy.
//!
//! # Request Processing Flow
//!
//! ```text
//!  identifier
//!      │
//!      ▼
//! ┌────────────┐
//! │ Validation │ ─── empty / unsupported ──► DispatchError
//! └─────┬──────┘
//!       ▼
//! ┌────────────┐
//! │ Cache read │ ─── hit ──► cached JSON
//! └─────┬──────┘
//!       │ miss (or cache error)
//!       ▼
//! ┌──────────────────────────────────────────┐
//! │ latest block: one adapter call           │
//! │ search:       classify ► JoinSet fan-out │
//! │ tx count:     analytics API              │
//! └─────┬────────────────────────────────────┘
//!       ▼
//! ┌─────────────┐
//! │ Cache write │ (failures logged, never surfaced)
//! └─────────────┘
//! ```

pub mod classify;
pub mod engine;
pub mod errors;
pub mod handlers;

pub use classify::HashShape;
pub use engine::{AggregatedResult, DispatchEngine, DispatchSettings, InitError, SharedContext};
pub use errors::DispatchError;
