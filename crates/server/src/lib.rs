//! HTTP surface for chainlens: routes, error rendering, middleware and logging setup.
//!
//! | Route | Engine call |
//! |-------|-------------|
//! | `GET /api/v1/blocks/latest/{chain}` | `get_latest_block` |
//! | `GET /api/v1/tx/total/{chain}` | `count_total_tx_last_24h` |
//! | `GET /api/v1/tx/{hash}` | `search_transaction_hash` |
//! | `GET /health` | registry and cache summary |
//! | `GET /metrics` | Prometheus exposition |

pub mod app;
pub mod error;
pub mod logging;
pub mod middleware;
pub mod router;

pub use app::{build_cache_store, create_app};
pub use error::ApiError;
pub use logging::init_logging;
