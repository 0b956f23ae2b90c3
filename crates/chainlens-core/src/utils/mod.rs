//! Small encoding and parsing helpers shared across the crate.

pub mod base58;
pub mod endpoint;

pub use base58::is_base58;
pub use endpoint::parse_http_url;
