//! Handlers for the three query operations.

pub mod blocks;
pub mod transactions;
pub mod tx_count;

pub use blocks::BlocksHandler;
pub use transactions::TransactionsHandler;
pub use tx_count::TxCountHandler;
