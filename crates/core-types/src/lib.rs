//! # Ledger Core Types
//!
//! The shared data model of the trading ledger: reference data (`Stock`,
//! `Account`, `Currency`), live prices (`Quote`), per-account positions
//! (`Portfolio`) and the order requests that mutate them.
//!
//! Every other crate in the workspace speaks in these types, so this crate has
//! no knowledge of storage, transactions or configuration.

pub mod enums;
pub mod error;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use enums::{ExecutionMode, OrderSide, OrderStatus};
pub use error::CoreError;
pub use structs::{
    validate_identifier, Account, Currency, OrderRequest, OrderTicket, Portfolio, Quote, Stock,
    MAX_ID_LEN,
};
