//! # Ledger Store Adapter
//!
//! This crate is the only place that knows how ledger records are kept. It
//! exposes the transactional key-value contract the order engine consumes and
//! two implementations of it.
//!
//! ## Architectural Principles
//!
//! - **One contract, many stores:** The `LedgerStore` trait describes keyed
//!   get/put, the account-id secondary index walk and table statistics, all
//!   inside read-committed transactions. The engine is generic over it.
//! - **Embedded store:** `MemoryStore` keeps the five tables in process. Its
//!   transactions are serialised and stage writes until commit, so an aborted
//!   or dropped transaction leaves no trace.
//! - **PostgreSQL store:** `PgStore` maps the same contract onto a `PgPool`,
//!   translating lock timeouts, deadlocks and unique violations into
//!   `StoreError` variants the engine can classify.
//!
//! ## Public API
//!
//! - `LedgerStore`, `Table`, `LockMode`, `PutPolicy`, `TableStats`: the contract.
//! - `MemoryStore`, `PgStore`: the implementations.
//! - `connect`, `run_migrations`: PostgreSQL pool setup.
//! - `StoreError`: the specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod connection;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

// Re-export the key components to create a clean, public-facing API.
pub use connection::{connect, run_migrations};
pub use error::StoreError;
pub use memory::{MemoryStore, MemoryTxn};
pub use postgres::PgStore;
pub use store::{LedgerStore, LockMode, PutPolicy, Table, TableStats};
