//! # Ledger Engine
//!
//! The transactional core of the trading ledger. It decides whether a buy or
//! sell executes against the current quote or is queued as a pending intent,
//! keeps one portfolio row per (account, symbol) pair, hands out portfolio ids,
//! and wraps all of it in all-or-nothing units of work.
//!
//! ## Components
//!
//! - `identity`: account and symbol existence checks run before any mutation.
//! - `quotes`: quote reads and price updates (set or random walk).
//! - `portfolio_index`: (account, symbol) lookup over the account index and
//!   creation of new portfolio rows.
//! - `ids`: the portfolio id allocator.
//! - `orders`: the buy/sell state machine.
//! - `envelope`: owned versus borrowed transactions.
//! - `Ledger`: the public entry points, single and batch.
//! - `workload`: a concurrent synthetic workload for benchmarking.

pub mod envelope;
pub mod error;
pub mod identity;
pub mod ids;
pub mod ledger;
pub mod orders;
pub mod portfolio_index;
pub mod quotes;
pub mod workload;

pub use envelope::Transaction;
pub use error::{ErrorKind, LedgerError};
pub use ids::{AtomicIdAllocator, IdAllocator};
pub use ledger::Ledger;
pub use orders::OrderReceipt;
pub use quotes::{PriceUpdate, PriceWalk, RandomPriceWalk};
pub use workload::{KindTally, TxnKind, Workload, WorkloadReport};
