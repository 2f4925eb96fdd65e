//! # Seed Data Loader
//!
//! Fills an empty ledger with reference data and quotes, either from the
//! `#`-delimited data files (`accounts.txt`, `companylist.txt`,
//! `currencies.txt`, `quotes.txt`) or synthetically, and creates random
//! portfolio rows for benchmarking.

pub mod error;
pub mod files;
pub mod seed;

pub use error::LoaderError;
pub use files::{read_accounts, read_currencies, read_quotes, read_stocks, stock_list_from_file};
pub use seed::{load_initial, populate_portfolios, seed_synthetic, write_seed, LoadSummary};
