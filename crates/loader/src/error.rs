use core_types::CoreError;
use database::StoreError;
use engine::LedgerError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Failed to read data file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Malformed record in {file}, line {line}: {reason}")]
    Malformed {
        file: &'static str,
        line: u64,
        reason: String,
    },

    #[error("The ledger already holds data; refusing to load it again")]
    AlreadyLoaded,

    #[error("Invalid loader input: {0}")]
    Invalid(#[from] CoreError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}
