use core_types::{CoreError, OrderSide};
use database::StoreError;
use rust_decimal::Decimal;
use std::fmt;
use thiserror::Error;

/// Coarse classification of a ledger failure, for callers deciding whether to
/// resubmit, report or give up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorKind {
    /// A referenced account, symbol, quote or portfolio is absent.
    NotFound,
    /// A business rule rejected the request.
    PreconditionFailed,
    /// The store failed to begin, read, write, commit or abort.
    StoreFailure,
    /// A lock or transaction wait exceeded its limit.
    Timeout,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::NotFound => "not found",
            ErrorKind::PreconditionFailed => "precondition failed",
            ErrorKind::StoreFailure => "store failure",
            ErrorKind::Timeout => "timeout",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Account '{0}' does not exist")]
    AccountNotFound(String),

    #[error("Symbol '{0}' is not listed")]
    SymbolNotFound(String),

    #[error("Account '{account}' holds no portfolio in '{symbol}'")]
    PortfolioNotFound { account: String, symbol: String },

    #[error("No quote for symbol '{0}'")]
    QuoteNotFound(String),

    #[error("Insufficient holdings: {held} held, {requested} requested")]
    InsufficientHoldings { held: i64, requested: i64 },

    #[error("The {side} price check failed: limit {limit}, current price {current}")]
    PriceCheckFailed {
        side: OrderSide,
        limit: Decimal,
        current: Decimal,
    },

    #[error("Portfolio id '{0}' is already taken")]
    DuplicatePortfolio(String),

    #[error("Invalid input: {0}")]
    InvalidInput(#[from] CoreError),

    #[error("Timed out: {0}")]
    Timeout(StoreError),

    #[error("Store error: {0}")]
    Store(StoreError),
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::AccountNotFound(_)
            | LedgerError::SymbolNotFound(_)
            | LedgerError::PortfolioNotFound { .. }
            | LedgerError::QuoteNotFound(_) => ErrorKind::NotFound,
            LedgerError::InsufficientHoldings { .. }
            | LedgerError::PriceCheckFailed { .. }
            | LedgerError::DuplicatePortfolio(_)
            | LedgerError::InvalidInput(_) => ErrorKind::PreconditionFailed,
            LedgerError::Timeout(_) => ErrorKind::Timeout,
            LedgerError::Store(_) => ErrorKind::StoreFailure,
        }
    }

    /// Whether resubmitting the same request may succeed. The ledger never
    /// retries on its own.
    pub fn is_retryable(&self) -> bool {
        match self {
            LedgerError::Timeout(_) => true,
            LedgerError::Store(e) => e.is_transient(),
            _ => false,
        }
    }
}

impl From<StoreError> for LedgerError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::LockTimeout(_) => LedgerError::Timeout(error),
            other => LedgerError::Store(other),
        }
    }
}
