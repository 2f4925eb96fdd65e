//! Existence checks run before any mutation, inside the caller's transaction.

use crate::error::LedgerError;
use core_types::{Account, Stock};
use database::{LedgerStore, LockMode};

pub async fn account_exists<S: LedgerStore>(
    store: &S,
    txn: &mut S::Txn,
    account_id: &str,
) -> Result<bool, LedgerError> {
    Ok(store
        .get_account(txn, account_id, LockMode::ReadCommitted)
        .await?
        .is_some())
}

pub async fn symbol_exists<S: LedgerStore>(
    store: &S,
    txn: &mut S::Txn,
    symbol: &str,
) -> Result<bool, LedgerError> {
    Ok(store.get_stock(txn, symbol).await?.is_some())
}

/// Fetches the account or fails with `AccountNotFound`.
///
/// Order placement passes `LockMode::ForUpdate`: holding the account row for
/// the rest of the transaction serialises concurrent orders of one account,
/// so two racing first buys of a pair cannot both create a portfolio row.
pub async fn ensure_account<S: LedgerStore>(
    store: &S,
    txn: &mut S::Txn,
    account_id: &str,
    lock: LockMode,
) -> Result<Account, LedgerError> {
    store
        .get_account(txn, account_id, lock)
        .await?
        .ok_or_else(|| LedgerError::AccountNotFound(account_id.to_string()))
}

pub async fn ensure_symbol<S: LedgerStore>(
    store: &S,
    txn: &mut S::Txn,
    symbol: &str,
) -> Result<Stock, LedgerError> {
    store
        .get_stock(txn, symbol)
        .await?
        .ok_or_else(|| LedgerError::SymbolNotFound(symbol.to_string()))
}
