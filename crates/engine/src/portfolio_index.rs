//! Resolves (account, symbol) pairs to portfolio rows and creates new rows.
//!
//! The only secondary index over portfolios is keyed by account id and holds
//! many rows per account. There is no key carrying the symbol, so a lookup
//! walks one account's rows and compares symbols. The walk is bounded by the
//! number of symbols that account has ever traded.

use crate::error::LedgerError;
use crate::ids::IdAllocator;
use core_types::{ExecutionMode, Portfolio};
use database::{LedgerStore, LockMode, PutPolicy, StoreError, Table};
use rust_decimal::Decimal;

pub async fn find_portfolio<S: LedgerStore>(
    store: &S,
    txn: &mut S::Txn,
    account_id: &str,
    symbol: &str,
    lock: LockMode,
) -> Result<Option<Portfolio>, LedgerError> {
    let rows = store.scan_portfolios_by_account(txn, account_id, lock).await?;
    Ok(rows.into_iter().find(|p| p.symbol == symbol))
}

/// Every portfolio row of `account_id`, ordered by portfolio id.
pub async fn portfolios_for_account<S: LedgerStore>(
    store: &S,
    txn: &mut S::Txn,
    account_id: &str,
) -> Result<Vec<Portfolio>, LedgerError> {
    Ok(store
        .scan_portfolios_by_account(txn, account_id, LockMode::ReadCommitted)
        .await?)
}

/// Inserts a new portfolio row for a pair that has none yet.
///
/// An immediate order creates the row holding `amount`; a deferred one creates
/// it empty with the buy intent recorded. The insert refuses to replace an
/// existing id.
#[allow(clippy::too_many_arguments)]
pub async fn create_portfolio<S: LedgerStore>(
    store: &S,
    txn: &mut S::Txn,
    ids: &dyn IdAllocator,
    account_id: &str,
    symbol: &str,
    price: Decimal,
    amount: i64,
    mode: ExecutionMode,
) -> Result<Portfolio, LedgerError> {
    let portfolio_id = ids.next_id();
    let portfolio = match mode {
        ExecutionMode::Immediate => Portfolio::holding(&portfolio_id, account_id, symbol, amount),
        ExecutionMode::Deferred => {
            let mut row = Portfolio::holding(&portfolio_id, account_id, symbol, 0);
            row.queue_buy(amount, price);
            row
        }
    };

    match store
        .put_portfolio(txn, &portfolio, PutPolicy::NoOverwrite)
        .await
    {
        Ok(()) => {
            tracing::debug!(%portfolio_id, account_id, symbol, "portfolio created");
            Ok(portfolio)
        }
        Err(StoreError::KeyExists {
            table: Table::Portfolios,
            ..
        }) => Err(LedgerError::DuplicatePortfolio(portfolio_id)),
        Err(e) => Err(e.into()),
    }
}
