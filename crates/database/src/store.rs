use crate::error::StoreError;
use async_trait::async_trait;
use core_types::{Account, Currency, Portfolio, Quote, Stock};
use std::fmt;

/// The logical tables of the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Stocks,
    Quotes,
    Portfolios,
    Accounts,
    Currencies,
}

impl Table {
    pub const ALL: [Table; 5] = [
        Table::Stocks,
        Table::Quotes,
        Table::Portfolios,
        Table::Accounts,
        Table::Currencies,
    ];

    /// The SQL table backing this logical table.
    pub fn sql_name(&self) -> &'static str {
        match self {
            Table::Stocks => "stocks",
            Table::Quotes => "quotes",
            Table::Portfolios => "portfolios",
            Table::Accounts => "accounts",
            Table::Currencies => "currencies",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Table::Stocks => "Stocks",
            Table::Quotes => "Quotes",
            Table::Portfolios => "Portfolios",
            Table::Accounts => "Accounts",
            Table::Currencies => "Currencies",
        };
        f.write_str(name)
    }
}

/// Row lock requested by a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockMode {
    /// Plain read-committed read; no lock is held after the read returns.
    #[default]
    ReadCommitted,
    /// Write-intent lock held until the transaction ends. Use it for any read
    /// that will be followed by a write of the same row.
    ForUpdate,
}

/// What a put does when the key is already present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutPolicy {
    Overwrite,
    /// Fail with `StoreError::KeyExists`.
    NoOverwrite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableStats {
    pub rows: u64,
}

/// The transactional key-value contract the ledger engine is written against.
///
/// Every keyed operation runs inside a transaction obtained from `begin` and
/// finished by exactly one of `commit` or `abort`. Dropping a transaction
/// without finishing it rolls it back. Reads see committed data plus the
/// transaction's own writes.
#[async_trait]
pub trait LedgerStore: Send + Sync + 'static {
    /// An open transaction handle.
    type Txn: Send;

    /// Opens a read-committed transaction. `name` labels it in logs.
    async fn begin(&self, name: &'static str) -> Result<Self::Txn, StoreError>;
    async fn commit(&self, txn: Self::Txn) -> Result<(), StoreError>;
    async fn abort(&self, txn: Self::Txn) -> Result<(), StoreError>;

    async fn get_stock(&self, txn: &mut Self::Txn, symbol: &str)
    -> Result<Option<Stock>, StoreError>;

    async fn get_account(
        &self,
        txn: &mut Self::Txn,
        account_id: &str,
        lock: LockMode,
    ) -> Result<Option<Account>, StoreError>;

    async fn get_quote(
        &self,
        txn: &mut Self::Txn,
        symbol: &str,
        lock: LockMode,
    ) -> Result<Option<Quote>, StoreError>;

    async fn get_portfolio(
        &self,
        txn: &mut Self::Txn,
        portfolio_id: &str,
        lock: LockMode,
    ) -> Result<Option<Portfolio>, StoreError>;

    /// Walks the account-id secondary index and returns every portfolio row
    /// of `account_id`, ordered by portfolio id.
    async fn scan_portfolios_by_account(
        &self,
        txn: &mut Self::Txn,
        account_id: &str,
        lock: LockMode,
    ) -> Result<Vec<Portfolio>, StoreError>;

    /// Every stock, ordered by symbol.
    async fn scan_stocks(&self, txn: &mut Self::Txn) -> Result<Vec<Stock>, StoreError>;

    async fn put_stock(
        &self,
        txn: &mut Self::Txn,
        stock: &Stock,
        policy: PutPolicy,
    ) -> Result<(), StoreError>;

    async fn put_account(
        &self,
        txn: &mut Self::Txn,
        account: &Account,
        policy: PutPolicy,
    ) -> Result<(), StoreError>;

    async fn put_currency(
        &self,
        txn: &mut Self::Txn,
        currency: &Currency,
        policy: PutPolicy,
    ) -> Result<(), StoreError>;

    async fn put_quote(
        &self,
        txn: &mut Self::Txn,
        quote: &Quote,
        policy: PutPolicy,
    ) -> Result<(), StoreError>;

    async fn put_portfolio(
        &self,
        txn: &mut Self::Txn,
        portfolio: &Portfolio,
        policy: PutPolicy,
    ) -> Result<(), StoreError>;

    /// Committed row count of `table`, read outside any transaction.
    async fn stat(&self, table: Table) -> Result<TableStats, StoreError>;

    /// The largest numeric portfolio id ever committed, if any.
    async fn max_portfolio_number(&self) -> Result<Option<u64>, StoreError>;
}
