use crate::error::StoreError;
use crate::store::{LedgerStore, LockMode, PutPolicy, Table, TableStats};
use async_trait::async_trait;
use core_types::{Account, Currency, Portfolio, Quote, Stock};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Default, Clone)]
struct Tables {
    stocks: BTreeMap<String, Stock>,
    quotes: BTreeMap<String, Quote>,
    portfolios: BTreeMap<String, Portfolio>,
    /// Secondary index: account id -> portfolio ids. Many rows per account.
    portfolios_by_account: BTreeMap<String, BTreeSet<String>>,
    accounts: BTreeMap<String, Account>,
    currencies: BTreeMap<String, Currency>,
}

impl Tables {
    fn rows(&self, table: Table) -> u64 {
        let rows = match table {
            Table::Stocks => self.stocks.len(),
            Table::Quotes => self.quotes.len(),
            Table::Portfolios => self.portfolios.len(),
            Table::Accounts => self.accounts.len(),
            Table::Currencies => self.currencies.len(),
        };
        rows as u64
    }

    fn index_portfolio(&mut self, portfolio: Portfolio) {
        if let Some(previous) = self.portfolios.get(&portfolio.portfolio_id) {
            if previous.account_id != portfolio.account_id {
                if let Some(ids) = self.portfolios_by_account.get_mut(&previous.account_id) {
                    ids.remove(&portfolio.portfolio_id);
                }
            }
        }
        self.portfolios_by_account
            .entry(portfolio.account_id.clone())
            .or_default()
            .insert(portfolio.portfolio_id.clone());
        self.portfolios.insert(portfolio.portfolio_id.clone(), portfolio);
    }

    /// Publishes the writes staged by a transaction.
    fn apply(&mut self, staged: Tables) {
        self.stocks.extend(staged.stocks);
        self.quotes.extend(staged.quotes);
        self.accounts.extend(staged.accounts);
        self.currencies.extend(staged.currencies);
        for (_, portfolio) in staged.portfolios {
            self.index_portfolio(portfolio);
        }
    }
}

/// The embedded ledger store.
///
/// Transactions are serialised: `begin` takes the store's single transaction
/// slot, waiting at most the configured lock timeout, and the slot is released
/// when the transaction commits, aborts or is dropped. Writes are staged per
/// transaction and published together on commit.
///
/// `stat` and `max_portfolio_number` read committed rows without taking the
/// slot, so they answer even while a transaction is open.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    /// Committed rows. Only `commit` writes them.
    tables: Arc<RwLock<Tables>>,
    slot: Arc<Mutex<()>>,
    lock_timeout: Duration,
    next_txn_id: Arc<AtomicU64>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_LOCK_TIMEOUT)
    }
}

impl MemoryStore {
    pub fn new(lock_timeout: Duration) -> Self {
        Self {
            tables: Arc::new(RwLock::new(Tables::default())),
            slot: Arc::new(Mutex::new(())),
            lock_timeout,
            next_txn_id: Arc::new(AtomicU64::new(1)),
        }
    }

    async fn take_slot(&self) -> Result<OwnedMutexGuard<()>, StoreError> {
        tokio::time::timeout(self.lock_timeout, Arc::clone(&self.slot).lock_owned())
            .await
            .map_err(|_| {
                StoreError::LockTimeout(format!(
                    "no transaction slot within {} ms",
                    self.lock_timeout.as_millis()
                ))
            })
    }
}

/// An open transaction on a `MemoryStore`.
#[derive(Debug)]
pub struct MemoryTxn {
    id: u64,
    name: &'static str,
    _slot: OwnedMutexGuard<()>,
    staged: Tables,
}

impl MemoryTxn {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    fn lookup<'a, T>(
        staged: &'a BTreeMap<String, T>,
        committed: &'a BTreeMap<String, T>,
        key: &str,
    ) -> Option<&'a T> {
        staged.get(key).or_else(|| committed.get(key))
    }

    fn exists<T>(staged: &BTreeMap<String, T>, committed: &BTreeMap<String, T>, key: &str) -> bool {
        staged.contains_key(key) || committed.contains_key(key)
    }
}

fn check_policy(
    exists: bool,
    policy: PutPolicy,
    table: Table,
    key: &str,
) -> Result<(), StoreError> {
    if exists && policy == PutPolicy::NoOverwrite {
        return Err(StoreError::KeyExists {
            table,
            key: key.to_string(),
        });
    }
    Ok(())
}

#[async_trait]
impl LedgerStore for MemoryStore {
    type Txn = MemoryTxn;

    async fn begin(&self, name: &'static str) -> Result<MemoryTxn, StoreError> {
        let slot = self.take_slot().await?;
        let id = self.next_txn_id.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(txn = id, name, "memory transaction started");
        Ok(MemoryTxn {
            id,
            name,
            _slot: slot,
            staged: Tables::default(),
        })
    }

    async fn commit(&self, txn: MemoryTxn) -> Result<(), StoreError> {
        let MemoryTxn {
            id,
            name,
            _slot,
            staged,
        } = txn;
        self.tables.write().await.apply(staged);
        tracing::trace!(txn = id, name, "memory transaction committed");
        Ok(())
    }

    async fn abort(&self, txn: MemoryTxn) -> Result<(), StoreError> {
        tracing::trace!(txn = txn.id, name = txn.name, "memory transaction aborted");
        drop(txn);
        Ok(())
    }

    async fn get_stock(&self, txn: &mut MemoryTxn, symbol: &str) -> Result<Option<Stock>, StoreError> {
        let committed = self.tables.read().await;
        Ok(MemoryTxn::lookup(&txn.staged.stocks, &committed.stocks, symbol).cloned())
    }

    async fn get_account(
        &self,
        txn: &mut MemoryTxn,
        account_id: &str,
        _lock: LockMode,
    ) -> Result<Option<Account>, StoreError> {
        let committed = self.tables.read().await;
        Ok(MemoryTxn::lookup(&txn.staged.accounts, &committed.accounts, account_id).cloned())
    }

    async fn get_quote(
        &self,
        txn: &mut MemoryTxn,
        symbol: &str,
        _lock: LockMode,
    ) -> Result<Option<Quote>, StoreError> {
        let committed = self.tables.read().await;
        Ok(MemoryTxn::lookup(&txn.staged.quotes, &committed.quotes, symbol).cloned())
    }

    async fn get_portfolio(
        &self,
        txn: &mut MemoryTxn,
        portfolio_id: &str,
        _lock: LockMode,
    ) -> Result<Option<Portfolio>, StoreError> {
        let committed = self.tables.read().await;
        Ok(
            MemoryTxn::lookup(&txn.staged.portfolios, &committed.portfolios, portfolio_id)
                .cloned(),
        )
    }

    async fn scan_portfolios_by_account(
        &self,
        txn: &mut MemoryTxn,
        account_id: &str,
        _lock: LockMode,
    ) -> Result<Vec<Portfolio>, StoreError> {
        let committed = self.tables.read().await;
        let mut ids: BTreeSet<&String> = committed
            .portfolios_by_account
            .get(account_id)
            .map(|ids| ids.iter().collect())
            .unwrap_or_default();
        ids.extend(
            txn.staged
                .portfolios
                .values()
                .filter(|p| p.account_id == account_id)
                .map(|p| &p.portfolio_id),
        );

        let rows = ids
            .into_iter()
            .filter_map(|id| MemoryTxn::lookup(&txn.staged.portfolios, &committed.portfolios, id))
            .filter(|p| p.account_id == account_id)
            .cloned()
            .collect();
        Ok(rows)
    }

    async fn scan_stocks(&self, txn: &mut MemoryTxn) -> Result<Vec<Stock>, StoreError> {
        let committed = self.tables.read().await;
        let mut stocks = committed.stocks.clone();
        stocks.extend(txn.staged.stocks.clone());
        Ok(stocks.into_values().collect())
    }

    async fn put_stock(
        &self,
        txn: &mut MemoryTxn,
        stock: &Stock,
        policy: PutPolicy,
    ) -> Result<(), StoreError> {
        let committed = self.tables.read().await;
        let exists = MemoryTxn::exists(&txn.staged.stocks, &committed.stocks, &stock.symbol);
        check_policy(exists, policy, Table::Stocks, &stock.symbol)?;
        txn.staged.stocks.insert(stock.symbol.clone(), stock.clone());
        Ok(())
    }

    async fn put_account(
        &self,
        txn: &mut MemoryTxn,
        account: &Account,
        policy: PutPolicy,
    ) -> Result<(), StoreError> {
        let committed = self.tables.read().await;
        let exists =
            MemoryTxn::exists(&txn.staged.accounts, &committed.accounts, &account.account_id);
        check_policy(exists, policy, Table::Accounts, &account.account_id)?;
        txn.staged
            .accounts
            .insert(account.account_id.clone(), account.clone());
        Ok(())
    }

    async fn put_currency(
        &self,
        txn: &mut MemoryTxn,
        currency: &Currency,
        policy: PutPolicy,
    ) -> Result<(), StoreError> {
        let committed = self.tables.read().await;
        let key = &currency.currency_symbol;
        let exists = MemoryTxn::exists(&txn.staged.currencies, &committed.currencies, key);
        check_policy(exists, policy, Table::Currencies, key)?;
        txn.staged.currencies.insert(key.clone(), currency.clone());
        Ok(())
    }

    async fn put_quote(
        &self,
        txn: &mut MemoryTxn,
        quote: &Quote,
        policy: PutPolicy,
    ) -> Result<(), StoreError> {
        let committed = self.tables.read().await;
        let exists = MemoryTxn::exists(&txn.staged.quotes, &committed.quotes, &quote.symbol);
        check_policy(exists, policy, Table::Quotes, &quote.symbol)?;
        txn.staged.quotes.insert(quote.symbol.clone(), quote.clone());
        Ok(())
    }

    async fn put_portfolio(
        &self,
        txn: &mut MemoryTxn,
        portfolio: &Portfolio,
        policy: PutPolicy,
    ) -> Result<(), StoreError> {
        let committed = self.tables.read().await;
        let key = &portfolio.portfolio_id;
        let exists = MemoryTxn::exists(&txn.staged.portfolios, &committed.portfolios, key);
        check_policy(exists, policy, Table::Portfolios, key)?;
        txn.staged.portfolios.insert(key.clone(), portfolio.clone());
        Ok(())
    }

    async fn stat(&self, table: Table) -> Result<TableStats, StoreError> {
        let tables = self.tables.read().await;
        Ok(TableStats {
            rows: tables.rows(table),
        })
    }

    async fn max_portfolio_number(&self) -> Result<Option<u64>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .portfolios
            .keys()
            .filter_map(|id| id.parse::<u64>().ok())
            .max())
    }
}
