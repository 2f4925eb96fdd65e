use crate::envelope::Transaction;
use crate::error::LedgerError;
use crate::identity;
use crate::ids::{AtomicIdAllocator, IdAllocator};
use crate::orders::{self, OrderReceipt};
use crate::portfolio_index;
use crate::quotes::{self, PriceUpdate, PriceWalk, RandomPriceWalk};
use core_types::{OrderRequest, OrderTicket, Portfolio, Quote};
use database::{LedgerStore, LockMode, Table};
use std::sync::Arc;
use tracing::instrument;

const PURCHASE_TXN: &str = "PURCHASE_TXN";
const SELL_TXN: &str = "SELL_TXN";
const REFRESH_STOCK_TXN: &str = "REFRESH_STOCK_TXN";
const VIEW_QUOTE_TXN: &str = "VIEW_QUOTE_TXN";
const VIEW_PORTFOLIO_TXN: &str = "VIEW_PORTFOLIO_TXN";

/// The public face of the trading ledger.
///
/// Every operation takes an optional transaction. When given, the operation
/// runs inside it and leaves commit or abort to the caller; otherwise it opens
/// its own transaction and commits on success or aborts on any failure.
/// Batch operations run their whole list in one transaction: either every
/// entry is applied or none is.
///
/// `Ledger` is cheap to clone; clones share the store, the id allocator and
/// the price walk.
pub struct Ledger<S: LedgerStore> {
    inner: Arc<Inner<S>>,
}

struct Inner<S> {
    store: S,
    ids: Arc<dyn IdAllocator>,
    walk: Arc<dyn PriceWalk>,
}

impl<S: LedgerStore> Clone for Ledger<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: LedgerStore> Ledger<S> {
    /// Opens a ledger over `store`, continuing portfolio ids after the largest
    /// one already stored.
    pub async fn open(store: S) -> Result<Self, LedgerError> {
        let max_existing = store.max_portfolio_number().await?;
        tracing::debug!(?max_existing, "seeding portfolio id allocator");
        Ok(Self::with_parts(
            store,
            Arc::new(AtomicIdAllocator::after(max_existing)),
            Arc::new(RandomPriceWalk::from_entropy()),
        ))
    }

    /// Assembles a ledger from explicit parts, e.g. a deterministic id
    /// sequence or a fixed price walk.
    pub fn with_parts(store: S, ids: Arc<dyn IdAllocator>, walk: Arc<dyn PriceWalk>) -> Self {
        Self {
            inner: Arc::new(Inner { store, ids, walk }),
        }
    }

    pub fn store(&self) -> &S {
        &self.inner.store
    }

    pub async fn begin(&self, name: &'static str) -> Result<S::Txn, LedgerError> {
        Ok(self.inner.store.begin(name).await?)
    }

    pub async fn commit(&self, txn: S::Txn) -> Result<(), LedgerError> {
        Ok(self.inner.store.commit(txn).await?)
    }

    pub async fn abort(&self, txn: S::Txn) -> Result<(), LedgerError> {
        Ok(self.inner.store.abort(txn).await?)
    }

    #[instrument(skip(self, txn), fields(account = %request.account_id, symbol = %request.symbol))]
    pub async fn place_order(
        &self,
        request: &OrderRequest,
        txn: Option<&mut S::Txn>,
    ) -> Result<OrderReceipt, LedgerError> {
        let store = &self.inner.store;
        let mut tx = Transaction::open(store, txn, PURCHASE_TXN).await?;
        let result = orders::place_order(store, tx.handle(), self.inner.ids.as_ref(), request).await;
        tx.close(store, result).await
    }

    #[instrument(skip(self, txn), fields(account = %request.account_id, symbol = %request.symbol))]
    pub async fn sell_stocks(
        &self,
        request: &OrderRequest,
        txn: Option<&mut S::Txn>,
    ) -> Result<OrderReceipt, LedgerError> {
        let store = &self.inner.store;
        let mut tx = Transaction::open(store, txn, SELL_TXN).await?;
        let result = orders::sell_stocks(store, tx.handle(), request).await;
        tx.close(store, result).await
    }

    /// Applies every ticket as an immediate buy. One rejection aborts the batch.
    #[instrument(skip(self, tickets, txn), fields(orders = tickets.len()))]
    pub async fn place_orders(
        &self,
        tickets: &[OrderTicket],
        txn: Option<&mut S::Txn>,
    ) -> Result<Vec<OrderReceipt>, LedgerError> {
        let store = &self.inner.store;
        let mut tx = Transaction::open(store, txn, PURCHASE_TXN).await?;
        let mut receipts = Vec::with_capacity(tickets.len());
        let mut result = Ok(());
        for ticket in tickets {
            let request = OrderRequest::from(ticket);
            match orders::place_order(store, tx.handle(), self.inner.ids.as_ref(), &request).await {
                Ok(receipt) => receipts.push(receipt),
                Err(e) => {
                    result = Err(e);
                    break;
                }
            }
        }
        let owned = tx.is_owned();
        let receipts = tx.close(store, result.map(|()| receipts)).await?;
        if owned {
            tracing::info!(orders = receipts.len(), "purchase batch committed");
        }
        Ok(receipts)
    }

    /// Applies every ticket as an immediate sell. One rejection aborts the batch.
    #[instrument(skip(self, tickets, txn), fields(orders = tickets.len()))]
    pub async fn sell_orders(
        &self,
        tickets: &[OrderTicket],
        txn: Option<&mut S::Txn>,
    ) -> Result<Vec<OrderReceipt>, LedgerError> {
        let store = &self.inner.store;
        let mut tx = Transaction::open(store, txn, SELL_TXN).await?;
        let mut receipts = Vec::with_capacity(tickets.len());
        let mut result = Ok(());
        for ticket in tickets {
            let request = OrderRequest::from(ticket);
            match orders::sell_stocks(store, tx.handle(), &request).await {
                Ok(receipt) => receipts.push(receipt),
                Err(e) => {
                    result = Err(e);
                    break;
                }
            }
        }
        let owned = tx.is_owned();
        let receipts = tx.close(store, result.map(|()| receipts)).await?;
        if owned {
            tracing::info!(orders = receipts.len(), "sell batch committed");
        }
        Ok(receipts)
    }

    #[instrument(skip(self, txn))]
    pub async fn get_quote(
        &self,
        symbol: &str,
        lock_for_update: bool,
        txn: Option<&mut S::Txn>,
    ) -> Result<Quote, LedgerError> {
        let store = &self.inner.store;
        let mut tx = Transaction::open(store, txn, VIEW_QUOTE_TXN).await?;
        let result = quotes::get_quote(store, tx.handle(), symbol, lock_for_update).await;
        tx.close(store, result).await
    }

    #[instrument(skip(self, txn))]
    pub async fn set_price(
        &self,
        symbol: &str,
        update: PriceUpdate,
        txn: Option<&mut S::Txn>,
    ) -> Result<Quote, LedgerError> {
        let store = &self.inner.store;
        let mut tx = Transaction::open(store, txn, REFRESH_STOCK_TXN).await?;
        let result =
            quotes::set_price(store, tx.handle(), self.inner.walk.as_ref(), symbol, update).await;
        tx.close(store, result).await
    }

    /// Random-walks the price of every symbol in one transaction.
    #[instrument(skip(self, symbols, txn), fields(symbols = symbols.len()))]
    pub async fn refresh_quotes(
        &self,
        symbols: &[String],
        txn: Option<&mut S::Txn>,
    ) -> Result<Vec<Quote>, LedgerError> {
        let store = &self.inner.store;
        let walk = self.inner.walk.as_ref();
        let mut tx = Transaction::open(store, txn, REFRESH_STOCK_TXN).await?;
        let mut updated = Vec::with_capacity(symbols.len());
        let mut result = Ok(());
        for symbol in symbols {
            match quotes::set_price(store, tx.handle(), walk, symbol, PriceUpdate::RandomWalk).await {
                Ok(quote) => updated.push(quote),
                Err(e) => {
                    result = Err(e);
                    break;
                }
            }
        }
        tx.close(store, result.map(|()| updated)).await
    }

    /// Reads the quotes of `symbols` in one transaction, in the given order.
    #[instrument(skip(self, symbols, txn), fields(symbols = symbols.len()))]
    pub async fn view_quotes(
        &self,
        symbols: &[String],
        txn: Option<&mut S::Txn>,
    ) -> Result<Vec<Quote>, LedgerError> {
        let store = &self.inner.store;
        let mut tx = Transaction::open(store, txn, VIEW_QUOTE_TXN).await?;
        let mut found = Vec::with_capacity(symbols.len());
        let mut result = Ok(());
        for symbol in symbols {
            match quotes::get_quote(store, tx.handle(), symbol, false).await {
                Ok(quote) => found.push(quote),
                Err(e) => {
                    result = Err(e);
                    break;
                }
            }
        }
        tx.close(store, result.map(|()| found)).await
    }

    #[instrument(skip(self, txn))]
    pub async fn find_portfolio(
        &self,
        account_id: &str,
        symbol: &str,
        txn: Option<&mut S::Txn>,
    ) -> Result<Option<Portfolio>, LedgerError> {
        let store = &self.inner.store;
        let mut tx = Transaction::open(store, txn, VIEW_PORTFOLIO_TXN).await?;
        let result = portfolio_index::find_portfolio(
            store,
            tx.handle(),
            account_id,
            symbol,
            LockMode::ReadCommitted,
        )
        .await;
        tx.close(store, result).await
    }

    /// Every portfolio row of an existing account, ordered by portfolio id.
    #[instrument(skip(self, txn))]
    pub async fn find_portfolios_for_account(
        &self,
        account_id: &str,
        txn: Option<&mut S::Txn>,
    ) -> Result<Vec<Portfolio>, LedgerError> {
        let store = &self.inner.store;
        let mut tx = Transaction::open(store, txn, VIEW_PORTFOLIO_TXN).await?;
        let result = Self::account_portfolios(store, tx.handle(), account_id).await;
        tx.close(store, result).await
    }

    /// The portfolios of several accounts in one transaction, account by
    /// account in the given order.
    #[instrument(skip(self, accounts, txn), fields(accounts = accounts.len()))]
    pub async fn view_portfolios(
        &self,
        accounts: &[String],
        txn: Option<&mut S::Txn>,
    ) -> Result<Vec<Portfolio>, LedgerError> {
        let store = &self.inner.store;
        let mut tx = Transaction::open(store, txn, VIEW_PORTFOLIO_TXN).await?;
        let mut rows = Vec::new();
        let mut result = Ok(());
        for account_id in accounts {
            match Self::account_portfolios(store, tx.handle(), account_id).await {
                Ok(found) => rows.extend(found),
                Err(e) => {
                    result = Err(e);
                    break;
                }
            }
        }
        tx.close(store, result.map(|()| rows)).await
    }

    /// Every listed symbol, in order.
    pub async fn list_symbols(&self, txn: Option<&mut S::Txn>) -> Result<Vec<String>, LedgerError> {
        let store = &self.inner.store;
        let mut tx = Transaction::open(store, txn, VIEW_QUOTE_TXN).await?;
        let result = store
            .scan_stocks(tx.handle())
            .await
            .map(|stocks| stocks.into_iter().map(|s| s.symbol).collect())
            .map_err(LedgerError::from);
        tx.close(store, result).await
    }

    /// Committed number of portfolio rows. Runs outside any transaction, so
    /// rows staged by an open one are not counted.
    pub async fn portfolio_count(&self) -> Result<u64, LedgerError> {
        Ok(self.inner.store.stat(Table::Portfolios).await?.rows)
    }

    async fn account_portfolios(
        store: &S,
        txn: &mut S::Txn,
        account_id: &str,
    ) -> Result<Vec<Portfolio>, LedgerError> {
        identity::ensure_account(store, txn, account_id, LockMode::ReadCommitted).await?;
        portfolio_index::portfolios_for_account(store, txn, account_id).await
    }
}
