use crate::error::LoaderError;
use crate::files;
use core_types::{Account, Currency, OrderRequest, Quote, Stock};
use database::{LedgerStore, PutPolicy, StoreError, Table};
use engine::Ledger;
use rand::Rng;
use rand::seq::SliceRandom;
use rust_decimal::Decimal;
use std::path::Path;

/// Row counts written by a load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub accounts: usize,
    pub stocks: usize,
    pub currencies: usize,
    pub quotes: usize,
}

async fn finish<S: LedgerStore>(
    store: &S,
    txn: S::Txn,
    result: Result<(), StoreError>,
) -> Result<(), StoreError> {
    match result {
        Ok(()) => store.commit(txn).await,
        Err(error) => {
            tracing::warn!(%error, "aborting load transaction");
            if let Err(abort_error) = store.abort(txn).await {
                tracing::error!(%abort_error, "load transaction abort failed");
            }
            Err(error)
        }
    }
}

async fn ensure_empty<S: LedgerStore>(store: &S) -> Result<(), LoaderError> {
    if store.stat(Table::Stocks).await?.rows > 0 {
        return Err(LoaderError::AlreadyLoaded);
    }
    Ok(())
}

/// Writes reference data and quotes, one transaction per table. Every row is
/// inserted without overwrite, so a duplicate key aborts that table's load.
pub async fn write_seed<S: LedgerStore>(
    store: &S,
    accounts: &[Account],
    stocks: &[Stock],
    currencies: &[Currency],
    quotes: &[Quote],
) -> Result<LoadSummary, LoaderError> {
    ensure_empty(store).await?;

    let mut txn = store.begin("LOAD_ACCOUNTS").await?;
    let result = async {
        for account in accounts {
            store.put_account(&mut txn, account, PutPolicy::NoOverwrite).await?;
        }
        Ok::<(), StoreError>(())
    }
    .await;
    finish(store, txn, result).await?;
    tracing::info!(rows = accounts.len(), "accounts loaded");

    let mut txn = store.begin("LOAD_STOCKS").await?;
    let result = async {
        for stock in stocks {
            store.put_stock(&mut txn, stock, PutPolicy::NoOverwrite).await?;
        }
        Ok::<(), StoreError>(())
    }
    .await;
    finish(store, txn, result).await?;
    tracing::info!(rows = stocks.len(), "stocks loaded");

    let mut txn = store.begin("LOAD_CURRENCIES").await?;
    let result = async {
        for currency in currencies {
            store.put_currency(&mut txn, currency, PutPolicy::NoOverwrite).await?;
        }
        Ok::<(), StoreError>(())
    }
    .await;
    finish(store, txn, result).await?;
    tracing::info!(rows = currencies.len(), "currencies loaded");

    let mut txn = store.begin("LOAD_QUOTES").await?;
    let result = async {
        for quote in quotes {
            store.put_quote(&mut txn, quote, PutPolicy::NoOverwrite).await?;
        }
        Ok::<(), StoreError>(())
    }
    .await;
    finish(store, txn, result).await?;
    tracing::info!(rows = quotes.len(), "quotes loaded");

    Ok(LoadSummary {
        accounts: accounts.len(),
        stocks: stocks.len(),
        currencies: currencies.len(),
        quotes: quotes.len(),
    })
}

/// Loads the four data files of `dir` into an empty ledger. Every quote starts
/// at `initial_price` whatever the file says.
pub async fn load_initial<S: LedgerStore>(
    store: &S,
    dir: &Path,
    initial_price: Decimal,
) -> Result<LoadSummary, LoaderError> {
    ensure_empty(store).await?;

    let accounts = files::read_accounts(dir)?;
    let stocks = files::read_stocks(dir)?;
    let currencies = files::read_currencies(dir)?;
    let mut quotes = files::read_quotes(dir)?;
    for quote in &mut quotes {
        quote.current_price = initial_price;
    }
    tracing::debug!(dir = %dir.display(), "data files parsed");

    write_seed(store, &accounts, &stocks, &currencies, &quotes).await
}

/// Seeds an empty ledger without data files: accounts `1..=accounts` and
/// symbols `S1..=S<symbols>`, every quote at `initial_price`.
pub async fn seed_synthetic<S: LedgerStore>(
    store: &S,
    accounts: usize,
    symbols: usize,
    initial_price: Decimal,
) -> Result<LoadSummary, LoaderError> {
    let accounts: Vec<Account> = (1..=accounts)
        .map(|n| Account::with_id(n.to_string()))
        .collect();
    let stocks: Vec<Stock> = (1..=symbols)
        .map(|n| Stock {
            symbol: format!("S{n}"),
            full_name: format!("Synthetic Company {n}"),
        })
        .collect();
    let quotes: Vec<Quote> = stocks
        .iter()
        .map(|s| Quote::at_price(s.symbol.clone(), initial_price))
        .collect();
    write_seed(store, &accounts, &stocks, &[], &quotes).await
}

/// Creates up to `count` portfolio rows for random (account, symbol) pairs,
/// each holding 1 to 100 shares with no pending intents. Pairs that already
/// have a row are skipped. Returns the number of rows created.
pub async fn populate_portfolios<S, R>(
    ledger: &Ledger<S>,
    accounts: &[String],
    symbols: &[String],
    count: usize,
    rng: &mut R,
) -> Result<usize, LoaderError>
where
    S: LedgerStore,
    R: Rng + Send,
{
    let mut created = 0;
    for _ in 0..count {
        let (Some(account), Some(symbol)) = (accounts.choose(rng), symbols.choose(rng)) else {
            break;
        };
        let hold = rng.gen_range(1..=100);

        let mut txn = ledger.begin("POPULATE_TXN").await?;
        if ledger
            .find_portfolio(account, symbol, Some(&mut txn))
            .await?
            .is_some()
        {
            ledger.abort(txn).await?;
            continue;
        }
        // No ceiling: seeding ignores the market price.
        let request = OrderRequest::immediate(account.as_str(), symbol.as_str(), Decimal::MAX, hold);
        match ledger.place_order(&request, Some(&mut txn)).await {
            Ok(_) => {
                ledger.commit(txn).await?;
                created += 1;
            }
            Err(error) => {
                ledger.abort(txn).await?;
                return Err(error.into());
            }
        }
    }
    tracing::info!(created, requested = count, "portfolios populated");
    Ok(created)
}
