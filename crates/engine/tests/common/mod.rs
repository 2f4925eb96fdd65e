#![allow(dead_code)]

use core_types::{Account, Portfolio, Quote, Stock};
use database::{LedgerStore, MemoryStore, PutPolicy};
use engine::{AtomicIdAllocator, IdAllocator, Ledger, PriceWalk};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;

/// A walk that always steps the same way.
pub struct FixedWalk(pub bool);

impl PriceWalk for FixedWalk {
    fn step_up(&self) -> bool {
        self.0
    }
}

/// Hands out the same id every time.
pub struct StuckIds(pub &'static str);

impl IdAllocator for StuckIds {
    fn next_id(&self) -> String {
        self.0.to_string()
    }
}

pub const ACCOUNTS: [&str; 3] = ["A1", "A2", "A3"];

/// IBM at 100, MSFT at 50, ORCL at 20.
pub fn default_quotes() -> Vec<(&'static str, Decimal)> {
    vec![("IBM", dec!(100)), ("MSFT", dec!(50)), ("ORCL", dec!(20))]
}

pub async fn seed_store(store: &MemoryStore, quotes: &[(&str, Decimal)]) -> anyhow::Result<()> {
    let mut txn = store.begin("SEED").await?;
    for account in ACCOUNTS {
        store
            .put_account(&mut txn, &Account::with_id(account), PutPolicy::NoOverwrite)
            .await?;
    }
    for (symbol, price) in quotes {
        let stock = Stock {
            symbol: symbol.to_string(),
            full_name: format!("{symbol} Inc."),
        };
        store.put_stock(&mut txn, &stock, PutPolicy::NoOverwrite).await?;
        store
            .put_quote(&mut txn, &Quote::at_price(*symbol, *price), PutPolicy::NoOverwrite)
            .await?;
    }
    store.commit(txn).await?;
    Ok(())
}

pub async fn ledger_with(
    store: MemoryStore,
    ids: Arc<dyn IdAllocator>,
    walk: Arc<dyn PriceWalk>,
) -> anyhow::Result<Ledger<MemoryStore>> {
    seed_store(&store, &default_quotes()).await?;
    Ok(Ledger::with_parts(store, ids, walk))
}

/// Three accounts and three quoted symbols, ids from 1, walks stepping up.
pub async fn ledger() -> anyhow::Result<Ledger<MemoryStore>> {
    ledger_with(
        MemoryStore::default(),
        Arc::new(AtomicIdAllocator::default()),
        Arc::new(FixedWalk(true)),
    )
    .await
}

pub fn short_timeout_store() -> MemoryStore {
    MemoryStore::new(Duration::from_millis(50))
}

pub fn symbols() -> Vec<String> {
    default_quotes().into_iter().map(|(s, _)| s.to_string()).collect()
}

pub fn accounts() -> Vec<String> {
    ACCOUNTS.iter().map(|a| a.to_string()).collect()
}

/// Every portfolio row and quote, for before/after comparisons.
#[derive(Debug, PartialEq, Eq)]
pub struct Snapshot {
    pub portfolios: Vec<Portfolio>,
    pub quotes: Vec<Quote>,
}

pub async fn snapshot(ledger: &Ledger<MemoryStore>) -> anyhow::Result<Snapshot> {
    Ok(Snapshot {
        portfolios: ledger.view_portfolios(&accounts(), None).await?,
        quotes: ledger.view_quotes(&symbols(), None).await?,
    })
}
