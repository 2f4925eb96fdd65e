//! Synthetic multi-client workload against a `Ledger`.
//!
//! Each client runs a fixed number of randomly chosen transactions over random
//! accounts and symbols. Failed transactions are counted by error kind and
//! never retried.

use crate::error::{ErrorKind, LedgerError};
use crate::ledger::Ledger;
use configuration::WorkloadSettings;
use core_types::{CoreError, OrderTicket};
use database::LedgerStore;
use futures::future::join_all;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

const MAX_PRICE: i64 = 100;
const MAX_AMOUNT: i64 = 20;

/// The transaction types a workload client chooses from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TxnKind {
    Purchase,
    Sell,
    RefreshQuotes,
    ViewPortfolios,
    ViewQuotes,
}

impl TxnKind {
    pub const ALL: [TxnKind; 5] = [
        TxnKind::Purchase,
        TxnKind::Sell,
        TxnKind::RefreshQuotes,
        TxnKind::ViewPortfolios,
        TxnKind::ViewQuotes,
    ];
}

impl fmt::Display for TxnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TxnKind::Purchase => "purchase",
            TxnKind::Sell => "sell",
            TxnKind::RefreshQuotes => "refresh quotes",
            TxnKind::ViewPortfolios => "view portfolios",
            TxnKind::ViewQuotes => "view quotes",
        };
        f.write_str(name)
    }
}

/// Committed and failed counts of one transaction kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KindTally {
    pub committed: u64,
    pub failed: BTreeMap<ErrorKind, u64>,
}

impl KindTally {
    pub fn failed_total(&self) -> u64 {
        self.failed.values().sum()
    }
}

#[derive(Debug, Clone, Default)]
pub struct WorkloadReport {
    pub by_txn: BTreeMap<TxnKind, KindTally>,
    pub elapsed: Duration,
}

impl WorkloadReport {
    fn record(&mut self, kind: TxnKind, outcome: Result<(), ErrorKind>) {
        let tally = self.by_txn.entry(kind).or_default();
        match outcome {
            Ok(()) => tally.committed += 1,
            Err(error) => *tally.failed.entry(error).or_default() += 1,
        }
    }

    fn merge(&mut self, other: WorkloadReport) {
        for (kind, theirs) in other.by_txn {
            let ours = self.by_txn.entry(kind).or_default();
            ours.committed += theirs.committed;
            for (error, count) in theirs.failed {
                *ours.failed.entry(error).or_default() += count;
            }
        }
    }

    pub fn committed(&self) -> u64 {
        self.by_txn.values().map(|t| t.committed).sum()
    }

    pub fn failed(&self) -> u64 {
        self.by_txn.values().map(KindTally::failed_total).sum()
    }

    /// Failures of every transaction kind, by error kind.
    pub fn failures_by_kind(&self) -> BTreeMap<ErrorKind, u64> {
        let mut totals = BTreeMap::new();
        for tally in self.by_txn.values() {
            for (error, count) in &tally.failed {
                *totals.entry(*error).or_default() += count;
            }
        }
        totals
    }

    pub fn transactions(&self) -> u64 {
        self.committed() + self.failed()
    }
}

pub struct Workload {
    settings: WorkloadSettings,
    accounts: Arc<Vec<String>>,
    symbols: Arc<Vec<String>>,
}

impl Workload {
    pub fn new(
        settings: WorkloadSettings,
        accounts: Vec<String>,
        symbols: Vec<String>,
    ) -> Result<Self, LedgerError> {
        if accounts.is_empty() || symbols.is_empty() {
            return Err(CoreError::InvalidInput(
                "workload".to_string(),
                "needs at least one account and one symbol".to_string(),
            )
            .into());
        }
        Ok(Self {
            settings,
            accounts: Arc::new(accounts),
            symbols: Arc::new(symbols),
        })
    }

    pub fn total_transactions(&self) -> u64 {
        (self.settings.clients * self.settings.transactions_per_client) as u64
    }

    pub async fn run<S: LedgerStore>(&self, ledger: &Ledger<S>) -> WorkloadReport {
        self.run_with(ledger, || {}).await
    }

    /// Runs every client to completion, calling `on_transaction` after each
    /// finished transaction, committed or not.
    pub async fn run_with<S, F>(&self, ledger: &Ledger<S>, on_transaction: F) -> WorkloadReport
    where
        S: LedgerStore,
        F: Fn() + Send + Sync + 'static,
    {
        let started = Instant::now();
        let on_transaction = Arc::new(on_transaction);

        let clients = (0..self.settings.clients).map(|index| {
            let client = Client {
                ledger: ledger.clone(),
                accounts: Arc::clone(&self.accounts),
                symbols: Arc::clone(&self.symbols),
                batch_size: self.settings.batch_size,
                rng: match self.settings.seed {
                    Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(index as u64)),
                    None => StdRng::from_entropy(),
                },
            };
            let transactions = self.settings.transactions_per_client;
            let on_transaction = Arc::clone(&on_transaction);
            tokio::spawn(async move { client.run(transactions, on_transaction.as_ref()).await })
        });

        let mut report = WorkloadReport::default();
        for joined in join_all(clients).await {
            match joined {
                Ok(client_report) => report.merge(client_report),
                Err(e) => tracing::error!(error = %e, "workload client panicked"),
            }
        }
        report.elapsed = started.elapsed();
        tracing::info!(
            committed = report.committed(),
            failed = report.failed(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "workload finished"
        );
        report
    }
}

struct Client<S: LedgerStore> {
    ledger: Ledger<S>,
    accounts: Arc<Vec<String>>,
    symbols: Arc<Vec<String>>,
    batch_size: usize,
    rng: StdRng,
}

impl<S: LedgerStore> Client<S> {
    async fn run<F: Fn()>(mut self, transactions: usize, on_transaction: &F) -> WorkloadReport {
        let mut report = WorkloadReport::default();
        for _ in 0..transactions {
            let kind = TxnKind::ALL[self.rng.gen_range(0..TxnKind::ALL.len())];
            let outcome = self.execute(kind).await;
            if let Err(error) = &outcome {
                tracing::debug!(%kind, %error, "workload transaction failed");
            }
            report.record(kind, outcome.map_err(|e| e.kind()));
            on_transaction();
        }
        report
    }

    async fn execute(&mut self, kind: TxnKind) -> Result<(), LedgerError> {
        match kind {
            TxnKind::Purchase => {
                let tickets = self.tickets();
                self.ledger.place_orders(&tickets, None).await.map(drop)
            }
            TxnKind::Sell => {
                let tickets = self.tickets();
                self.ledger.sell_orders(&tickets, None).await.map(drop)
            }
            TxnKind::RefreshQuotes => {
                let symbols = self.sample(Pool::Symbols);
                self.ledger.refresh_quotes(&symbols, None).await.map(drop)
            }
            TxnKind::ViewPortfolios => {
                let accounts = self.sample(Pool::Accounts);
                self.ledger.view_portfolios(&accounts, None).await.map(drop)
            }
            TxnKind::ViewQuotes => {
                let symbols = self.sample(Pool::Symbols);
                self.ledger.view_quotes(&symbols, None).await.map(drop)
            }
        }
    }

    fn tickets(&mut self) -> Vec<OrderTicket> {
        (0..self.batch_size)
            .map(|_| {
                OrderTicket::new(
                    one_of(&mut self.rng, &self.accounts),
                    one_of(&mut self.rng, &self.symbols),
                    Decimal::from(self.rng.gen_range(1..=MAX_PRICE)),
                    self.rng.gen_range(1..=MAX_AMOUNT),
                )
            })
            .collect()
    }

    fn sample(&mut self, pool: Pool) -> Vec<String> {
        let pool = match pool {
            Pool::Accounts => &self.accounts,
            Pool::Symbols => &self.symbols,
        };
        (0..self.batch_size)
            .map(|_| one_of(&mut self.rng, pool))
            .collect()
    }
}

enum Pool {
    Accounts,
    Symbols,
}

fn one_of(rng: &mut StdRng, pool: &[String]) -> String {
    pool.choose(rng).cloned().unwrap_or_default()
}
