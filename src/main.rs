use anyhow::Context;
use clap::{Parser, Subcommand};
use comfy_table::{Table as TextTable, presets::UTF8_FULL};
use configuration::{LedgerConfig, StoreBackend, load_config};
use core_types::OrderRequest;
use database::{LedgerStore, MemoryStore, PgStore, Table};
use engine::{Ledger, OrderReceipt, PriceUpdate, Workload, WorkloadReport};
use indicatif::{ProgressBar, ProgressStyle};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rust_decimal::Decimal;
use std::path::PathBuf;

/// Accounts and symbols created when no data files are available.
const SYNTHETIC_ACCOUNTS: usize = 100;
const SYNTHETIC_SYMBOLS: usize = 50;

/// The entry point for the trading ledger.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(backend) = cli.backend {
        config.store.backend = backend;
    }

    // Held for the life of the program so the file writer flushes on exit.
    let _log_guard = configuration::init_logging(&config.logging)?;
    tracing::debug!(?config, "configuration loaded");

    let command = match cli.command {
        Commands::Bench(args) => return handle_bench(args, &config).await,
        other => other,
    };

    match config.store.backend {
        StoreBackend::Memory => {
            let store = MemoryStore::new(config.store.lock_timeout());
            // The embedded store starts empty in every process.
            if !matches!(command, Commands::Load(_)) {
                let accounts = seed_memory(&store, &config).await?;
                tracing::info!(accounts = accounts.len(), "embedded store seeded");
            }
            execute(store, command, &config).await
        }
        StoreBackend::Postgres => {
            let store = PgStore::connect(&config.store)
                .await
                .context("failed to connect to the ledger database")?;
            execute(store, command, &config).await
        }
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// A transactional trading ledger: orders, quotes and portfolios.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (defaults to ./ledger.toml when present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Overrides `store.backend` from the configuration.
    #[arg(long, global = true, value_enum)]
    backend: Option<StoreBackend>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load accounts, stocks, currencies and quotes from the data files.
    Load(LoadArgs),
    /// Buy shares for an account.
    Buy(OrderArgs),
    /// Sell shares from an account's portfolio.
    Sell(OrderArgs),
    /// Show the current quotes of one or more symbols.
    Quote {
        #[arg(required = true)]
        symbols: Vec<String>,
    },
    /// Move quote prices by a random step, or set one exactly with --price.
    Refresh(RefreshArgs),
    /// Show an account's portfolio rows.
    Portfolio {
        account: String,
        /// Show only the row for this symbol.
        #[arg(long)]
        symbol: Option<String>,
    },
    /// Show the row count of every table.
    Stats,
    /// Run the concurrent synthetic workload against a fresh embedded store.
    Bench(BenchArgs),
}

#[derive(Parser)]
struct LoadArgs {
    /// Directory with the data files. Defaults to `loader.datafiles_dir`.
    #[arg(long)]
    dir: Option<PathBuf>,

    /// Synthetic portfolio rows to create after the load.
    #[arg(long)]
    portfolios: Option<usize>,
}

#[derive(Parser)]
struct OrderArgs {
    account: String,
    symbol: String,

    /// Limit price: the ceiling for a buy, the floor for a sell.
    #[arg(long)]
    price: Decimal,

    #[arg(long)]
    amount: i64,

    /// Record a pending intent instead of executing against the quote.
    #[arg(long)]
    deferred: bool,
}

impl OrderArgs {
    fn request(&self) -> OrderRequest {
        let (account, symbol) = (self.account.as_str(), self.symbol.as_str());
        if self.deferred {
            OrderRequest::deferred(account, symbol, self.price, self.amount)
        } else {
            OrderRequest::immediate(account, symbol, self.price, self.amount)
        }
    }
}

#[derive(Parser)]
struct RefreshArgs {
    #[arg(required = true)]
    symbols: Vec<String>,

    /// Set this exact price instead of walking (one symbol only).
    #[arg(long)]
    price: Option<Decimal>,
}

#[derive(Parser)]
struct BenchArgs {
    #[arg(long)]
    clients: Option<usize>,

    #[arg(long)]
    transactions: Option<usize>,

    #[arg(long)]
    batch_size: Option<usize>,

    #[arg(long)]
    seed: Option<u64>,

    /// Use a synthetic seed even when the data files exist.
    #[arg(long)]
    synthetic: bool,
}

// ==============================================================================
// Command Logic
// ==============================================================================

async fn execute<S: LedgerStore>(
    store: S,
    command: Commands,
    config: &LedgerConfig,
) -> anyhow::Result<()> {
    let command = match command {
        Commands::Load(args) => return handle_load(store, &args, config).await,
        Commands::Bench(_) => anyhow::bail!("bench always runs on a fresh embedded store"),
        other => other,
    };

    let ledger = Ledger::open(store).await?;
    match command {
        Commands::Buy(args) => {
            let receipt = ledger.place_order(&args.request(), None).await?;
            print_receipt("buy", &args, &receipt);
        }
        Commands::Sell(args) => {
            let receipt = ledger.sell_stocks(&args.request(), None).await?;
            print_receipt("sell", &args, &receipt);
        }
        Commands::Quote { symbols } => {
            let quotes = ledger.view_quotes(&symbols, None).await?;
            print_quotes(&quotes);
        }
        Commands::Refresh(args) => {
            let quotes = match (args.price, args.symbols.as_slice()) {
                (Some(price), [symbol]) => {
                    vec![ledger.set_price(symbol, PriceUpdate::Set(price), None).await?]
                }
                (Some(_), _) => anyhow::bail!("--price sets exactly one symbol"),
                (None, symbols) => ledger.refresh_quotes(symbols, None).await?,
            };
            print_quotes(&quotes);
        }
        Commands::Portfolio { account, symbol } => {
            let rows = match symbol {
                Some(symbol) => ledger
                    .find_portfolio(&account, &symbol, None)
                    .await?
                    .into_iter()
                    .collect(),
                None => ledger.find_portfolios_for_account(&account, None).await?,
            };
            print_portfolios(&rows);
        }
        Commands::Stats => print_stats(ledger.store()).await?,
        Commands::Load(_) | Commands::Bench(_) => {}
    }
    Ok(())
}

async fn handle_load<S: LedgerStore>(
    store: S,
    args: &LoadArgs,
    config: &LedgerConfig,
) -> anyhow::Result<()> {
    let dir = args.dir.as_ref().unwrap_or(&config.loader.datafiles_dir);
    let summary = loader::load_initial(&store, dir, config.loader.initial_quote_price)
        .await
        .with_context(|| format!("failed to load data files from {}", dir.display()))?;
    println!(
        "Loaded {} accounts, {} stocks, {} currencies and {} quotes.",
        summary.accounts, summary.stocks, summary.currencies, summary.quotes
    );

    let count = args.portfolios.unwrap_or(config.loader.seed_portfolios);
    if count > 0 {
        let accounts: Vec<String> = loader::read_accounts(dir)?
            .into_iter()
            .map(|a| a.account_id)
            .collect();
        let ledger = Ledger::open(store).await?;
        let symbols = ledger.list_symbols(None).await?;
        let mut rng = StdRng::from_entropy();
        let created =
            loader::populate_portfolios(&ledger, &accounts, &symbols, count, &mut rng).await?;
        println!("Created {created} portfolio rows.");
    }
    Ok(())
}

/// Fills an embedded store from the data files, or synthetically when the
/// data directory does not exist. Returns the seeded account ids.
async fn seed_memory(store: &MemoryStore, config: &LedgerConfig) -> anyhow::Result<Vec<String>> {
    let dir = &config.loader.datafiles_dir;
    let price = config.loader.initial_quote_price;
    if dir.is_dir() {
        loader::load_initial(store, dir, price).await?;
        Ok(loader::read_accounts(dir)?
            .into_iter()
            .map(|a| a.account_id)
            .collect())
    } else {
        tracing::info!(dir = %dir.display(), "no data files, seeding synthetically");
        loader::seed_synthetic(store, SYNTHETIC_ACCOUNTS, SYNTHETIC_SYMBOLS, price).await?;
        Ok((1..=SYNTHETIC_ACCOUNTS).map(|n| n.to_string()).collect())
    }
}

async fn handle_bench(args: BenchArgs, config: &LedgerConfig) -> anyhow::Result<()> {
    let mut settings = config.workload.clone();
    settings.clients = args.clients.unwrap_or(settings.clients);
    settings.transactions_per_client = args.transactions.unwrap_or(settings.transactions_per_client);
    settings.batch_size = args.batch_size.unwrap_or(settings.batch_size).max(1);
    settings.seed = args.seed.or(settings.seed);

    let store = MemoryStore::new(config.store.lock_timeout());
    let accounts = if args.synthetic {
        let price = config.loader.initial_quote_price;
        loader::seed_synthetic(&store, SYNTHETIC_ACCOUNTS, SYNTHETIC_SYMBOLS, price).await?;
        (1..=SYNTHETIC_ACCOUNTS).map(|n| n.to_string()).collect()
    } else {
        seed_memory(&store, config).await?
    };

    let ledger = Ledger::open(store).await?;
    let symbols = ledger.list_symbols(None).await?;
    let mut rng = match settings.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    loader::populate_portfolios(
        &ledger,
        &accounts,
        &symbols,
        config.loader.seed_portfolios,
        &mut rng,
    )
    .await?;

    let workload = Workload::new(settings, accounts, symbols)?;
    let progress_bar = ProgressBar::new(workload.total_transactions());
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec}) {msg}")?
            .progress_chars("#>-"),
    );

    let pb = progress_bar.clone();
    let report = workload.run_with(&ledger, move || pb.inc(1)).await;
    progress_bar.finish_with_message("Workload complete!");

    print_report(&report);
    Ok(())
}

// ==============================================================================
// Output
// ==============================================================================

fn text_table(header: Vec<&str>) -> TextTable {
    let mut table = TextTable::new();
    table.load_preset(UTF8_FULL).set_header(header);
    table
}

fn print_receipt(side: &str, args: &OrderArgs, receipt: &OrderReceipt) {
    println!(
        "{side} {} x {} for account {}: {:?}, portfolio {} now holds {}{}",
        args.amount,
        args.symbol,
        args.account,
        receipt.status,
        receipt.portfolio_id,
        receipt.hold_stocks,
        if receipt.created { " (new)" } else { "" },
    );
}

fn print_quotes(quotes: &[core_types::Quote]) {
    let mut table = text_table(vec!["Symbol", "Price", "Low", "High", "Bid", "Ask", "Volume"]);
    for q in quotes {
        table.add_row(vec![
            q.symbol.clone(),
            q.current_price.to_string(),
            q.low_price_day.to_string(),
            q.high_price_day.to_string(),
            q.bid.to_string(),
            q.ask.to_string(),
            q.trade_volume.to_string(),
        ]);
    }
    println!("{table}");
}

fn print_portfolios(rows: &[core_types::Portfolio]) {
    let mut table = text_table(vec![
        "Portfolio", "Account", "Symbol", "Held", "Pending buy", "Pending sell",
    ]);
    for p in rows {
        let pending = |flag: bool, amount: i64, price: Decimal| {
            if flag {
                format!("{amount} @ {price}")
            } else {
                "-".to_string()
            }
        };
        table.add_row(vec![
            p.portfolio_id.clone(),
            p.account_id.clone(),
            p.symbol.clone(),
            p.hold_stocks.to_string(),
            pending(p.to_buy, p.number_buy, p.price_buy),
            pending(p.to_sell, p.number_sell, p.price_sell),
        ]);
    }
    println!("{table}");
}

async fn print_stats<S: LedgerStore>(store: &S) -> anyhow::Result<()> {
    let mut table = text_table(vec!["Table", "Rows"]);
    for t in Table::ALL {
        table.add_row(vec![t.to_string(), store.stat(t).await?.rows.to_string()]);
    }
    println!("{table}");
    Ok(())
}

fn print_report(report: &WorkloadReport) {
    let mut table = text_table(vec!["Transaction", "Committed", "Failed", "Failures by kind"]);
    for (kind, tally) in &report.by_txn {
        let failures = tally
            .failed
            .iter()
            .map(|(error, count)| format!("{error}: {count}"))
            .collect::<Vec<_>>()
            .join(", ");
        table.add_row(vec![
            kind.to_string(),
            tally.committed.to_string(),
            tally.failed_total().to_string(),
            failures,
        ]);
    }
    println!("{table}");

    let seconds = report.elapsed.as_secs_f64();
    let throughput = if seconds > 0.0 {
        report.committed() as f64 / seconds
    } else {
        0.0
    };
    println!(
        "{} transactions in {seconds:.2}s: {} committed, {} failed ({throughput:.0} committed/s)",
        report.transactions(),
        report.committed(),
        report.failed(),
    );
}
