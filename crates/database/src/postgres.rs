use crate::connection;
use crate::error::StoreError;
use crate::store::{LedgerStore, LockMode, PutPolicy, Table, TableStats};
use async_trait::async_trait;
use configuration::StoreSettings;
use core_types::{Account, Currency, Portfolio, Quote, Stock};
use sqlx::postgres::{PgPool, Postgres};
use sqlx::Transaction;
use std::time::Duration;

const PORTFOLIO_COLUMNS: &str = "portfolio_id, account_id, symbol, hold_stocks, to_sell, \
     number_sell, price_sell, to_buy, number_buy, price_buy";

const QUOTE_COLUMNS: &str = "symbol, current_price, trade_time, low_price_day, high_price_day, \
     perc_price_change, bid, ask, trade_volume, market_cap";

const ACCOUNT_COLUMNS: &str =
    "account_id, last_name, first_name, address, city, state, country, phone";

/// A `LedgerStore` backed by PostgreSQL.
///
/// Each ledger transaction is a database transaction at READ COMMITTED with
/// `lock_timeout` set, so a blocked row lock surfaces as
/// `StoreError::LockTimeout` instead of waiting forever.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
    lock_timeout: Duration,
}

impl PgStore {
    pub fn new(pool: PgPool, lock_timeout: Duration) -> Self {
        Self { pool, lock_timeout }
    }

    /// Opens a pool from the store settings and brings the schema up to date.
    pub async fn connect(settings: &StoreSettings) -> Result<Self, StoreError> {
        let pool = connection::connect(settings).await?;
        connection::run_migrations(&pool).await?;
        Ok(Self::new(pool, settings.lock_timeout()))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn lock_clause(lock: LockMode) -> &'static str {
    match lock {
        LockMode::ReadCommitted => "",
        LockMode::ForUpdate => " FOR UPDATE",
    }
}

#[async_trait]
impl LedgerStore for PgStore {
    type Txn = Transaction<'static, Postgres>;

    async fn begin(&self, name: &'static str) -> Result<Self::Txn, StoreError> {
        let mut txn = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL READ COMMITTED")
            .execute(&mut *txn)
            .await?;
        // SET does not take bind parameters.
        let set_timeout = format!(
            "SET LOCAL lock_timeout = '{}ms'",
            self.lock_timeout.as_millis()
        );
        sqlx::query(&set_timeout).execute(&mut *txn).await?;
        tracing::trace!(name, "postgres transaction started");
        Ok(txn)
    }

    async fn commit(&self, txn: Self::Txn) -> Result<(), StoreError> {
        txn.commit().await?;
        Ok(())
    }

    async fn abort(&self, txn: Self::Txn) -> Result<(), StoreError> {
        txn.rollback().await?;
        Ok(())
    }

    async fn get_stock(&self, txn: &mut Self::Txn, symbol: &str) -> Result<Option<Stock>, StoreError> {
        let stock = sqlx::query_as::<_, Stock>(
            "SELECT symbol, full_name FROM stocks WHERE symbol = $1",
        )
        .bind(symbol)
        .fetch_optional(&mut **txn)
        .await?;
        Ok(stock)
    }

    async fn get_account(
        &self,
        txn: &mut Self::Txn,
        account_id: &str,
        lock: LockMode,
    ) -> Result<Option<Account>, StoreError> {
        let sql = format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE account_id = $1{}",
            lock_clause(lock)
        );
        let account = sqlx::query_as::<_, Account>(&sql)
            .bind(account_id)
            .fetch_optional(&mut **txn)
            .await?;
        Ok(account)
    }

    async fn get_quote(
        &self,
        txn: &mut Self::Txn,
        symbol: &str,
        lock: LockMode,
    ) -> Result<Option<Quote>, StoreError> {
        let sql = format!(
            "SELECT {QUOTE_COLUMNS} FROM quotes WHERE symbol = $1{}",
            lock_clause(lock)
        );
        let quote = sqlx::query_as::<_, Quote>(&sql)
            .bind(symbol)
            .fetch_optional(&mut **txn)
            .await?;
        Ok(quote)
    }

    async fn get_portfolio(
        &self,
        txn: &mut Self::Txn,
        portfolio_id: &str,
        lock: LockMode,
    ) -> Result<Option<Portfolio>, StoreError> {
        let sql = format!(
            "SELECT {PORTFOLIO_COLUMNS} FROM portfolios WHERE portfolio_id = $1{}",
            lock_clause(lock)
        );
        let portfolio = sqlx::query_as::<_, Portfolio>(&sql)
            .bind(portfolio_id)
            .fetch_optional(&mut **txn)
            .await?;
        Ok(portfolio)
    }

    async fn scan_portfolios_by_account(
        &self,
        txn: &mut Self::Txn,
        account_id: &str,
        lock: LockMode,
    ) -> Result<Vec<Portfolio>, StoreError> {
        let sql = format!(
            "SELECT {PORTFOLIO_COLUMNS} FROM portfolios WHERE account_id = $1 \
             ORDER BY portfolio_id{}",
            lock_clause(lock)
        );
        let rows = sqlx::query_as::<_, Portfolio>(&sql)
            .bind(account_id)
            .fetch_all(&mut **txn)
            .await?;
        Ok(rows)
    }

    async fn scan_stocks(&self, txn: &mut Self::Txn) -> Result<Vec<Stock>, StoreError> {
        let stocks =
            sqlx::query_as::<_, Stock>("SELECT symbol, full_name FROM stocks ORDER BY symbol")
                .fetch_all(&mut **txn)
                .await?;
        Ok(stocks)
    }

    async fn put_stock(
        &self,
        txn: &mut Self::Txn,
        stock: &Stock,
        policy: PutPolicy,
    ) -> Result<(), StoreError> {
        let sql = match policy {
            PutPolicy::Overwrite => {
                "INSERT INTO stocks (symbol, full_name) VALUES ($1, $2) \
                 ON CONFLICT (symbol) DO UPDATE SET full_name = EXCLUDED.full_name"
            }
            PutPolicy::NoOverwrite => "INSERT INTO stocks (symbol, full_name) VALUES ($1, $2)",
        };
        sqlx::query(sql)
            .bind(&stock.symbol)
            .bind(&stock.full_name)
            .execute(&mut **txn)
            .await
            .map_err(|e| StoreError::on_write(e, Table::Stocks, &stock.symbol))?;
        Ok(())
    }

    async fn put_account(
        &self,
        txn: &mut Self::Txn,
        account: &Account,
        policy: PutPolicy,
    ) -> Result<(), StoreError> {
        let mut sql = format!(
            "INSERT INTO accounts ({ACCOUNT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"
        );
        if policy == PutPolicy::Overwrite {
            sql.push_str(
                " ON CONFLICT (account_id) DO UPDATE SET last_name = EXCLUDED.last_name, \
                 first_name = EXCLUDED.first_name, address = EXCLUDED.address, \
                 city = EXCLUDED.city, state = EXCLUDED.state, country = EXCLUDED.country, \
                 phone = EXCLUDED.phone",
            );
        }
        sqlx::query(&sql)
            .bind(&account.account_id)
            .bind(&account.last_name)
            .bind(&account.first_name)
            .bind(&account.address)
            .bind(&account.city)
            .bind(&account.state)
            .bind(&account.country)
            .bind(&account.phone)
            .execute(&mut **txn)
            .await
            .map_err(|e| StoreError::on_write(e, Table::Accounts, &account.account_id))?;
        Ok(())
    }

    async fn put_currency(
        &self,
        txn: &mut Self::Txn,
        currency: &Currency,
        policy: PutPolicy,
    ) -> Result<(), StoreError> {
        let mut sql = String::from(
            "INSERT INTO currencies (currency_symbol, country, currency_name) VALUES ($1, $2, $3)",
        );
        if policy == PutPolicy::Overwrite {
            sql.push_str(
                " ON CONFLICT (currency_symbol) DO UPDATE SET country = EXCLUDED.country, \
                 currency_name = EXCLUDED.currency_name",
            );
        }
        sqlx::query(&sql)
            .bind(&currency.currency_symbol)
            .bind(&currency.country)
            .bind(&currency.currency_name)
            .execute(&mut **txn)
            .await
            .map_err(|e| StoreError::on_write(e, Table::Currencies, &currency.currency_symbol))?;
        Ok(())
    }

    async fn put_quote(
        &self,
        txn: &mut Self::Txn,
        quote: &Quote,
        policy: PutPolicy,
    ) -> Result<(), StoreError> {
        let mut sql = format!(
            "INSERT INTO quotes ({QUOTE_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"
        );
        if policy == PutPolicy::Overwrite {
            sql.push_str(
                " ON CONFLICT (symbol) DO UPDATE SET current_price = EXCLUDED.current_price, \
                 trade_time = EXCLUDED.trade_time, low_price_day = EXCLUDED.low_price_day, \
                 high_price_day = EXCLUDED.high_price_day, \
                 perc_price_change = EXCLUDED.perc_price_change, bid = EXCLUDED.bid, \
                 ask = EXCLUDED.ask, trade_volume = EXCLUDED.trade_volume, \
                 market_cap = EXCLUDED.market_cap",
            );
        }
        sqlx::query(&sql)
            .bind(&quote.symbol)
            .bind(quote.current_price)
            .bind(&quote.trade_time)
            .bind(quote.low_price_day)
            .bind(quote.high_price_day)
            .bind(quote.perc_price_change)
            .bind(quote.bid)
            .bind(quote.ask)
            .bind(quote.trade_volume)
            .bind(&quote.market_cap)
            .execute(&mut **txn)
            .await
            .map_err(|e| StoreError::on_write(e, Table::Quotes, &quote.symbol))?;
        Ok(())
    }

    async fn put_portfolio(
        &self,
        txn: &mut Self::Txn,
        portfolio: &Portfolio,
        policy: PutPolicy,
    ) -> Result<(), StoreError> {
        let mut sql = format!(
            "INSERT INTO portfolios ({PORTFOLIO_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"
        );
        if policy == PutPolicy::Overwrite {
            sql.push_str(
                " ON CONFLICT (portfolio_id) DO UPDATE SET account_id = EXCLUDED.account_id, \
                 symbol = EXCLUDED.symbol, hold_stocks = EXCLUDED.hold_stocks, \
                 to_sell = EXCLUDED.to_sell, number_sell = EXCLUDED.number_sell, \
                 price_sell = EXCLUDED.price_sell, to_buy = EXCLUDED.to_buy, \
                 number_buy = EXCLUDED.number_buy, price_buy = EXCLUDED.price_buy",
            );
        }
        sqlx::query(&sql)
            .bind(&portfolio.portfolio_id)
            .bind(&portfolio.account_id)
            .bind(&portfolio.symbol)
            .bind(portfolio.hold_stocks)
            .bind(portfolio.to_sell)
            .bind(portfolio.number_sell)
            .bind(portfolio.price_sell)
            .bind(portfolio.to_buy)
            .bind(portfolio.number_buy)
            .bind(portfolio.price_buy)
            .execute(&mut **txn)
            .await
            .map_err(|e| StoreError::on_write(e, Table::Portfolios, &portfolio.portfolio_id))?;
        Ok(())
    }

    async fn stat(&self, table: Table) -> Result<TableStats, StoreError> {
        let sql = format!("SELECT count(*) FROM {}", table.sql_name());
        let rows: i64 = sqlx::query_scalar(&sql).fetch_one(&self.pool).await?;
        Ok(TableStats {
            rows: u64::try_from(rows).unwrap_or_default(),
        })
    }

    async fn max_portfolio_number(&self) -> Result<Option<u64>, StoreError> {
        let max: Option<i64> = sqlx::query_scalar(
            "SELECT max(portfolio_id::bigint) FROM portfolios WHERE portfolio_id ~ '^[0-9]+$'",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(max.and_then(|n| u64::try_from(n).ok()))
    }
}
