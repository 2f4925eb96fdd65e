//! Parsers for the `#`-delimited seed data files.

use crate::error::LoaderError;
use core_types::{validate_identifier, Account, Currency, Quote, Stock};
use csv::StringRecord;
use rust_decimal::Decimal;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const ACCOUNTS_FILE: &str = "accounts.txt";
pub const COMPANIES_FILE: &str = "companylist.txt";
pub const CURRENCIES_FILE: &str = "currencies.txt";
pub const QUOTES_FILE: &str = "quotes.txt";

/// Reads every record of `dir/file`. Records may have any number of fields.
fn read_records(dir: &Path, file: &'static str) -> Result<Vec<(u64, StringRecord)>, LoaderError> {
    let path: PathBuf = dir.join(file);
    let read_error = |source| LoaderError::Read {
        path: path.clone(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'#')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .trim(csv::Trim::All)
        .from_path(&path)
        .map_err(read_error)?;

    let mut records = Vec::new();
    for record in reader.records() {
        let record = record.map_err(read_error)?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        let line = record.position().map_or(0, |p| p.line());
        records.push((line, record));
    }
    Ok(records)
}

fn field(record: &StringRecord, index: usize) -> String {
    record.get(index).unwrap_or_default().to_string()
}

fn key(
    record: &StringRecord,
    index: usize,
    kind: &str,
    file: &'static str,
    line: u64,
) -> Result<String, LoaderError> {
    let value = field(record, index);
    validate_identifier(kind, &value).map_err(|e| LoaderError::Malformed {
        file,
        line,
        reason: e.to_string(),
    })?;
    Ok(value)
}

/// Numeric quote fields that do not parse are stored as zero.
fn number(record: &StringRecord, index: usize) -> Decimal {
    record
        .get(index)
        .and_then(|raw| {
            Decimal::from_str(raw)
                .or_else(|_| Decimal::from_scientific(raw))
                .ok()
        })
        .unwrap_or_default()
}

/// `id#last#first#address#city#state#country#phone`
pub fn read_accounts(dir: &Path) -> Result<Vec<Account>, LoaderError> {
    read_records(dir, ACCOUNTS_FILE)?
        .into_iter()
        .map(|(line, r)| {
            Ok(Account {
                account_id: key(&r, 0, "account_id", ACCOUNTS_FILE, line)?,
                last_name: field(&r, 1),
                first_name: field(&r, 2),
                address: field(&r, 3),
                city: field(&r, 4),
                state: field(&r, 5),
                country: field(&r, 6),
                phone: field(&r, 7),
            })
        })
        .collect()
}

/// `symbol#name#...`; fields after the name are ignored.
pub fn read_stocks(dir: &Path) -> Result<Vec<Stock>, LoaderError> {
    read_records(dir, COMPANIES_FILE)?
        .into_iter()
        .map(|(line, r)| {
            Ok(Stock {
                symbol: key(&r, 0, "symbol", COMPANIES_FILE, line)?,
                full_name: field(&r, 1),
            })
        })
        .collect()
}

/// `country#name#symbol`
pub fn read_currencies(dir: &Path) -> Result<Vec<Currency>, LoaderError> {
    read_records(dir, CURRENCIES_FILE)?
        .into_iter()
        .map(|(line, r)| {
            Ok(Currency {
                country: field(&r, 0),
                currency_name: field(&r, 1),
                currency_symbol: key(&r, 2, "currency_symbol", CURRENCIES_FILE, line)?,
            })
        })
        .collect()
}

/// `symbol#price#time#low#high#change#bid#ask#volume#cap`
pub fn read_quotes(dir: &Path) -> Result<Vec<Quote>, LoaderError> {
    read_records(dir, QUOTES_FILE)?
        .into_iter()
        .map(|(line, r)| {
            Ok(Quote {
                symbol: key(&r, 0, "symbol", QUOTES_FILE, line)?,
                current_price: number(&r, 1),
                trade_time: field(&r, 2),
                low_price_day: number(&r, 3),
                high_price_day: number(&r, 4),
                perc_price_change: number(&r, 5),
                bid: number(&r, 6),
                ask: number(&r, 7),
                trade_volume: r
                    .get(8)
                    .and_then(|raw| raw.parse::<i64>().ok())
                    .unwrap_or_default(),
                market_cap: field(&r, 9),
            })
        })
        .collect()
}

/// The first `n` symbols of the company list, in file order.
pub fn stock_list_from_file(dir: &Path, n: usize) -> Result<Vec<String>, LoaderError> {
    Ok(read_stocks(dir)?
        .into_iter()
        .take(n)
        .map(|stock| stock.symbol)
        .collect())
}
