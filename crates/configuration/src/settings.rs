use crate::error::ConfigError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::path::PathBuf;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub store: StoreSettings,
    pub loader: LoaderSettings,
    pub logging: LogSettings,
    pub workload: WorkloadSettings,
}

impl LedgerConfig {
    /// Rejects settings the ledger cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.max_connections == 0 {
            return Err(ConfigError::ValidationError(
                "store.max_connections must be at least 1".to_string(),
            ));
        }
        if self.store.lock_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "store.lock_timeout_ms must be positive".to_string(),
            ));
        }
        if self.store.backend == StoreBackend::Postgres && self.store.resolved_database_url().is_none() {
            return Err(ConfigError::ValidationError(
                "the postgres backend needs store.database_url or DATABASE_URL".to_string(),
            ));
        }
        if self.loader.initial_quote_price <= Decimal::ZERO {
            return Err(ConfigError::ValidationError(format!(
                "loader.initial_quote_price must be positive, got {}",
                self.loader.initial_quote_price
            )));
        }
        if self.workload.batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "workload.batch_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Which ledger store implementation backs the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// The embedded, in-process store. Contents live as long as the process.
    #[default]
    Memory,
    /// A PostgreSQL database reached through a connection pool.
    Postgres,
}

/// Contains parameters for the ledger store adapter.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub backend: StoreBackend,
    /// Connection string for the postgres backend. Falls back to `DATABASE_URL`.
    pub database_url: Option<String>,
    pub max_connections: u32,
    /// How long a transaction waits on a row lock before failing.
    pub lock_timeout_ms: u64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            database_url: None,
            max_connections: 10,
            lock_timeout_ms: 10_000,
        }
    }
}

impl StoreSettings {
    /// The configured URL, or `DATABASE_URL` from the environment / `.env` file.
    pub fn resolved_database_url(&self) -> Option<String> {
        if let Some(url) = &self.database_url {
            return Some(url.clone());
        }
        dotenvy::dotenv().ok();
        std::env::var("DATABASE_URL").ok()
    }

    pub fn lock_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.lock_timeout_ms)
    }
}

/// Contains parameters for the seed-data loader.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoaderSettings {
    /// Directory holding `accounts.txt`, `companylist.txt`, `currencies.txt` and `quotes.txt`.
    pub datafiles_dir: PathBuf,
    /// Every quote starts at this price regardless of the data file.
    pub initial_quote_price: Decimal,
    /// How many synthetic portfolio rows `load --portfolios` creates.
    pub seed_portfolios: usize,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            datafiles_dir: PathBuf::from("datafiles"),
            initial_quote_price: dec!(500),
            seed_portfolios: 100,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Default filter directive. `RUST_LOG` takes precedence when set.
    pub level: String,
    /// When set, logs are also written to a daily-rolling file in this directory.
    pub directory: Option<PathBuf>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
        }
    }
}

/// Parameters for the synthetic workload driven by `bench`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkloadSettings {
    /// Number of concurrent clients.
    pub clients: usize,
    pub transactions_per_client: usize,
    /// Orders or quote updates per batch transaction.
    pub batch_size: usize,
    /// Fixes the random sequence of every client when set.
    pub seed: Option<u64>,
}

impl Default for WorkloadSettings {
    fn default() -> Self {
        Self {
            clients: 8,
            transactions_per_client: 100,
            batch_size: 5,
            seed: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = LedgerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.store.lock_timeout_ms, 10_000);
        assert_eq!(config.loader.initial_quote_price, dec!(500));
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let mut config = LedgerConfig::default();
        config.workload.batch_size = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn zero_lock_timeout_is_rejected() {
        let mut config = LedgerConfig::default();
        config.store.lock_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn non_positive_initial_price_is_rejected() {
        let mut config = LedgerConfig::default();
        config.loader.initial_quote_price = Decimal::ZERO;
        assert!(config.validate().is_err());
    }
}
