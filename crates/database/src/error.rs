use crate::store::Table;
use thiserror::Error;

/// SQLSTATE raised when `lock_timeout` expires.
const PG_LOCK_NOT_AVAILABLE: &str = "55P03";
/// SQLSTATE raised for the victim of a detected deadlock.
const PG_DEADLOCK_DETECTED: &str = "40P01";
/// SQLSTATE raised by a unique or primary key collision.
const PG_UNIQUE_VIOLATION: &str = "23505";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to load environment variables for database connection: {0}")]
    ConnectionConfigError(String),

    #[error("Database error: {0}")]
    Backend(sqlx::Error),

    #[error("Database migration failed: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("Key '{key}' already exists in {table}")]
    KeyExists { table: Table, key: String },

    #[error("Lock wait timed out: {0}")]
    LockTimeout(String),

    #[error("Transaction aborted to resolve a deadlock: {0}")]
    Deadlock(String),
}

impl StoreError {
    /// Classifies a failed write against `table`, keeping the colliding key
    /// when the database reports a unique violation.
    pub fn on_write(error: sqlx::Error, table: Table, key: &str) -> Self {
        if sqlstate(&error).as_deref() == Some(PG_UNIQUE_VIOLATION) {
            return StoreError::KeyExists {
                table,
                key: key.to_string(),
            };
        }
        error.into()
    }

    /// Lock waits and deadlock aborts may succeed when resubmitted.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::LockTimeout(_) | StoreError::Deadlock(_))
    }
}

fn sqlstate(error: &sqlx::Error) -> Option<String> {
    error
        .as_database_error()
        .and_then(|db| db.code())
        .map(|code| code.into_owned())
}

impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        if matches!(error, sqlx::Error::PoolTimedOut) {
            return StoreError::LockTimeout("timed out waiting for a pooled connection".to_string());
        }
        match sqlstate(&error).as_deref() {
            Some(PG_LOCK_NOT_AVAILABLE) => StoreError::LockTimeout(error.to_string()),
            Some(PG_DEADLOCK_DETECTED) => StoreError::Deadlock(error.to_string()),
            _ => StoreError::Backend(error),
        }
    }
}
