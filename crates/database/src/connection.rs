use crate::error::StoreError;
use configuration::StoreSettings;
use sqlx::{PgPool, postgres::PgPoolOptions};

/// Establishes a connection pool to the PostgreSQL ledger database.
///
/// The URL comes from `store.database_url`, falling back to `DATABASE_URL`
/// (a `.env` file is honoured). Acquiring a pooled connection is bounded by
/// the same lock timeout as row locks.
pub async fn connect(settings: &StoreSettings) -> Result<PgPool, StoreError> {
    let database_url = settings.resolved_database_url().ok_or_else(|| {
        StoreError::ConnectionConfigError(
            "store.database_url or DATABASE_URL must be set.".to_string(),
        )
    })?;

    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(settings.lock_timeout())
        .connect(&database_url)
        .await?;

    tracing::info!(max_connections = settings.max_connections, "connected to postgres");
    Ok(pool)
}

/// Brings the ledger schema up to date.
pub async fn run_migrations(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
