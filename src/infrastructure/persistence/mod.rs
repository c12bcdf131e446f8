//! PostgreSQL repository implementations.
//!
//! Concrete implementations of domain repository traits using SQLx. Queries are
//! built at runtime with `query_as` and mapped through `FromRow` row types.
//!
//! # Repositories
//!
//! - [`PgUrlRepository`] - URL records and their history
//! - [`PgClickRepository`] - Click tracking and analytics queries

pub mod pg_click_repository;
pub mod pg_url_repository;

pub use pg_click_repository::PgClickRepository;
pub use pg_url_repository::PgUrlRepository;

use crate::config::Config;
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;
use tokio_retry::Retry;
use tokio_retry::strategy::FixedInterval;

/// Embedded schema migrations from `./migrations`.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Pause between startup connection attempts.
const CONNECT_RETRY_INTERVAL_MS: u64 = 3_000;

/// Builds the connection pool, retrying while the database comes up.
///
/// Makes `db_connect_retries` attempts in total, [`CONNECT_RETRY_INTERVAL_MS`] apart.
///
/// # Errors
///
/// Returns the last connection error once every attempt has failed.
pub async fn connect_pool(config: &Config) -> Result<PgPool, sqlx::Error> {
    let options = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_connect_timeout))
        .idle_timeout(Duration::from_secs(config.db_idle_timeout))
        .max_lifetime(Duration::from_secs(config.db_max_lifetime));

    let strategy = FixedInterval::from_millis(CONNECT_RETRY_INTERVAL_MS)
        .take(config.db_connect_retries.saturating_sub(1));

    let pool = Retry::spawn(strategy, || {
        let options = options.clone();
        async move {
            options
                .connect(&config.database_url)
                .await
                .inspect_err(|e| tracing::warn!(error = %e, "Database connection attempt failed"))
        }
    })
    .await?;

    tracing::info!("Connected to database");
    Ok(pool)
}

/// Applies pending migrations.
///
/// # Errors
///
/// Returns an error if a migration fails or the applied history diverges.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    MIGRATOR.run(pool).await?;
    tracing::info!("Database migrations applied");
    Ok(())
}
