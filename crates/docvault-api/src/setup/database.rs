//! User database pool

use anyhow::{Context, Result};
use docvault_core::Config;
use docvault_db::UserRepository;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;

/// Build the user repository when a database is configured.
///
/// The pool connects lazily so the service starts (and `/api/db-status`
/// reports the problem) while the database is unreachable.
pub fn setup_database(config: &Config) -> Result<Option<UserRepository>> {
    let Some(url) = config.database_url() else {
        tracing::warn!("No database configured, sign-in is limited to the static superuser");
        return Ok(None);
    };

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections())
        .acquire_timeout(config.db_timeout())
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect_lazy(url)
        .context("Invalid database connection string")?;

    tracing::info!(
        max_connections = config.db_max_connections(),
        "Database pool configured"
    );

    Ok(Some(UserRepository::new(pool)))
}
