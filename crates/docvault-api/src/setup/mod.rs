//! Application setup and initialization

pub mod database;
pub mod routes;
pub mod server;

use crate::auth::Authenticator;
use crate::state::AppState;
use anyhow::{Context, Result};
use docvault_core::Config;
use docvault_db::UserRepository;
use docvault_services::UploadCoordinator;
use docvault_storage::DocumentStore;
use std::sync::Arc;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Fail fast on misconfiguration
    config.validate().context("Configuration validation failed")?;

    crate::telemetry::init_telemetry(config.log_format())
        .context("Failed to initialize telemetry")?;

    tracing::info!(
        environment = %config.environment(),
        replace_strategy = %config.replace_strategy(),
        "Configuration loaded and validated successfully"
    );

    let users = database::setup_database(&config)?;
    let state = build_state(config.clone(), users).await?;
    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}

/// Open the document store and wire the pipeline and credential strategies.
pub async fn build_state(config: Config, users: Option<UserRepository>) -> Result<Arc<AppState>> {
    let store = DocumentStore::open(config.documents_dir())
        .await
        .with_context(|| {
            format!(
                "Failed to open document store at {}",
                config.documents_dir().display()
            )
        })?;

    let coordinator = UploadCoordinator::from_config(&config, store.clone());
    let authenticator = Authenticator::from_config(&config, users.clone());

    tracing::info!(
        documents_dir = %config.documents_dir().display(),
        uploads_dir = %config.uploads_dir().display(),
        credential_strategies = ?authenticator.strategy_names(),
        "Services initialized"
    );

    Ok(Arc::new(AppState {
        config,
        store,
        coordinator,
        authenticator,
        users,
    }))
}
