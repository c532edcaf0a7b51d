//! Test helpers: build AppState and router for integration tests.
//!
//! Run from workspace root: `cargo test -p docvault-api --test api_test`.
//! No database is configured, so sign-in only knows the static superuser.

#![allow(dead_code)]

pub mod fixtures;

use axum_test::TestServer;
use docvault_api::setup::{self, routes};
use docvault_api::state::AppState;
use docvault_core::{BaseConfig, Config, DocvaultConfig, LogFormat, ReplaceStrategy};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

pub const TEST_ADMIN_USERNAME: &str = "admin";
pub const TEST_ADMIN_PASSWORD: &str = "correct-horse-battery";
pub const TEST_JWT_SECRET: &str = "test-secret-that-is-at-least-32-chars";

/// Test application: server, shared state, and owned resources.
pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub _temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    pub fn documents_dir(&self) -> &Path {
        self.state.config.documents_dir()
    }
}

/// Setup test app with the default swap strategy.
pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(ReplaceStrategy::Swap).await
}

/// Setup test app with documents and uploads under a fresh temp directory.
pub async fn setup_test_app_with(strategy: ReplaceStrategy) -> TestApp {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
    let config = create_test_config(temp_dir.path(), strategy);
    build_test_app(temp_dir, config).await
}

/// Setup test app whose request bodies are capped at `max_upload_size_bytes`.
pub async fn setup_test_app_with_upload_limit(max_upload_size_bytes: usize) -> TestApp {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
    let mut config = create_test_config(temp_dir.path(), ReplaceStrategy::Swap);
    config.0.max_upload_size_bytes = max_upload_size_bytes;
    build_test_app(temp_dir, config).await
}

async fn build_test_app(temp_dir: TempDir, config: Config) -> TestApp {
    let state = setup::build_state(config.clone(), None)
        .await
        .expect("Failed to build app state");
    let app = routes::setup_routes(&config, state.clone()).expect("Failed to setup routes");

    let server = TestServer::new(app.into_make_service()).expect("Failed to create test server");

    TestApp {
        server,
        state,
        _temp_dir: temp_dir,
    }
}

fn create_test_config(root: &Path, strategy: ReplaceStrategy) -> Config {
    let base = BaseConfig {
        server_port: 8000,
        cors_origins: vec!["*".to_string()],
        environment: "test".to_string(),
        jwt_secret: TEST_JWT_SECRET.to_string(),
        jwt_expiry_hours: 24,
        log_format: LogFormat::Compact,
    };

    Config(Box::new(DocvaultConfig {
        base,
        documents_dir: root.join("documents"),
        uploads_dir: root.join("uploads"),
        max_upload_size_bytes: 10 * 1024 * 1024,
        max_extracted_size_bytes: 64 * 1024 * 1024,
        replace_strategy: strategy,
        upload_lock_timeout_secs: 5,
        archive_timeout_secs: 30,
        swap_timeout_secs: 30,
        database_url: None,
        db_max_connections: 1,
        db_timeout_seconds: 1,
        admin_username: TEST_ADMIN_USERNAME.to_string(),
        admin_password: TEST_ADMIN_PASSWORD.to_string(),
    }))
}
