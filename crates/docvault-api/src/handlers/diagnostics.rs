//! Diagnostic endpoints

use crate::state::AppState;
use axum::{extract::State, Json};
use docvault_core::ErrorMetadata;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct HelloResponse {
    #[schema(example = "Hello, World!")]
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DbStatusResponse {
    pub success: bool,
    pub message: String,
}

/// Liveness greeting
#[utoipa::path(
    get,
    path = "/hello",
    tag = "diagnostics",
    responses((status = 200, description = "Service is up", body = HelloResponse))
)]
pub async fn hello() -> Json<HelloResponse> {
    Json(HelloResponse {
        message: "Hello, World!".to_string(),
    })
}

/// Report whether the user database is reachable
#[utoipa::path(
    get,
    path = "/api/db-status",
    tag = "diagnostics",
    responses((status = 200, description = "Connection status", body = DbStatusResponse))
)]
pub async fn db_status(State(state): State<Arc<AppState>>) -> Json<DbStatusResponse> {
    let Some(users) = &state.users else {
        return Json(DbStatusResponse {
            success: false,
            message: "Database is not configured".to_string(),
        });
    };

    let timeout = state.config.db_timeout();
    let response = match tokio::time::timeout(timeout, users.ping()).await {
        Ok(Ok(())) => DbStatusResponse {
            success: true,
            message: "Connected to the database successfully".to_string(),
        },
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Database status check failed");
            let detail = if state.config.is_production() {
                e.client_message()
            } else {
                e.to_string()
            };
            DbStatusResponse {
                success: false,
                message: format!("Database connection error: {}", detail),
            }
        }
        Err(_) => {
            tracing::error!(timeout_secs = timeout.as_secs(), "Database status check timed out");
            DbStatusResponse {
                success: false,
                message: "Database connection timed out".to_string(),
            }
        }
    };

    Json(response)
}
