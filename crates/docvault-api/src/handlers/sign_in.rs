use crate::auth::{SignInRequest, SignInResponse};
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{extract::State, Json};
use std::sync::Arc;

/// Check credentials and issue a session token
#[utoipa::path(
    post,
    path = "/api/user/signIn",
    tag = "auth",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Signed in", body = SignInResponse),
        (status = 400, description = "Malformed request body", body = ErrorResponse),
        (status = 401, description = "Invalid username or password", body = ErrorResponse),
        (status = 500, description = "User lookup failed", body = ErrorResponse)
    )
)]
pub async fn sign_in(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<SignInRequest>,
) -> Result<Json<SignInResponse>, HttpAppError> {
    let response = state
        .authenticator
        .sign_in(&request.username, &request.password)
        .await?;

    Ok(Json(response))
}
