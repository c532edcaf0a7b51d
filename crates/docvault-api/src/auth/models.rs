use docvault_core::UserLevel;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Sign-in credentials
#[derive(Deserialize, ToSchema)]
pub struct SignInRequest {
    #[schema(example = "admin")]
    pub username: String,
    #[schema(example = "admin")]
    pub password: String,
}

/// Successful sign-in
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SignInResponse {
    /// HS256 session token
    pub token: String,
    #[schema(example = "admin")]
    pub id: String,
    #[schema(example = "Administrator")]
    pub name: String,
    pub level: UserLevel,
}

/// Session token claims
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub name: String,
    pub level: UserLevel,
    pub iat: i64,
    pub exp: i64,
}
