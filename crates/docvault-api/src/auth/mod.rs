//! Credential checks and session tokens for `POST /api/user/signIn`

pub mod authenticator;
pub mod models;
pub mod strategy;
pub mod token;

pub use authenticator::Authenticator;
pub use models::{Claims, SignInRequest, SignInResponse};
pub use strategy::{CredentialStrategy, DatabaseLookup, StaticSuperuser};
pub use token::TokenIssuer;
