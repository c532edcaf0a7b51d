use crate::auth::models::SignInResponse;
use crate::auth::strategy::{CredentialStrategy, DatabaseLookup, StaticSuperuser};
use crate::auth::token::TokenIssuer;
use docvault_core::{AppError, Config};
use docvault_db::UserRepository;
use std::sync::Arc;

/// Runs credential strategies in order and issues a token for the first match
#[derive(Clone)]
pub struct Authenticator {
    strategies: Vec<Arc<dyn CredentialStrategy>>,
    tokens: TokenIssuer,
}

impl Authenticator {
    pub fn new(tokens: TokenIssuer) -> Self {
        Self {
            strategies: Vec::new(),
            tokens,
        }
    }

    pub fn with_strategy(mut self, strategy: impl CredentialStrategy + 'static) -> Self {
        self.strategies.push(Arc::new(strategy));
        self
    }

    /// Static superuser first, then the user table when a database is configured.
    pub fn from_config(config: &Config, users: Option<UserRepository>) -> Self {
        let authenticator = Self::new(TokenIssuer::new(config.jwt_secret(), config.jwt_expiry_hours()))
            .with_strategy(StaticSuperuser::new(
                config.admin_username(),
                config.admin_password(),
            ));

        match users {
            Some(users) => authenticator.with_strategy(DatabaseLookup::new(users)),
            None => authenticator,
        }
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    #[tracing::instrument(skip(self, password), fields(operation = "sign_in"))]
    pub async fn sign_in(&self, username: &str, password: &str) -> Result<SignInResponse, AppError> {
        for strategy in &self.strategies {
            let Some(identity) = strategy.authenticate(username, password).await? else {
                continue;
            };

            tracing::info!(
                strategy = strategy.name(),
                user_id = %identity.id,
                level = %identity.level,
                "User signed in"
            );

            let token = self.tokens.issue(&identity)?;
            return Ok(SignInResponse {
                token,
                id: identity.id,
                name: identity.name,
                level: identity.level,
            });
        }

        tracing::debug!("Sign-in rejected");
        Err(AppError::Unauthorized(
            "Invalid username or password".to_string(),
        ))
    }
}
