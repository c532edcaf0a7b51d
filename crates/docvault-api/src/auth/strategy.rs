//! Credential check strategies.
//!
//! A strategy answers `Ok(Some(identity))` for a match, `Ok(None)` when the
//! credentials are not its to accept, and `Err` when it could not decide.

use argon2::{
    password_hash::{PasswordHash, PasswordVerifier},
    Argon2,
};
use async_trait::async_trait;
use docvault_core::{AppError, Identity, UserLevel};
use docvault_db::UserRepository;
use subtle::ConstantTimeEq;

#[async_trait]
pub trait CredentialStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn authenticate(&self, username: &str, password: &str) -> Result<Option<Identity>, AppError>;
}

fn secure_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Check `candidate` against a stored credential: Argon2 PHC strings are
/// verified, anything else is compared in constant time.
pub(crate) fn verify_password(candidate: &str, stored: &str) -> bool {
    if !stored.starts_with("$argon2") {
        return secure_compare(candidate, stored);
    }

    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(candidate.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!(error = %e, "Stored password hash is malformed");
            false
        }
    }
}

/// Fixed superuser account from configuration
pub struct StaticSuperuser {
    username: String,
    password: String,
}

impl StaticSuperuser {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

#[async_trait]
impl CredentialStrategy for StaticSuperuser {
    fn name(&self) -> &'static str {
        "static_superuser"
    }

    async fn authenticate(&self, username: &str, password: &str) -> Result<Option<Identity>, AppError> {
        // Evaluate both comparisons so timing does not reveal which one failed.
        let username_ok = secure_compare(username, &self.username);
        let password_ok = secure_compare(password, &self.password);
        if !(username_ok & password_ok) {
            return Ok(None);
        }

        Ok(Some(Identity {
            id: self.username.clone(),
            name: "Administrator".to_string(),
            level: UserLevel::Admin,
        }))
    }
}

/// Row lookup in the `users` table
pub struct DatabaseLookup {
    users: UserRepository,
}

impl DatabaseLookup {
    pub fn new(users: UserRepository) -> Self {
        Self { users }
    }
}

#[async_trait]
impl CredentialStrategy for DatabaseLookup {
    fn name(&self) -> &'static str {
        "database_lookup"
    }

    async fn authenticate(&self, username: &str, password: &str) -> Result<Option<Identity>, AppError> {
        let Some(user) = self.users.find_by_username(username).await? else {
            return Ok(None);
        };

        if !verify_password(password, &user.password) {
            return Ok(None);
        }

        Ok(Some(Identity {
            id: user.username.clone(),
            name: user.display_name().to_string(),
            level: UserLevel::from_stored(user.level.as_deref().unwrap_or_default()),
        }))
    }
}
