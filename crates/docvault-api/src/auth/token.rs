use crate::auth::models::Claims;
use chrono::{Duration, Utc};
use docvault_core::{AppError, Identity};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};

/// Issues HS256 session tokens
#[derive(Clone)]
pub struct TokenIssuer {
    key: EncodingKey,
    expiry: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str, expiry_hours: i64) -> Self {
        Self {
            key: EncodingKey::from_secret(secret.as_bytes()),
            expiry: Duration::hours(expiry_hours.clamp(1, 24 * 365)),
        }
    }

    pub fn issue(&self, identity: &Identity) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: identity.id.clone(),
            name: identity.name.clone(),
            level: identity.level,
            iat: now.timestamp(),
            exp: (now + self.expiry).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.key)
            .map_err(|e| AppError::Internal(format!("Failed to issue token: {}", e)))
    }
}
