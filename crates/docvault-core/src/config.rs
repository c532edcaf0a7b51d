//! Configuration module
//!
//! This module provides the configuration structures for the API and services:
//! server settings, document store and staging locations, upload pipeline
//! bounds, the optional user database and the static superuser rule.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::models::ReplaceStrategy;

// Common constants
const SERVER_PORT: u16 = 8000;
const MAX_UPLOAD_SIZE_MB: usize = 200;
const MAX_EXTRACTED_SIZE_MB: u64 = 1024;
const UPLOAD_LOCK_TIMEOUT_SECS: u64 = 30;
const ARCHIVE_TIMEOUT_SECS: u64 = 60;
const SWAP_TIMEOUT_SECS: u64 = 30;
const DB_MAX_CONNECTIONS: u32 = 5;
const DB_TIMEOUT_SECS: u64 = 5;
const DB_PORT: u16 = 5432;
const JWT_EXPIRY_HOURS: i64 = 24;
const DEFAULT_ADMIN_USERNAME: &str = "admin";
const DEFAULT_ADMIN_PASSWORD: &str = "admin";

/// Console log output format
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

/// Server-wide settings
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,
    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,
    pub log_format: LogFormat,
}

/// Document service configuration
#[derive(Clone, Debug)]
pub struct DocvaultConfig {
    pub base: BaseConfig,
    // Filesystem layout
    pub documents_dir: PathBuf,
    pub uploads_dir: PathBuf,
    // Upload pipeline
    pub max_upload_size_bytes: usize,
    pub max_extracted_size_bytes: u64,
    pub replace_strategy: ReplaceStrategy,
    pub upload_lock_timeout_secs: u64,
    pub archive_timeout_secs: u64,
    pub swap_timeout_secs: u64,
    // User database (optional; the lookup strategy is disabled without it)
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    // Static superuser rule
    pub admin_username: String,
    pub admin_password: String,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<DocvaultConfig>);

impl Config {
    fn inner(&self) -> &DocvaultConfig {
        &self.0
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        is_production_environment(&self.inner().base.environment)
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = DocvaultConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.inner().validate()
    }

    pub fn server_port(&self) -> u16 {
        self.inner().base.server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.inner().base.cors_origins
    }

    pub fn environment(&self) -> &str {
        &self.inner().base.environment
    }

    pub fn jwt_secret(&self) -> &str {
        &self.inner().base.jwt_secret
    }

    pub fn jwt_expiry_hours(&self) -> i64 {
        self.inner().base.jwt_expiry_hours
    }

    pub fn log_format(&self) -> LogFormat {
        self.inner().base.log_format
    }

    pub fn documents_dir(&self) -> &Path {
        &self.inner().documents_dir
    }

    pub fn uploads_dir(&self) -> &Path {
        &self.inner().uploads_dir
    }

    pub fn max_upload_size_bytes(&self) -> usize {
        self.inner().max_upload_size_bytes
    }

    /// Total decompressed size one archive may expand to
    pub fn max_extracted_size_bytes(&self) -> u64 {
        self.inner().max_extracted_size_bytes
    }

    pub fn replace_strategy(&self) -> ReplaceStrategy {
        self.inner().replace_strategy
    }

    pub fn upload_lock_timeout(&self) -> Duration {
        Duration::from_secs(self.inner().upload_lock_timeout_secs)
    }

    pub fn archive_timeout(&self) -> Duration {
        Duration::from_secs(self.inner().archive_timeout_secs)
    }

    pub fn swap_timeout(&self) -> Duration {
        Duration::from_secs(self.inner().swap_timeout_secs)
    }

    pub fn database_url(&self) -> Option<&str> {
        self.inner().database_url.as_deref()
    }

    pub fn db_max_connections(&self) -> u32 {
        self.inner().db_max_connections
    }

    pub fn db_timeout(&self) -> Duration {
        Duration::from_secs(self.inner().db_timeout_seconds)
    }

    pub fn admin_username(&self) -> &str {
        &self.inner().admin_username
    }

    pub fn admin_password(&self) -> &str {
        &self.inner().admin_password
    }
}

fn is_production_environment(environment: &str) -> bool {
    let env = environment.to_lowercase();
    env == "production" || env == "prod"
}

/// Build a Postgres connection string from discrete `DB_*` settings.
///
/// Returns `None` unless host, user and database name are all present.
pub fn compose_database_url(
    host: Option<&str>,
    port: u16,
    user: Option<&str>,
    password: Option<&str>,
    name: Option<&str>,
) -> Option<String> {
    let (host, user, name) = (host?, user?, name?);
    let credentials = match password {
        Some(password) if !password.is_empty() => format!("{}:{}", user, password),
        _ => user.to_string(),
    };
    Some(format!(
        "postgres://{}@{}:{}/{}",
        credentials, host, port, name
    ))
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.trim().is_empty())
}

impl DocvaultConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());
        let is_production = is_production_environment(&environment);

        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        if is_production && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }
        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let log_format = match env::var("LOG_FORMAT")
            .unwrap_or_default()
            .to_lowercase()
            .as_str()
        {
            "json" => LogFormat::Json,
            _ => LogFormat::Compact,
        };

        let base = BaseConfig {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| SERVER_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            cors_origins,
            environment: environment.clone(),
            jwt_secret: env::var("JWT_SECRET")
                .map_err(|_| anyhow::anyhow!("JWT_SECRET must be set for authentication"))?,
            jwt_expiry_hours: env::var("JWT_EXPIRY_HOURS")
                .unwrap_or_else(|_| JWT_EXPIRY_HOURS.to_string())
                .parse()
                .unwrap_or(JWT_EXPIRY_HOURS),
            log_format,
        };

        let replace_strategy = match non_empty_var("REPLACE_STRATEGY") {
            Some(value) => value.parse()?,
            None => ReplaceStrategy::default(),
        };

        let max_upload_size_mb = env::var("MAX_UPLOAD_SIZE_MB")
            .unwrap_or_else(|_| MAX_UPLOAD_SIZE_MB.to_string())
            .parse::<usize>()
            .unwrap_or(MAX_UPLOAD_SIZE_MB);

        let max_extracted_size_mb = env::var("MAX_EXTRACTED_SIZE_MB")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(MAX_EXTRACTED_SIZE_MB);

        let database_url = non_empty_var("DATABASE_URL").or_else(|| {
            compose_database_url(
                non_empty_var("DB_HOST").as_deref(),
                env::var("DB_PORT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DB_PORT),
                non_empty_var("DB_USER").as_deref(),
                env::var("DB_PASSWORD").ok().as_deref(),
                non_empty_var("DB_NAME").as_deref(),
            )
        });

        let admin_password = match non_empty_var("ADMIN_PASSWORD") {
            Some(password) => password,
            None if is_production => {
                return Err(anyhow::anyhow!(
                    "ADMIN_PASSWORD must be set explicitly in production"
                ))
            }
            None => DEFAULT_ADMIN_PASSWORD.to_string(),
        };

        let config = DocvaultConfig {
            base,
            documents_dir: non_empty_var("DOCUMENTS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./documents")),
            uploads_dir: non_empty_var("UPLOADS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./uploads")),
            max_upload_size_bytes: max_upload_size_mb * 1024 * 1024,
            max_extracted_size_bytes: max_extracted_size_mb * 1024 * 1024,
            replace_strategy,
            upload_lock_timeout_secs: env::var("UPLOAD_LOCK_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(UPLOAD_LOCK_TIMEOUT_SECS),
            archive_timeout_secs: env::var("ARCHIVE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|&secs| secs > 0)
                .unwrap_or(ARCHIVE_TIMEOUT_SECS),
            swap_timeout_secs: env::var("SWAP_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|&secs| secs > 0)
                .unwrap_or(SWAP_TIMEOUT_SECS),
            database_url,
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| DB_MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(DB_MAX_CONNECTIONS),
            db_timeout_seconds: env::var("DB_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| DB_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(DB_TIMEOUT_SECS),
            admin_username: non_empty_var("ADMIN_USERNAME")
                .unwrap_or_else(|| DEFAULT_ADMIN_USERNAME.to_string()),
            admin_password,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.base.jwt_secret.len() < 32 {
            return Err(anyhow::anyhow!(
                "JWT_SECRET must be at least 32 characters long"
            ));
        }

        if let Some(url) = &self.database_url {
            if !url.starts_with("postgres://") && !url.starts_with("postgresql://") {
                return Err(anyhow::anyhow!(
                    "DATABASE_URL must be a valid PostgreSQL connection string"
                ));
            }
        }

        if self.documents_dir == self.uploads_dir {
            return Err(anyhow::anyhow!(
                "DOCUMENTS_DIR and UPLOADS_DIR must be different directories"
            ));
        }

        if self.max_upload_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_UPLOAD_SIZE_MB must be greater than 0"));
        }

        if self.max_extracted_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_EXTRACTED_SIZE_MB must be greater than 0"));
        }

        if is_production_environment(&self.base.environment)
            && self.admin_password == DEFAULT_ADMIN_PASSWORD
        {
            return Err(anyhow::anyhow!(
                "ADMIN_PASSWORD cannot be the default value in production"
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> DocvaultConfig {
        DocvaultConfig {
            base: BaseConfig {
                server_port: 8000,
                cors_origins: vec!["*".to_string()],
                environment: "development".to_string(),
                jwt_secret: "0123456789abcdef0123456789abcdef".to_string(),
                jwt_expiry_hours: 24,
                log_format: LogFormat::Compact,
            },
            documents_dir: PathBuf::from("./documents"),
            uploads_dir: PathBuf::from("./uploads"),
            max_upload_size_bytes: 1024,
            max_extracted_size_bytes: 4096,
            replace_strategy: ReplaceStrategy::Swap,
            upload_lock_timeout_secs: 30,
            archive_timeout_secs: 60,
            swap_timeout_secs: 30,
            database_url: None,
            db_max_connections: 5,
            db_timeout_seconds: 5,
            admin_username: "admin".to_string(),
            admin_password: "admin".to_string(),
        }
    }

    #[test]
    fn test_validate_accepts_development_defaults() {
        assert!(sample_config().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_short_jwt_secret() {
        let mut config = sample_config();
        config.base.jwt_secret = "short".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_non_postgres_url() {
        let mut config = sample_config();
        config.database_url = Some("mysql://root@localhost/docs".to_string());
        assert!(config.validate().is_err());

        config.database_url = Some("postgresql://root@localhost/docs".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_shared_directories() {
        let mut config = sample_config();
        config.uploads_dir = config.documents_dir.clone();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_size_limits() {
        let mut config = sample_config();
        config.max_extracted_size_bytes = 0;
        assert!(config.validate().is_err());

        let mut config = sample_config();
        config.max_upload_size_bytes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_default_admin_password_in_production() {
        let mut config = sample_config();
        config.base.environment = "Production".to_string();
        assert!(config.validate().is_err());

        config.admin_password = "a-much-better-secret".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_compose_database_url() {
        assert_eq!(
            compose_database_url(Some("db"), 5432, Some("app"), Some("pw"), Some("docs")),
            Some("postgres://app:pw@db:5432/docs".to_string())
        );
        assert_eq!(
            compose_database_url(Some("db"), 6543, Some("app"), None, Some("docs")),
            Some("postgres://app@db:6543/docs".to_string())
        );
        assert_eq!(
            compose_database_url(None, 5432, Some("app"), Some("pw"), Some("docs")),
            None
        );
    }

    #[test]
    fn test_config_getters() {
        let config = Config(Box::new(sample_config()));
        assert_eq!(config.server_port(), 8000);
        assert_eq!(config.upload_lock_timeout(), Duration::from_secs(30));
        assert_eq!(config.replace_strategy(), ReplaceStrategy::Swap);
        assert_eq!(config.max_extracted_size_bytes(), 4096);
        assert!(config.database_url().is_none());
        assert!(!config.is_production());
    }
}
