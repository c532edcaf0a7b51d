//! Docvault Core Library
//!
//! This crate provides the configuration, error types and domain models shared
//! by the storage, services and API crates.

pub mod config;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use config::{BaseConfig, Config, DocvaultConfig, LogFormat};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{Identity, ReplaceStrategy, UploadResult, UserLevel};
