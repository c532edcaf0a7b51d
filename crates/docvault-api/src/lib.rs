//! Docvault API Library
//!
//! This crate provides the HTTP handlers, credential strategies and
//! application setup for the document service.

// Module declarations
mod api_doc;
mod handlers;
pub mod setup;
mod telemetry;

// Public modules
pub mod auth;
pub mod error;
pub mod state;

// Re-exports
pub use error::{ErrorResponse, UploadFailureResponse};
pub use handlers::upload::UploadResponse;
