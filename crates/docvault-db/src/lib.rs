//! Docvault database access
//!
//! Repositories over the external relational store. The only table read by
//! the service is `users`, used by the credential lookup strategy.

pub mod db;

pub use db::user::{UserRecord, UserRepository};
