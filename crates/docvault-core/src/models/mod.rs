//! Domain models shared across crates

pub mod upload;
pub mod user;

pub use upload::{ReplaceStrategy, UploadResult};
pub use user::{Identity, UserLevel};
