//! Upload-and-replace pipeline

mod coordinator;
mod error;
mod lock;

pub use coordinator::UploadCoordinator;
pub use error::PipelineError;
pub use lock::UploadLock;
