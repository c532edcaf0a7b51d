//! Global upload lock.
//!
//! Only one pipeline run may touch the document store and the staging area at
//! a time. Later uploads queue on a tokio mutex for a bounded time and are
//! then turned away as busy.

use super::PipelineError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Clone)]
pub struct UploadLock {
    lock: Arc<Mutex<()>>,
    timeout: Duration,
}

impl UploadLock {
    pub fn new(timeout: Duration) -> Self {
        Self {
            lock: Arc::new(Mutex::new(())),
            timeout,
        }
    }

    /// Wait up to the configured timeout for exclusive access.
    pub async fn acquire(&self) -> Result<OwnedMutexGuard<()>, PipelineError> {
        match tokio::time::timeout(self.timeout, self.lock.clone().lock_owned()).await {
            Ok(guard) => Ok(guard),
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Upload rejected, another upload is still running"
                );
                Err(PipelineError::Busy)
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn is_held(&self) -> bool {
        self.lock.try_lock().is_err()
    }
}
