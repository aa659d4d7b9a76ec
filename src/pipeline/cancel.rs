//! Cooperative cancellation token.
//!
//! One token is created per batch run and threaded through extraction and
//! every segment call. Once raised it is permanent; there is no resume.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::error::PipelineError;

/// Shared cancellation signal. Cloning shares the underlying flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the signal. Irreversible for the lifetime of the token.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Suspension-point check: `Err(Cancelled)` once the signal is raised.
    pub fn check(&self) -> Result<(), PipelineError> {
        if self.is_cancelled() {
            Err(PipelineError::Cancelled)
        } else {
            Ok(())
        }
    }
}
