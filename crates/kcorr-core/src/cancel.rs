//! Cooperative cancellation for long-running correlation jobs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::errors::{CorrError, ErrorInfo};

/// Shared flag polled by engines between blocks, shells and frames.
///
/// Cloning the token shares the underlying flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation of every computation observing this token.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Returns true once cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Returns an error when cancellation has been requested.
    pub fn check(&self, stage: &str) -> Result<(), CorrError> {
        if self.is_cancelled() {
            return Err(CorrError::Cancelled(
                ErrorInfo::new("cancelled", "computation cancelled by caller")
                    .with_context("stage", stage),
            ));
        }
        Ok(())
    }
}
