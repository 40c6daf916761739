//! Cooperative cancellation for long page loops.
//!
//! Page operations poll the flag between pages; a raised flag stops the loop
//! before the next page is rendered and the partial output is dropped.

use crate::error::PdfPagesError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cloneable cancel flag. All clones observe the same state.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Return `Err(Cancelled)` if `flag` has been raised.
pub(crate) fn checkpoint(
    flag: Option<&CancelFlag>,
    completed: usize,
    total: usize,
) -> Result<(), PdfPagesError> {
    match flag {
        Some(f) if f.is_cancelled() => Err(PdfPagesError::Cancelled { completed, total }),
        _ => Ok(()),
    }
}
