//! Cooperative cancellation
//!
//! Signal handlers and tests flip a [`CancellationFlag`]; the sampling loop
//! checks it at the top of every iteration. A read or publish already in
//! flight always completes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared cancellation flag. Clones observe the same state.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancellationFlag {
    /// Flag that is not yet cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            log::debug!("cancellation requested");
        }
    }

    /// Whether [`cancel`](Self::cancel) has been called on any clone
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let flag = CancellationFlag::new();
        let handler_copy = flag.clone();
        assert!(!flag.is_cancelled());

        handler_copy.cancel();
        handler_copy.cancel();
        assert!(flag.is_cancelled());
    }
}
