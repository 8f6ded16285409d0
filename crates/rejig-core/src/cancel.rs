//! Cooperative cancellation.
//!
//! Long-running analyses (fixpoint solving, stub resolution) accept a token
//! and poll it at loop boundaries. There are no hard timeouts: an
//! unresponsive oracle call is the caller's concern.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

#[derive(Debug, Default, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Poll the token, turning cancellation into an early return.
    pub fn check(&self) -> Result<(), Canceled> {
        if self.is_cancelled() {
            Err(Canceled)
        } else {
            Ok(())
        }
    }
}

/// Marker error produced when a token trips mid-analysis.
///
/// Distinct from analysis outcomes: an unsatisfiable constraint set is a
/// result, a canceled run has no result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("operation canceled")]
pub struct Canceled;
