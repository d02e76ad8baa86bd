//! Process-local cancellation token.
//!
//! Signal handlers only flip this flag; every blocking loop in the channel
//! polls it between wait slices instead of relying on signal delivery to
//! interrupt a kernel wait.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cloneable shutdown flag shared between a signal handler and the
/// producer/consumer loops.
#[derive(Debug, Clone, Default)]
pub struct ShutdownToken {
    cancelled: Arc<AtomicBool>,
}

impl ShutdownToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests shutdown. Idempotent; safe to call from a signal handler
    /// thread.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
