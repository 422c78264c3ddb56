//! Cooperative cancellation for a single run.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::info;

/// Per-run cancel signal.
///
/// Created clear at run start and set by an explicit stop request. The signal
/// is observed, never preempting: the dispatcher checks it before starting
/// each node, and long-running executors race their I/O against
/// [`cancelled`](CancelSignal::cancelled). A node already running finishes
/// (or fails) on its own.
#[derive(Clone, Default)]
pub struct CancelSignal {
    cancelled: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl CancelSignal {
    /// Create a new, clear signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    ///
    /// Sets the flag and wakes all waiters. Safe to call multiple times.
    pub fn request_cancel(&self) {
        let was_cancelled = self.cancelled.swap(true, Ordering::SeqCst);
        if !was_cancelled {
            info!("Run cancellation requested");
            self.notify.notify_waiters();
        }
    }

    /// Check whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Wait until cancellation is requested.
    ///
    /// Returns immediately when the signal is already set. Intended for
    /// `tokio::select!` races inside executors awaiting network I/O or
    /// timers.
    pub async fn cancelled(&self) {
        if self.is_cancelled() {
            return;
        }
        self.notify.notified().await;
    }
}
