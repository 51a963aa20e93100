//! Run-level cancellation for in-flight sync pipelines.

use std::sync::Arc;

use tokio::sync::watch;

/// Cloneable cancellation handle shared by a sync run and its caller.
///
/// Cancelling stops the orchestrator from starting new targets and wakes
/// every pipeline parked on [`CancelToken::cancelled`]. Network stages react
/// to it; local placement always runs to completion once started, so final
/// directories are never torn down by a cancel.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    /// Request cancellation. Idempotent; every clone observes it.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the token is cancelled.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        // wait_for only errors when the sender is dropped, and we hold it.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}
