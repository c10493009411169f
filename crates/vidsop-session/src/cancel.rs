//! One-way cancellation flags.
//!
//! A [`CancelToken`] starts unset and can only transition to cancelled;
//! there is no reset. Long-running media work holds a [`watch::Receiver`]
//! view and races it against child-process completion, so a flip is
//! observed promptly without polling.

use std::sync::Arc;

use tokio::sync::watch;

#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Flip the flag. Idempotent; there is no way back to the unset state.
    pub fn cancel(&self) {
        // send_replace stores the value even with zero live receivers,
        // so a cancel issued between jobs is seen by later subscribers.
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// A receiver view suitable for `tokio::select!` against process exit.
    pub fn watch(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}
