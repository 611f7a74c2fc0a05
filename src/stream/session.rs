//! Stream cancellation.
//!
//! One cancellation handle exists per in-flight request. The session slot
//! enforces the single-session rule: beginning a new session cancels
//! whatever was active before handing out the new token.

use std::sync::{Arc, Mutex};

use tokio::sync::watch;

/// Create a linked cancel handle/token pair.
pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx: Arc::new(tx) }, CancelToken { rx })
}

/// The side that requests cancellation. Cheap to clone; a stop button can
/// hold one while the streaming loop holds the token.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

/// The side the streaming loop selects on.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// Resolves when cancellation is requested. If every handle is gone
    /// without cancelling, this never resolves — the stream just runs to
    /// completion.
    pub async fn cancelled(&mut self) {
        loop {
            if *self.rx.borrow() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }
}

/// Holder of the single active session's cancel handle.
#[derive(Debug, Default)]
pub struct SessionSlot {
    active: Mutex<Option<CancelHandle>>,
}

impl SessionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a new session: abort any active one, install a fresh handle,
    /// and return its token.
    pub fn begin(&self) -> CancelToken {
        let (handle, token) = cancel_pair();
        let mut active = self.active.lock().unwrap();
        if let Some(prev) = active.replace(handle) {
            prev.cancel();
        }
        token
    }

    /// Cancel the active session, if any. Idempotent.
    pub fn abort_active(&self) {
        if let Some(handle) = self.active.lock().unwrap().as_ref() {
            handle.cancel();
        }
    }

    /// A clone of the active handle, for an external stop control.
    pub fn handle(&self) -> Option<CancelHandle> {
        self.active.lock().unwrap().clone()
    }

    /// Drop the active handle once its turn has fully wound down.
    pub fn clear(&self) {
        self.active.lock().unwrap().take();
    }
}
