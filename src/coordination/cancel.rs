//! Cooperative cancellation
//!
//! A `CancellationToken` is a shared flag plus a list of wake callbacks.
//! Workers poll the flag at loop boundaries; parked waiters are woken through
//! the callbacks so they can re-check their predicate.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use log::debug;

type WakeFn = Box<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct TokenInner {
    cancelled: AtomicBool,
    next_id: AtomicU64,
    wakers: Mutex<Vec<(u64, WakeFn)>>,
}

/// Clonable handle for requesting and observing cancellation
#[derive(Clone, Default)]
pub struct CancellationToken {
    inner: Arc<TokenInner>,
}

/// Keeps a wake callback registered; dropping it removes the callback.
#[must_use = "dropping the registration removes the callback"]
pub struct CancelRegistration {
    token: CancellationToken,
    id: Option<u64>,
}

impl Drop for CancelRegistration {
    fn drop(&mut self) {
        if let Some(id) = self.id.take() {
            let mut wakers = self.token.inner.wakers.lock().unwrap_or_else(|e| e.into_inner());
            wakers.retain(|(registered, _)| *registered != id);
        }
    }
}

impl CancellationToken {
    /// Create a token that has not been cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Only the first call runs the wake callbacks.
    pub fn cancel(&self) {
        if self.inner.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        debug!("Cancellation requested");

        let wakers = {
            let mut wakers = self.inner.wakers.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::take(&mut *wakers)
        };
        for (_, wake) in wakers {
            wake();
        }
    }

    /// Check if cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Register a callback to run on cancellation.
    ///
    /// Runs immediately if the token is already cancelled. The callback stays
    /// registered until the returned handle is dropped.
    pub fn on_cancel<F>(&self, wake: F) -> CancelRegistration
    where
        F: Fn() + Send + Sync + 'static,
    {
        let mut wakers = self.inner.wakers.lock().unwrap_or_else(|e| e.into_inner());
        if self.is_cancelled() {
            drop(wakers);
            wake();
            return CancelRegistration {
                token: self.clone(),
                id: None,
            };
        }

        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        wakers.push((id, Box::new(wake)));
        CancelRegistration {
            token: self.clone(),
            id: Some(id),
        }
    }

    /// Number of callbacks currently waiting for cancellation
    pub fn registered(&self) -> usize {
        self.inner.wakers.lock().map(|w| w.len()).unwrap_or_else(|e| e.into_inner().len())
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
