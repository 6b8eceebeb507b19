//! Scoped guard over a dispatcher's request lock.
//!
//! [`DispatchGuard`] owns the lock for the duration of a request. Dropping
//! it releases the lock immediately, unless [`DispatchGuard::defer`] was
//! called, in which case ownership of the lock moves into a
//! [`ScheduledRelease`] task that releases it once the delay has elapsed.
//!
//! Release happens exactly once on every exit path: the held lock lives in
//! an `Option` that is taken on drop, so it can only be handed off or
//! dropped a single time.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::task::JoinHandle;

/// A held request lock with optional deferred release.
#[derive(Debug)]
pub struct DispatchGuard {
    held: Option<OwnedMutexGuard<()>>,
    deferred: Option<Duration>,
}

impl DispatchGuard {
    /// Waits for `lock` and wraps the held guard.
    ///
    /// Only the calling task is suspended while waiting.
    pub async fn acquire(lock: Arc<Mutex<()>>) -> Self {
        Self {
            held: Some(lock.lock_owned().await),
            deferred: None,
        }
    }

    /// Postpones release until `delay` after this guard is dropped.
    ///
    /// Calling it again replaces the previous delay.
    pub fn defer(&mut self, delay: Duration) {
        self.deferred = Some(delay);
    }

    /// Returns the pending release delay, if any.
    #[must_use]
    pub const fn deferred(&self) -> Option<Duration> {
        self.deferred
    }
}

impl Drop for DispatchGuard {
    fn drop(&mut self) {
        let Some(held) = self.held.take() else {
            return;
        };

        match self.deferred {
            Some(delay) if !delay.is_zero() => {
                if ScheduledRelease::spawn(held, delay).is_none() {
                    tracing::warn!("No async runtime available, releasing request lock immediately");
                }
            }
            _ => drop(held),
        }
    }
}

/// A timer task that owns a request lock and releases it when it fires.
#[derive(Debug)]
pub struct ScheduledRelease {
    handle: JoinHandle<()>,
}

impl ScheduledRelease {
    /// Hands `held` to a timer task that drops it after `delay`.
    ///
    /// Returns `None` (after releasing `held`) when called outside a Tokio
    /// runtime.
    pub fn spawn(held: OwnedMutexGuard<()>, delay: Duration) -> Option<Self> {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            drop(held);
            return None;
        };

        let handle = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            drop(held);
            tracing::debug!("Rate limit window elapsed, request lock released");
        });

        Some(Self { handle })
    }

    /// Returns `true` once the lock has been released.
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.handle.is_finished()
    }
}
