//! Stuck-request watchdog.
//!
//! A cancellable scheduled task tied to the lifetime of one upstream
//! request. On expiry it runs its callback (which appends an advisory
//! message) without canceling the underlying request; dropping the guard
//! releases the timer deterministically.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

pub struct WatchdogGuard {
    handle: JoinHandle<()>,
}

impl WatchdogGuard {
    /// Cancels the timer. Called when the request completes in time.
    pub fn disarm(self) {
        // Drop does the work.
    }
}

impl Drop for WatchdogGuard {
    fn drop(&mut self) {
        self.handle.abort();
        debug!("Watchdog released");
    }
}

/// Arms a watchdog that fires `on_expiry` once after `delay` unless the
/// returned guard is dropped first.
pub fn arm<F>(delay: Duration, on_expiry: F) -> WatchdogGuard
where
    F: FnOnce() + Send + 'static,
{
    let handle = tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        on_expiry();
    });
    WatchdogGuard { handle }
}
