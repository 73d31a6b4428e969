use std::sync::{
    atomic::{AtomicUsize, Ordering::SeqCst},
    Arc,
};

use tokio::sync::Notify;

/// Tracks in-flight operations so that shutdown can wait for them to land.
///
/// Each tracked operation holds an [`InFlightGuard`]; the count is decremented
/// when the guard is dropped, never before, so an operation is "in flight"
/// until its enqueue attempt has fully completed.
#[derive(Clone, Default)]
pub(crate) struct InFlightTracker {
    state: Arc<TrackerState>,
}

#[derive(Default)]
struct TrackerState {
    count: AtomicUsize,
    idle: Notify,
}

pub(crate) struct InFlightGuard {
    state: Arc<TrackerState>,
}

impl InFlightTracker {
    /// Registers a new in-flight operation.
    pub fn track(&self) -> InFlightGuard {
        self.state.count.fetch_add(1, SeqCst);
        InFlightGuard {
            state: Arc::clone(&self.state),
        }
    }

    /// Waits until no operations are in flight.
    ///
    /// Returns immediately if the tracker is already idle.
    pub async fn wait_idle(&self) {
        loop {
            // Register for notification before checking the count, so a guard
            // dropped between the check and the await cannot be missed.
            let mut notified = std::pin::pin!(self.state.idle.notified());
            notified.as_mut().enable();

            if self.state.count.load(SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.state.count.fetch_sub(1, SeqCst) == 1 {
            self.state.idle.notify_waiters();
        }
    }
}
