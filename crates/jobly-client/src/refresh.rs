//! Single-flight coordination of access token refreshes.
//!
//! At most one refresh runs per client. The first request to need a new
//! token becomes the leader and performs the refresh; every request that
//! needs one while it is running is queued and receives the leader's
//! outcome, in the order it was queued.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use tokio::sync::oneshot;
use tracing::debug;

use crate::error::RefreshError;
use crate::metrics::record_refresh_queued;

type RefreshOutcome = Result<String, RefreshError>;

#[derive(Default)]
struct RefreshState {
    in_progress: bool,
    waiters: VecDeque<oneshot::Sender<RefreshOutcome>>,
}

/// Refresh-in-progress flag plus the FIFO queue of waiting requests.
///
/// The lock is only held for bookkeeping, never across the refresh call.
#[derive(Default)]
pub struct RefreshCoordinator {
    state: Mutex<RefreshState>,
}

/// Role handed out by [`RefreshCoordinator::begin`].
pub enum RefreshTicket<'a> {
    /// Caller must perform the refresh and settle the lease.
    Leader(RefreshLease<'a>),
    /// A refresh is already running; wait for its outcome.
    Follower(RefreshWaiter),
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the current refresh cycle, or start one if none is running.
    pub fn begin(&self) -> RefreshTicket<'_> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        if state.in_progress {
            let (tx, rx) = oneshot::channel();
            state.waiters.push_back(tx);
            debug!(queued = state.waiters.len(), "Token refresh in progress, request queued");
            record_refresh_queued();
            return RefreshTicket::Follower(RefreshWaiter { rx });
        }

        state.in_progress = true;
        RefreshTicket::Leader(RefreshLease {
            coordinator: self,
            settled: false,
        })
    }

    /// True while a refresh cycle is running.
    pub fn is_refreshing(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .in_progress
    }

    /// Number of requests waiting on the running refresh.
    pub fn pending(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .waiters
            .len()
    }

    /// Clear the flag and hand the outcome to every waiter, oldest first.
    /// Both happen under one lock so no request can slip in between.
    fn settle(&self, outcome: &RefreshOutcome) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.in_progress = false;

        let waiters = std::mem::take(&mut state.waiters);
        drop(state);

        for waiter in waiters {
            // A waiter whose request was dropped no longer cares.
            let _ = waiter.send(outcome.clone());
        }
    }
}

/// Leadership of one refresh cycle.
///
/// Dropping an unsettled lease (e.g. the leading request was cancelled)
/// clears the flag and hands the queued requests an abandoned outcome, so
/// one of them can lead the next cycle.
pub struct RefreshLease<'a> {
    coordinator: &'a RefreshCoordinator,
    settled: bool,
}

impl RefreshLease<'_> {
    /// Publish the refresh outcome to every queued request.
    pub fn complete(mut self, outcome: &RefreshOutcome) {
        self.settled = true;
        self.coordinator.settle(outcome);
    }
}

impl Drop for RefreshLease<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.coordinator.settle(&Err(RefreshError::abandoned()));
        }
    }
}

/// Pending continuation of a queued request.
pub struct RefreshWaiter {
    rx: oneshot::Receiver<RefreshOutcome>,
}

impl RefreshWaiter {
    /// Wait for the running refresh to settle.
    pub async fn wait(self) -> RefreshOutcome {
        self.rx
            .await
            .unwrap_or_else(|_| Err(RefreshError::abandoned()))
    }
}
