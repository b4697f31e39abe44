//! Work-queue observers.
//!
//! Two independently polled views of the queue:
//!
//! - **Status** (`/workqueue/status`): the current running entry with its
//!   progress and configuration. Published only when the current entry's
//!   identity changes - identity being the entry's stable `uuid`, not a
//!   field-by-field comparison, so nested progress churn under the same
//!   entry stays quiet at this layer.
//! - **State** (`/workqueue/`): the full waiting/finished/current lists,
//!   fetched on a shorter cadence and republished on every successful poll
//!   with no suppression. Consumers that want fine-grained progress follow
//!   this stream.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::trace;

use crate::api::{WorkQueueApi, WorkQueueState, WorkQueueStatus};

use super::poller::{self, PollConfig, PollHandle};

/// Default interval between status polls.
pub const WQ_STATUS_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Default interval between full-state polls.
pub const WQ_STATE_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// The stable identity of the current running entry, if any.
fn current_uuid(status: &WorkQueueStatus) -> Option<&str> {
    status.current.as_ref().map(|entry| entry.item.uuid.as_str())
}

/// Whether the current running entry changed identity.
fn should_publish(last: &WorkQueueStatus, next: &WorkQueueStatus) -> bool {
    current_uuid(last) != current_uuid(next)
}

/// Observer for the work-queue status and state streams.
///
/// Starts polling on construction; tear down with [`shutdown`] or by
/// dropping the observer.
///
/// [`shutdown`]: WorkQueueObserver::shutdown
pub struct WorkQueueObserver {
    status_rx: watch::Receiver<WorkQueueStatus>,
    state_rx: watch::Receiver<WorkQueueState>,
    status_handle: PollHandle,
    state_handle: PollHandle,
}

impl WorkQueueObserver {
    /// Start observing with the default cadences.
    pub fn start<A>(api: A) -> Self
    where
        A: WorkQueueApi + Clone + 'static,
    {
        Self::with_config(
            api,
            PollConfig::fixed(WQ_STATUS_POLL_INTERVAL),
            PollConfig::fixed(WQ_STATE_POLL_INTERVAL),
        )
    }

    /// Start observing with custom poll timing for each stream.
    pub fn with_config<A>(api: A, status_config: PollConfig, state_config: PollConfig) -> Self
    where
        A: WorkQueueApi + Clone + 'static,
    {
        let (status_tx, status_rx) = watch::channel(WorkQueueStatus::default());
        let (state_tx, state_rx) = watch::channel(WorkQueueState::default());

        let status_api = Arc::new(api.clone());
        let mut last = WorkQueueStatus::default();
        let status_handle = poller::spawn(
            "workqueue/status",
            status_config,
            move || {
                let api = Arc::clone(&status_api);
                async move { api.status().await }
            },
            move |snapshot: WorkQueueStatus| {
                if should_publish(&last, &snapshot) {
                    last = snapshot.clone();
                    let _ = status_tx.send(snapshot);
                } else {
                    trace!("workqueue current entry unchanged, suppressing update");
                }
            },
        );

        let state_api = Arc::new(api);
        let state_handle = poller::spawn(
            "workqueue/state",
            state_config,
            move || {
                let api = Arc::clone(&state_api);
                async move { api.state().await }
            },
            move |snapshot: WorkQueueState| {
                // Full state always republishes; this is the fine-grained
                // progress channel.
                let _ = state_tx.send(snapshot);
            },
        );

        Self {
            status_rx,
            state_rx,
            status_handle,
            state_handle,
        }
    }

    /// Subscribe to the status stream (current entry identity changes).
    pub fn subscribe_status(&self) -> watch::Receiver<WorkQueueStatus> {
        self.status_rx.clone()
    }

    /// Subscribe to the full-state stream (every successful poll).
    pub fn subscribe_state(&self) -> watch::Receiver<WorkQueueState> {
        self.state_rx.clone()
    }

    /// Last published queue status.
    pub fn status(&self) -> WorkQueueStatus {
        self.status_rx.borrow().clone()
    }

    /// Last published queue state.
    pub fn state(&self) -> WorkQueueState {
        self.state_rx.borrow().clone()
    }

    /// Stop both loops. In-flight responses are discarded.
    pub fn shutdown(&self) {
        self.status_handle.cancel();
        self.state_handle.cancel();
    }
}
