//! Container inventory observer.
//!
//! Polls `/containers/ps` and publishes the container list. The list is
//! compared by content against the last published value, so an unchanged
//! inventory never wakes subscribers.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::api::{ContainerEntry, ContainersApi};

use super::poller::{self, PollConfig, PollHandle};

/// Default interval between inventory polls.
pub const CONTAINERS_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Observer for the container inventory stream.
///
/// Starts polling on construction; tear down with [`shutdown`] or by
/// dropping the observer.
///
/// [`shutdown`]: ContainersObserver::shutdown
pub struct ContainersObserver {
    list_rx: watch::Receiver<Vec<ContainerEntry>>,
    handle: PollHandle,
}

impl ContainersObserver {
    /// Start observing with the default poll interval.
    pub fn start<A>(api: A) -> Self
    where
        A: ContainersApi + 'static,
    {
        Self::with_config(api, PollConfig::fixed(CONTAINERS_POLL_INTERVAL))
    }

    /// Start observing with custom poll timing.
    pub fn with_config<A>(api: A, config: PollConfig) -> Self
    where
        A: ContainersApi + 'static,
    {
        let (list_tx, list_rx) = watch::channel(Vec::new());
        let api = Arc::new(api);

        let handle = poller::spawn(
            "containers/ps",
            config,
            move || {
                let api = Arc::clone(&api);
                async move { api.ps().await }
            },
            move |snapshot| {
                list_tx.send_if_modified(|current: &mut Vec<ContainerEntry>| {
                    if *current == snapshot.result {
                        false
                    } else {
                        *current = snapshot.result;
                        true
                    }
                });
            },
        );

        Self { list_rx, handle }
    }

    /// Subscribe to the container list stream.
    pub fn subscribe(&self) -> watch::Receiver<Vec<ContainerEntry>> {
        self.list_rx.clone()
    }

    /// Last published container list.
    pub fn containers(&self) -> Vec<ContainerEntry> {
        self.list_rx.borrow().clone()
    }

    /// Stop polling. In-flight responses are discarded.
    pub fn shutdown(&self) {
        self.handle.cancel();
    }
}
