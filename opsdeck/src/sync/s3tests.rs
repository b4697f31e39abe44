//! S3 test-suite status observer.
//!
//! Polls `/s3tests/status` and maintains a hot stream of reconciled status
//! values. Most polls change nothing observable - the runner is idle, or a
//! run is busy but its rounded percentage has not moved - and those polls
//! are suppressed so subscribers only wake up for meaningful changes.
//!
//! # Suppression policy
//!
//! - both old and new status idle: equal, suppress (whatever else changed);
//! - busy flag flipped: publish;
//! - both busy with progress: publish iff the rounded percent differs.
//!   A new current item or changed raw counters with the same percent is
//!   deliberately suppressed to cap the update rate.
//!
//! Timestamp-only changes (`last_refreshed`) never publish on their own.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::trace;

use crate::api::{S3TestsApi, S3TestsCurrentRun, S3TestsStatusResult};

use super::poller::{self, PollConfig, PollHandle};

/// Default interval between status polls.
pub const STATUS_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Derived progress of a running test suite.
#[derive(Debug, Clone, PartialEq)]
pub struct S3TestsProgress {
    pub total: u64,
    pub done: u64,
    /// Percent complete, rounded to two decimal digits.
    pub percent: f64,
}

/// Reconciled test-suite runner status, as exposed to consumers.
#[derive(Debug, Clone, PartialEq)]
pub struct S3TestsStatus {
    pub busy: bool,
    pub last_refreshed: DateTime<Utc>,
    pub item: Option<S3TestsCurrentRun>,
    pub progress: Option<S3TestsProgress>,
}

/// Percent complete, rounded to two decimal digits.
///
/// A zero total reports 0% rather than dividing; the backend sends zero
/// totals while a run is still collecting its test units.
pub(crate) fn percent_complete(done: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (done as f64 * 100.0 / total as f64 * 100.0).round() / 100.0
}

/// Parse a backend `date` field, falling back to now on malformed input.
pub(crate) fn parse_backend_date(date: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(date)
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

/// Compute the reconciled status from one raw snapshot.
pub(crate) fn reconcile(snapshot: S3TestsStatusResult) -> S3TestsStatus {
    let last_refreshed = parse_backend_date(&snapshot.date);
    if !snapshot.busy {
        return S3TestsStatus {
            busy: false,
            last_refreshed,
            item: None,
            progress: None,
        };
    }
    let item = snapshot.current;
    let progress = item.as_ref().map(|run| S3TestsProgress {
        total: run.progress.tests_total,
        done: run.progress.tests_run,
        percent: percent_complete(run.progress.tests_run, run.progress.tests_total),
    });
    S3TestsStatus {
        busy: true,
        last_refreshed,
        item,
        progress,
    }
}

/// Whether `next` differs from the last published status in an externally
/// meaningful field.
pub(crate) fn should_publish(last: Option<&S3TestsStatus>, next: &S3TestsStatus) -> bool {
    let Some(last) = last else {
        return true;
    };
    if last.busy != next.busy {
        return true;
    }
    if !next.busy {
        // Both idle; nothing observable changed.
        return false;
    }
    match (&last.progress, &next.progress) {
        (None, None) => false,
        (Some(prev), Some(curr)) => prev.percent != curr.percent,
        _ => true,
    }
}

/// Observer for the standalone s3tests status stream.
///
/// Starts polling on construction; tear down with [`shutdown`] or by
/// dropping the observer.
///
/// [`shutdown`]: S3TestsStatusObserver::shutdown
pub struct S3TestsStatusObserver {
    status_rx: watch::Receiver<Option<S3TestsStatus>>,
    handle: PollHandle,
}

impl S3TestsStatusObserver {
    /// Start observing with the default poll interval.
    pub fn start<A>(api: A) -> Self
    where
        A: S3TestsApi + 'static,
    {
        Self::with_config(api, PollConfig::fixed(STATUS_POLL_INTERVAL))
    }

    /// Start observing with custom poll timing.
    pub fn with_config<A>(api: A, config: PollConfig) -> Self
    where
        A: S3TestsApi + 'static,
    {
        let (status_tx, status_rx) = watch::channel(None);
        let api = Arc::new(api);
        let mut last: Option<S3TestsStatus> = None;

        let handle = poller::spawn(
            "s3tests/status",
            config,
            move || {
                let api = Arc::clone(&api);
                async move { api.status().await }
            },
            move |snapshot| {
                let status = reconcile(snapshot);
                if should_publish(last.as_ref(), &status) {
                    last = Some(status.clone());
                    let _ = status_tx.send(Some(status));
                } else {
                    trace!("s3tests status unchanged, suppressing update");
                }
            },
        );

        Self { status_rx, handle }
    }

    /// Subscribe to the status stream. The receiver starts at the last
    /// published value (`None` until the first successful poll).
    pub fn subscribe(&self) -> watch::Receiver<Option<S3TestsStatus>> {
        self.status_rx.clone()
    }

    /// Last published status.
    pub fn current(&self) -> Option<S3TestsStatus> {
        self.status_rx.borrow().clone()
    }

    /// Stop polling. In-flight responses are discarded.
    pub fn shutdown(&self) {
        self.handle.cancel();
    }
}
