//! Combined job status aggregator.
//!
//! One poll cycle fetches the s3tests and bench statuses concurrently and
//! processes them as a consistent pair, so a downstream update never mixes
//! a fresh view of one runner with a stale view of the other. If either
//! fetch fails the whole cycle is skipped and every stream keeps its last
//! value.
//!
//! Three streams are exposed: the per-resource reconciled statuses (each
//! with its own suppression rule) and the combined busy boolean, true iff
//! at least one runner reports busy. The busy signal is derived state only;
//! nothing ever writes it directly.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::trace;

use crate::api::{BenchApi, BenchRunDesc, BenchStatusResult, S3TestsApi};

use super::poller::{self, PollConfig, PollHandle};
use super::s3tests::{self, S3TestsStatus};
use super::STATUS_POLL_INTERVAL;

/// Reconciled benchmark runner status, as exposed to consumers.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchStatus {
    pub running: bool,
    pub busy: bool,
    pub item: Option<BenchRunDesc>,
}

/// Whether the new bench status is an externally meaningful change.
///
/// Unlike s3tests there is no progress granularity here; only the two
/// state flags matter.
fn bench_should_publish(last: Option<&BenchStatus>, next: &BenchStatus) -> bool {
    match last {
        None => true,
        Some(last) => last.running != next.running || last.busy != next.busy,
    }
}

fn reconcile_bench(snapshot: BenchStatusResult) -> BenchStatus {
    BenchStatus {
        running: snapshot.running,
        busy: snapshot.busy,
        item: snapshot.current,
    }
}

/// Joint observer over both job runners plus the combined busy signal.
///
/// Starts polling on construction; tear down with [`shutdown`] or by
/// dropping the aggregator.
///
/// [`shutdown`]: StatusAggregator::shutdown
pub struct StatusAggregator {
    busy_rx: watch::Receiver<bool>,
    s3tests_rx: watch::Receiver<Option<S3TestsStatus>>,
    bench_rx: watch::Receiver<Option<BenchStatus>>,
    handle: PollHandle,
}

impl StatusAggregator {
    /// Start the joint status cycle with the default interval.
    pub fn start<S, B>(s3tests: S, bench: B) -> Self
    where
        S: S3TestsApi + 'static,
        B: BenchApi + 'static,
    {
        Self::with_config(s3tests, bench, PollConfig::fixed(STATUS_POLL_INTERVAL))
    }

    /// Start the joint status cycle with custom poll timing.
    pub fn with_config<S, B>(s3tests: S, bench: B, config: PollConfig) -> Self
    where
        S: S3TestsApi + 'static,
        B: BenchApi + 'static,
    {
        let (busy_tx, busy_rx) = watch::channel(false);
        let (s3tests_tx, s3tests_rx) = watch::channel(None);
        let (bench_tx, bench_rx) = watch::channel(None);

        let s3tests = Arc::new(s3tests);
        let bench = Arc::new(bench);

        let mut last_s3tests: Option<S3TestsStatus> = None;
        let mut last_bench: Option<BenchStatus> = None;

        let handle = poller::spawn(
            "status",
            config,
            move || {
                let s3tests = Arc::clone(&s3tests);
                let bench = Arc::clone(&bench);
                async move {
                    // Either fetch failing skips the whole cycle, keeping
                    // the pair consistent.
                    let (s3tests_res, bench_res) =
                        tokio::join!(s3tests.status(), bench.status());
                    Ok((s3tests_res?, bench_res?))
                }
            },
            move |(s3tests_snapshot, bench_snapshot)| {
                let s3tests_status = s3tests::reconcile(s3tests_snapshot);
                if s3tests::should_publish(last_s3tests.as_ref(), &s3tests_status) {
                    last_s3tests = Some(s3tests_status.clone());
                    let _ = s3tests_tx.send(Some(s3tests_status));
                } else {
                    trace!("s3tests status unchanged, suppressing update");
                }

                let bench_status = reconcile_bench(bench_snapshot);
                if bench_should_publish(last_bench.as_ref(), &bench_status) {
                    last_bench = Some(bench_status.clone());
                    let _ = bench_tx.send(Some(bench_status));
                } else {
                    trace!("bench status unchanged, suppressing update");
                }

                let busy = last_s3tests.as_ref().is_some_and(|s| s.busy)
                    || last_bench.as_ref().is_some_and(|s| s.busy);
                let _ = busy_tx.send(busy);
            },
        );

        Self {
            busy_rx,
            s3tests_rx,
            bench_rx,
            handle,
        }
    }

    /// Subscribe to the combined busy signal.
    pub fn subscribe_busy(&self) -> watch::Receiver<bool> {
        self.busy_rx.clone()
    }

    /// Subscribe to the s3tests status stream.
    pub fn subscribe_s3tests(&self) -> watch::Receiver<Option<S3TestsStatus>> {
        self.s3tests_rx.clone()
    }

    /// Subscribe to the bench status stream.
    pub fn subscribe_bench(&self) -> watch::Receiver<Option<BenchStatus>> {
        self.bench_rx.clone()
    }

    /// Current combined busy value.
    pub fn busy(&self) -> bool {
        *self.busy_rx.borrow()
    }

    /// Last published s3tests status.
    pub fn s3tests(&self) -> Option<S3TestsStatus> {
        self.s3tests_rx.borrow().clone()
    }

    /// Last published bench status.
    pub fn bench(&self) -> Option<BenchStatus> {
        self.bench_rx.borrow().clone()
    }

    /// Stop the joint cycle. In-flight responses are discarded.
    pub fn shutdown(&self) {
        self.handle.cancel();
    }
}
