//! Configuration set merger.
//!
//! Maintains a uuid-keyed set of configuration entries sourced from two
//! independently polled list endpoints (`/s3tests/config`, `/bench/config`)
//! and publishes one list stream per kind. Membership is tracked by
//! identifier-set difference rather than fetch-and-replace, so a consumer
//! holding an entry keeps the exact value it got as long as that uuid stays
//! listed.
//!
//! Per poll of one kind: unknown uuids are inserted, uuids of that kind
//! missing from the poll are deleted, and the kind's stream republishes
//! only if membership actually changed. A known uuid is never overwritten,
//! even if the backend changed its payload - content edits under a stable
//! id are invisible here until the id is recycled. The two kinds publish
//! independently of each other.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tracing::debug;

use crate::api::{BenchApi, BenchConfigEntry, S3TestsApi, S3TestsConfigItem};

use super::poller::{self, PollConfig, PollHandle};

/// Default interval between config list polls.
pub const CONFIG_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Default jitter bound; both list loops start together when the dashboard
/// connects, so they get spread out.
pub const CONFIG_POLL_JITTER: Duration = Duration::from_millis(1000);

/// Which endpoint a tracked entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKind {
    S3Tests,
    Bench,
}

/// Payload of a tracked entry.
#[derive(Debug, Clone, PartialEq)]
enum ConfigPayload {
    S3Tests(S3TestsConfigItem),
    Bench(BenchConfigEntry),
}

/// One tracked configuration entry.
#[derive(Debug, Clone, PartialEq)]
struct TrackedEntry {
    kind: ConfigKind,
    payload: ConfigPayload,
}

/// The keyed set shared by both poll loops.
type EntryMap = HashMap<String, TrackedEntry>;

/// Fold one poll result of `kind` into the map.
///
/// Returns true if membership changed (any insertion or deletion). Known
/// uuids keep their first-seen payload.
fn merge_poll(
    map: &mut EntryMap,
    kind: ConfigKind,
    entries: Vec<(String, ConfigPayload)>,
) -> bool {
    let mut changed = false;
    let mut seen: HashSet<String> = HashSet::with_capacity(entries.len());

    for (uuid, payload) in entries {
        seen.insert(uuid.clone());
        if map.contains_key(&uuid) {
            continue;
        }
        map.insert(uuid, TrackedEntry { kind, payload });
        changed = true;
    }

    map.retain(|uuid, entry| {
        if entry.kind != kind || seen.contains(uuid) {
            return true;
        }
        changed = true;
        false
    });

    changed
}

/// Observer maintaining both configuration list streams.
///
/// Starts polling on construction; tear down with [`shutdown`] or by
/// dropping the observer.
///
/// [`shutdown`]: ConfigsObserver::shutdown
pub struct ConfigsObserver {
    s3tests_rx: watch::Receiver<Vec<S3TestsConfigItem>>,
    bench_rx: watch::Receiver<Vec<BenchConfigEntry>>,
    s3tests_handle: PollHandle,
    bench_handle: PollHandle,
}

impl ConfigsObserver {
    /// Start observing with the default jittered interval.
    pub fn start<S, B>(s3tests: S, bench: B) -> Self
    where
        S: S3TestsApi + 'static,
        B: BenchApi + 'static,
    {
        Self::with_config(
            s3tests,
            bench,
            PollConfig::jittered(CONFIG_POLL_INTERVAL, CONFIG_POLL_JITTER),
        )
    }

    /// Start observing with custom poll timing (applied to both loops).
    pub fn with_config<S, B>(s3tests: S, bench: B, config: PollConfig) -> Self
    where
        S: S3TestsApi + 'static,
        B: BenchApi + 'static,
    {
        let (s3tests_tx, s3tests_rx) = watch::channel(Vec::new());
        let (bench_tx, bench_rx) = watch::channel(Vec::new());

        let entries: Arc<Mutex<EntryMap>> = Arc::new(Mutex::new(HashMap::new()));

        let s3tests = Arc::new(s3tests);
        let s3tests_entries = Arc::clone(&entries);
        let s3tests_handle = poller::spawn(
            "s3tests/config",
            config.clone(),
            move || {
                let api = Arc::clone(&s3tests);
                async move { api.config().await }
            },
            move |result| {
                let uuids: Vec<String> = result
                    .entries
                    .iter()
                    .map(|item| item.config.uuid.clone())
                    .collect();
                let keyed = result
                    .entries
                    .into_iter()
                    .map(|item| (item.config.uuid.clone(), ConfigPayload::S3Tests(item)))
                    .collect();

                let mut map = s3tests_entries
                    .lock()
                    .expect("config entry map lock poisoned");
                if !merge_poll(&mut map, ConfigKind::S3Tests, keyed) {
                    return;
                }
                let list: Vec<S3TestsConfigItem> = uuids
                    .iter()
                    .filter_map(|uuid| match map.get(uuid) {
                        Some(TrackedEntry {
                            payload: ConfigPayload::S3Tests(item),
                            ..
                        }) => Some(item.clone()),
                        _ => None,
                    })
                    .collect();
                drop(map);

                debug!(count = list.len(), "s3tests config set changed");
                let _ = s3tests_tx.send(list);
            },
        );

        let bench = Arc::new(bench);
        let bench_entries = Arc::clone(&entries);
        let bench_handle = poller::spawn(
            "bench/config",
            config,
            move || {
                let api = Arc::clone(&bench);
                async move { api.config().await }
            },
            move |result| {
                let uuids: Vec<String> =
                    result.entries.iter().map(|e| e.uuid.clone()).collect();
                let keyed = result
                    .entries
                    .into_iter()
                    .map(|entry| (entry.uuid.clone(), ConfigPayload::Bench(entry)))
                    .collect();

                let mut map = bench_entries
                    .lock()
                    .expect("config entry map lock poisoned");
                if !merge_poll(&mut map, ConfigKind::Bench, keyed) {
                    return;
                }
                let list: Vec<BenchConfigEntry> = uuids
                    .iter()
                    .filter_map(|uuid| match map.get(uuid) {
                        Some(TrackedEntry {
                            payload: ConfigPayload::Bench(entry),
                            ..
                        }) => Some(entry.clone()),
                        _ => None,
                    })
                    .collect();
                drop(map);

                debug!(count = list.len(), "bench config set changed");
                let _ = bench_tx.send(list);
            },
        );

        Self {
            s3tests_rx,
            bench_rx,
            s3tests_handle,
            bench_handle,
        }
    }

    /// Subscribe to the s3tests configuration list stream.
    pub fn subscribe_s3tests(&self) -> watch::Receiver<Vec<S3TestsConfigItem>> {
        self.s3tests_rx.clone()
    }

    /// Subscribe to the bench configuration list stream.
    pub fn subscribe_bench(&self) -> watch::Receiver<Vec<BenchConfigEntry>> {
        self.bench_rx.clone()
    }

    /// Last published s3tests configuration list.
    pub fn s3tests(&self) -> Vec<S3TestsConfigItem> {
        self.s3tests_rx.borrow().clone()
    }

    /// Last published bench configuration list.
    pub fn bench(&self) -> Vec<BenchConfigEntry> {
        self.bench_rx.borrow().clone()
    }

    /// Stop both loops. In-flight responses are discarded.
    pub fn shutdown(&self) {
        self.s3tests_handle.cancel();
        self.bench_handle.cancel();
    }
}
