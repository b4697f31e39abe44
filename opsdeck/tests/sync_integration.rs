//! Integration tests for the status synchronization layer.
//!
//! Observers are wired to scripted API implementations and driven at short
//! poll intervals. The assertions cover the layer's update-suppression
//! contracts: idle statuses publish once, busy statuses publish per percent
//! change, the config merger republishes per membership change, cancelled
//! loops never publish again, and the combined busy signal is the OR of
//! both runners.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{watch, Notify};

use opsdeck::api::{
    ApiError, BenchApi, BenchConfig, BenchConfigEntry, BenchConfigParams, BenchConfigResult,
    BenchPostResult, BenchProgress, BenchResultsResult, BenchRunDesc, BenchStatusResult,
    ContainerEntry, ContainerImageName, ContainersApi, ContainersPsResult, S3TestsApi,
    S3TestsCollectedUnits, S3TestsConfig, S3TestsConfigDesc, S3TestsConfigEntry,
    S3TestsConfigItem, S3TestsConfigPostResult, S3TestsConfigResult, S3TestsContainerConfig,
    S3TestsCurrentRun, S3TestsProgressCounters, S3TestsResultsResult, S3TestsStatusResult,
    S3TestsUnitsConfig, WorkQueueApi, WorkQueueEntry, WorkQueueEntryKind, WorkQueueItemConfig,
    WorkQueueItemProgress, WorkQueueProgress, WorkQueueState, WorkQueueStatus,
    WorkQueueStatusEntry,
};
use opsdeck::sync::{
    poller::PollConfig, ConfigsObserver, ContainersObserver, S3TestsStatusObserver,
    StatusAggregator, WorkQueueObserver,
};

// ============================================================================
// Scripted API implementations
// ============================================================================

/// A scripted response sequence. Responses are served in order; once the
/// queue is drained the last response repeats, and tests can push further
/// phases at any time.
#[derive(Clone)]
struct Script<T: Clone> {
    inner: Arc<Mutex<ScriptInner<T>>>,
}

struct ScriptInner<T> {
    queue: VecDeque<T>,
    last: Option<T>,
    served: usize,
}

impl<T: Clone> Script<T> {
    fn new(items: Vec<T>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ScriptInner {
                queue: items.into(),
                last: None,
                served: 0,
            })),
        }
    }

    fn push(&self, item: T) {
        self.inner.lock().unwrap().queue.push_back(item);
    }

    fn next(&self) -> T {
        let mut inner = self.inner.lock().unwrap();
        inner.served += 1;
        if let Some(item) = inner.queue.pop_front() {
            inner.last = Some(item.clone());
            item
        } else {
            inner.last.clone().expect("script has no responses")
        }
    }

    fn served(&self) -> usize {
        self.inner.lock().unwrap().served
    }
}

#[derive(Clone)]
struct MockS3Tests {
    status: Option<Script<S3TestsStatusResult>>,
    config: Option<Script<S3TestsConfigResult>>,
}

impl MockS3Tests {
    fn statuses(items: Vec<S3TestsStatusResult>) -> Self {
        Self {
            status: Some(Script::new(items)),
            config: None,
        }
    }

    fn configs(items: Vec<S3TestsConfigResult>) -> Self {
        Self {
            status: None,
            config: Some(Script::new(items)),
        }
    }
}

impl S3TestsApi for MockS3Tests {
    async fn status(&self) -> Result<S3TestsStatusResult, ApiError> {
        match &self.status {
            Some(script) => Ok(script.next()),
            None => Err(ApiError::Http("status not scripted".to_string())),
        }
    }

    async fn config(&self) -> Result<S3TestsConfigResult, ApiError> {
        match &self.config {
            Some(script) => Ok(script.next()),
            None => Err(ApiError::Http("config not scripted".to_string())),
        }
    }

    async fn results(&self) -> Result<S3TestsResultsResult, ApiError> {
        Err(ApiError::Http("results not scripted".to_string()))
    }

    async fn post_config(
        &self,
        _desc: &S3TestsConfigDesc,
    ) -> Result<S3TestsConfigPostResult, ApiError> {
        Err(ApiError::Http("post_config not scripted".to_string()))
    }
}

#[derive(Clone)]
struct MockBench {
    status: Option<Script<BenchStatusResult>>,
    config: Option<Script<BenchConfigResult>>,
}

impl MockBench {
    fn statuses(items: Vec<BenchStatusResult>) -> Self {
        Self {
            status: Some(Script::new(items)),
            config: None,
        }
    }

    fn configs(items: Vec<BenchConfigResult>) -> Self {
        Self {
            status: None,
            config: Some(Script::new(items)),
        }
    }
}

impl BenchApi for MockBench {
    async fn status(&self) -> Result<BenchStatusResult, ApiError> {
        match &self.status {
            Some(script) => Ok(script.next()),
            None => Err(ApiError::Http("status not scripted".to_string())),
        }
    }

    async fn config(&self) -> Result<BenchConfigResult, ApiError> {
        match &self.config {
            Some(script) => Ok(script.next()),
            None => Err(ApiError::Http("config not scripted".to_string())),
        }
    }

    async fn results(&self) -> Result<BenchResultsResult, ApiError> {
        Err(ApiError::Http("results not scripted".to_string()))
    }

    async fn post_config(&self, _config: &BenchConfig) -> Result<BenchPostResult, ApiError> {
        Err(ApiError::Http("post_config not scripted".to_string()))
    }

    async fn run(&self, _uuid: &str) -> Result<BenchPostResult, ApiError> {
        Err(ApiError::Http("run not scripted".to_string()))
    }
}

/// An s3tests API whose status call blocks until released, for cancel
/// tests.
#[derive(Clone)]
struct BlockingS3Tests {
    release: Arc<Notify>,
    calls: Arc<AtomicUsize>,
}

impl BlockingS3Tests {
    fn new() -> Self {
        Self {
            release: Arc::new(Notify::new()),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl S3TestsApi for BlockingS3Tests {
    async fn status(&self) -> Result<S3TestsStatusResult, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.release.notified().await;
        Ok(idle_s3_status())
    }

    async fn config(&self) -> Result<S3TestsConfigResult, ApiError> {
        Err(ApiError::Http("config not scripted".to_string()))
    }

    async fn results(&self) -> Result<S3TestsResultsResult, ApiError> {
        Err(ApiError::Http("results not scripted".to_string()))
    }

    async fn post_config(
        &self,
        _desc: &S3TestsConfigDesc,
    ) -> Result<S3TestsConfigPostResult, ApiError> {
        Err(ApiError::Http("post_config not scripted".to_string()))
    }
}

#[derive(Clone)]
struct MockContainers {
    ps: Script<ContainersPsResult>,
}

impl ContainersApi for MockContainers {
    async fn ps(&self) -> Result<ContainersPsResult, ApiError> {
        Ok(self.ps.next())
    }
}

#[derive(Clone)]
struct MockWorkQueue {
    status: Script<WorkQueueStatus>,
    state: Script<WorkQueueState>,
}

impl WorkQueueApi for MockWorkQueue {
    async fn status(&self) -> Result<WorkQueueStatus, ApiError> {
        Ok(self.status.next())
    }

    async fn state(&self) -> Result<WorkQueueState, ApiError> {
        Ok(self.state.next())
    }
}

// ============================================================================
// Snapshot builders
// ============================================================================

const DATE: &str = "2026-08-29T10:15:00Z";

fn fast() -> PollConfig {
    PollConfig::fixed(Duration::from_millis(10))
}

fn s3_config_entry(uuid: &str) -> S3TestsConfigEntry {
    S3TestsConfigEntry {
        uuid: uuid.to_string(),
        desc: S3TestsConfigDesc {
            name: format!("config-{uuid}"),
            config: S3TestsConfig {
                container: S3TestsContainerConfig {
                    image: "s3gw:latest".to_string(),
                    ports: vec![],
                    volumes: vec![],
                },
                tests: S3TestsUnitsConfig {
                    suite: "functional".to_string(),
                    ignore: vec![],
                    exclude: vec![],
                    include: vec![],
                },
            },
        },
    }
}

fn idle_s3_status() -> S3TestsStatusResult {
    S3TestsStatusResult {
        date: DATE.to_string(),
        busy: false,
        current: None,
    }
}

fn busy_s3_status(run_uuid: &str, done: u64, total: u64) -> S3TestsStatusResult {
    S3TestsStatusResult {
        date: DATE.to_string(),
        busy: true,
        current: Some(S3TestsCurrentRun {
            uuid: run_uuid.to_string(),
            time_start: DATE.to_string(),
            config: s3_config_entry("cfg-1"),
            progress: S3TestsProgressCounters {
                tests_total: total,
                tests_run: done,
            },
        }),
    }
}

fn bench_status(busy: bool) -> BenchStatusResult {
    BenchStatusResult {
        date: DATE.to_string(),
        running: busy,
        busy,
        current: busy.then(|| BenchRunDesc {
            config: bench_config("bench-run"),
            progress: BenchProgress {
                is_running: true,
                is_done: false,
                time_start: Some(DATE.to_string()),
                time_end: None,
                duration: 60,
                targets: vec![],
            },
        }),
    }
}

fn bench_config(name: &str) -> BenchConfig {
    BenchConfig {
        name: name.to_string(),
        params: BenchConfigParams {
            num_objects: 100,
            object_size: "1mb".to_string(),
            duration: "1m".to_string(),
        },
        targets: HashMap::new(),
    }
}

fn s3_config_result(uuids: &[&str]) -> S3TestsConfigResult {
    S3TestsConfigResult {
        date: DATE.to_string(),
        entries: uuids
            .iter()
            .map(|uuid| S3TestsConfigItem {
                config: s3_config_entry(uuid),
                tests: S3TestsCollectedUnits {
                    all: vec![],
                    filtered: vec![],
                },
            })
            .collect(),
    }
}

fn bench_config_result(uuids: &[&str]) -> BenchConfigResult {
    BenchConfigResult {
        date: DATE.to_string(),
        entries: uuids
            .iter()
            .map(|uuid| BenchConfigEntry {
                uuid: uuid.to_string(),
                config: bench_config(uuid),
            })
            .collect(),
    }
}

fn container(id: &str) -> ContainerEntry {
    ContainerEntry {
        command: vec!["/usr/bin/s3gw".to_string()],
        created: DATE.to_string(),
        started: DATE.to_string(),
        running: true,
        state: "running".to_string(),
        id: id.to_string(),
        image_id: "sha256:4f1b".to_string(),
        image_name: ContainerImageName {
            name: "s3gw".to_string(),
            tag: "latest".to_string(),
        },
        names: vec![format!("target-{id}")],
    }
}

fn ps_result(ids: &[&str]) -> ContainersPsResult {
    ContainersPsResult {
        date: DATE.to_string(),
        result: ids.iter().map(|id| container(id)).collect(),
    }
}

fn wq_status(uuid: &str, duration: i64) -> WorkQueueStatus {
    let item = WorkQueueEntry {
        uuid: uuid.to_string(),
        kind: WorkQueueEntryKind::Bench,
        is_running: true,
        is_done: false,
        time_start: Some(DATE.to_string()),
        time_end: None,
        duration,
    };
    WorkQueueStatus {
        is_running: true,
        current: Some(WorkQueueStatusEntry {
            item,
            progress: WorkQueueProgress {
                uuid: uuid.to_string(),
                is_running: true,
                is_done: false,
                time_start: DATE.to_string(),
                time_end: String::new(),
                duration,
                progress: WorkQueueItemProgress::Bench(BenchProgress {
                    is_running: true,
                    is_done: false,
                    time_start: None,
                    time_end: None,
                    duration,
                    targets: vec![],
                }),
            },
            config: WorkQueueItemConfig::Bench(BenchConfigEntry {
                uuid: "cfg-1".to_string(),
                config: bench_config("baseline"),
            }),
        }),
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Await the next publication on a stream, with a test-sized timeout.
async fn wait_changed<T>(rx: &mut watch::Receiver<T>) {
    tokio::time::timeout(Duration::from_secs(5), rx.changed())
        .await
        .expect("timed out waiting for a publication")
        .expect("stream closed");
}

/// Poll a condition until it holds, with a test-sized timeout.
async fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for condition"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Long enough for several 10ms poll cycles to pass.
async fn several_cycles() {
    tokio::time::sleep(Duration::from_millis(100)).await;
}

// ============================================================================
// Status reconciler
// ============================================================================

#[tokio::test]
async fn idle_statuses_publish_exactly_once() {
    let api = MockS3Tests::statuses(vec![idle_s3_status()]);
    let script = api.status.clone().unwrap();
    let observer = S3TestsStatusObserver::with_config(api, fast());

    let mut rx = observer.subscribe();
    wait_changed(&mut rx).await;
    let status = rx.borrow_and_update().clone().unwrap();
    assert!(!status.busy);

    several_cycles().await;
    assert!(script.served() >= 3, "several idle polls must have happened");
    assert!(
        !rx.has_changed().unwrap(),
        "idle polls after the first must not publish"
    );
}

#[tokio::test]
async fn busy_statuses_publish_iff_percent_changed() {
    let api = MockS3Tests::statuses(vec![busy_s3_status("run-1", 10, 100)]);
    let script = api.status.clone().unwrap();
    let observer = S3TestsStatusObserver::with_config(api, fast());

    let mut rx = observer.subscribe();
    wait_changed(&mut rx).await;
    let status = rx.borrow_and_update().clone().unwrap();
    assert_eq!(status.progress.as_ref().unwrap().percent, 10.0);

    // New run uuid and new raw counts, but the same 10.00 percent.
    script.push(busy_s3_status("run-2", 20, 200));
    several_cycles().await;
    assert!(
        !rx.has_changed().unwrap(),
        "same rounded percent must not publish"
    );

    // Percent moves.
    script.push(busy_s3_status("run-2", 21, 200));
    wait_changed(&mut rx).await;
    let status = rx.borrow_and_update().clone().unwrap();
    assert_eq!(status.progress.as_ref().unwrap().percent, 10.5);
}

#[tokio::test]
async fn busy_transition_publishes_both_ways() {
    let api = MockS3Tests::statuses(vec![idle_s3_status()]);
    let script = api.status.clone().unwrap();
    let observer = S3TestsStatusObserver::with_config(api, fast());

    let mut rx = observer.subscribe();
    wait_changed(&mut rx).await;
    assert!(!rx.borrow_and_update().clone().unwrap().busy);

    script.push(busy_s3_status("run-1", 0, 10));
    wait_changed(&mut rx).await;
    assert!(rx.borrow_and_update().clone().unwrap().busy);

    script.push(idle_s3_status());
    wait_changed(&mut rx).await;
    assert!(!rx.borrow_and_update().clone().unwrap().busy);
}

// ============================================================================
// Cancellation
// ============================================================================

#[tokio::test]
async fn cancel_with_response_in_flight_never_publishes() {
    let api = BlockingS3Tests::new();
    let release = Arc::clone(&api.release);
    let calls = Arc::clone(&api.calls);
    let observer = S3TestsStatusObserver::with_config(api, fast());

    // Let the loop enter its first call, then tear down while the
    // response is pending.
    wait_until(|| calls.load(Ordering::SeqCst) == 1).await;
    observer.shutdown();
    release.notify_waiters();
    several_cycles().await;

    assert!(observer.current().is_none(), "late response must not publish");
    assert_eq!(
        calls.load(Ordering::SeqCst),
        1,
        "no further poll may be scheduled after cancel"
    );
}

// ============================================================================
// Combined busy signal
// ============================================================================

#[tokio::test]
async fn combined_busy_is_or_of_both_resources() {
    for (s3_busy, bench_busy) in [(false, false), (true, false), (false, true), (true, true)] {
        let s3_snapshot = if s3_busy {
            busy_s3_status("run-1", 1, 10)
        } else {
            idle_s3_status()
        };
        let aggregator = StatusAggregator::with_config(
            MockS3Tests::statuses(vec![s3_snapshot]),
            MockBench::statuses(vec![bench_status(bench_busy)]),
            fast(),
        );

        // Both resources must have completed at least once.
        wait_until(|| aggregator.s3tests().is_some() && aggregator.bench().is_some()).await;
        assert_eq!(
            aggregator.busy(),
            s3_busy || bench_busy,
            "combination ({s3_busy}, {bench_busy})"
        );
        aggregator.shutdown();
    }
}

#[tokio::test]
async fn aggregator_failed_cycle_keeps_last_pair() {
    // Bench is never scripted, so every joint cycle fails and nothing is
    // ever published.
    let aggregator = StatusAggregator::with_config(
        MockS3Tests::statuses(vec![busy_s3_status("run-1", 1, 10)]),
        MockBench {
            status: None,
            config: None,
        },
        fast(),
    );

    several_cycles().await;
    assert!(aggregator.s3tests().is_none());
    assert!(aggregator.bench().is_none());
    assert!(!aggregator.busy());
}

// ============================================================================
// Config merger
// ============================================================================

#[tokio::test]
async fn merger_tracks_membership_and_republishes_once() {
    let bench = MockBench::configs(vec![bench_config_result(&["1", "2"])]);
    let bench_script = bench.config.clone().unwrap();
    let s3tests = MockS3Tests::configs(vec![s3_config_result(&[])]);

    let observer = ConfigsObserver::with_config(s3tests, bench, fast());
    let mut bench_rx = observer.subscribe_bench();
    let mut s3_rx = observer.subscribe_s3tests();

    wait_changed(&mut bench_rx).await;
    let uuids: Vec<String> = bench_rx
        .borrow_and_update()
        .iter()
        .map(|e| e.uuid.clone())
        .collect();
    assert_eq!(uuids, vec!["1", "2"]);

    // {1,2} -> {2,3}: one deletion, one insertion, exactly one republish.
    bench_script.push(bench_config_result(&["2", "3"]));
    wait_changed(&mut bench_rx).await;
    let uuids: Vec<String> = bench_rx
        .borrow_and_update()
        .iter()
        .map(|e| e.uuid.clone())
        .collect();
    assert_eq!(uuids, vec!["2", "3"]);

    several_cycles().await;
    assert!(
        !bench_rx.has_changed().unwrap(),
        "unchanged membership must not republish"
    );
    assert!(
        !s3_rx.has_changed().unwrap(),
        "bench membership changes must not touch the s3tests stream"
    );
}

#[tokio::test]
async fn merger_keeps_first_seen_payload_for_known_uuid() {
    let bench = MockBench::configs(vec![bench_config_result(&["1"])]);
    let bench_script = bench.config.clone().unwrap();
    let s3tests = MockS3Tests::configs(vec![s3_config_result(&[])]);

    let observer = ConfigsObserver::with_config(s3tests, bench, fast());
    wait_until(|| !observer.bench().is_empty()).await;
    let original_name = observer.bench()[0].config.name.clone();

    // Same uuid, edited payload, plus a new uuid to force a republish.
    let mut edited = bench_config_result(&["1", "9"]);
    edited.entries[0].config.name = "edited".to_string();
    bench_script.push(edited);

    wait_until(|| observer.bench().len() == 2).await;
    assert_eq!(
        observer.bench()[0].config.name,
        original_name,
        "known uuid must keep its first-seen payload"
    );
}

// ============================================================================
// Containers
// ============================================================================

#[tokio::test]
async fn container_list_publishes_on_content_change_only() {
    let api = MockContainers {
        ps: Script::new(vec![ps_result(&["a", "b"])]),
    };
    let script = api.ps.clone();
    let observer = ContainersObserver::with_config(api, fast());

    let mut rx = observer.subscribe();
    wait_changed(&mut rx).await;
    assert_eq!(rx.borrow_and_update().len(), 2);

    several_cycles().await;
    assert!(
        !rx.has_changed().unwrap(),
        "identical inventory must not republish"
    );

    script.push(ps_result(&["a"]));
    wait_changed(&mut rx).await;
    assert_eq!(rx.borrow_and_update().len(), 1);
}

// ============================================================================
// Work queue
// ============================================================================

#[tokio::test]
async fn workqueue_status_tracks_current_entry_identity() {
    let api = MockWorkQueue {
        status: Script::new(vec![wq_status("job-1", 10)]),
        state: Script::new(vec![WorkQueueState::default()]),
    };
    let status_script = api.status.clone();
    let observer = WorkQueueObserver::with_config(api, fast(), fast());

    let mut rx = observer.subscribe_status();
    wait_changed(&mut rx).await;
    assert_eq!(
        rx.borrow_and_update().current.as_ref().unwrap().item.uuid,
        "job-1"
    );

    // Same entry, progressed further: suppressed.
    status_script.push(wq_status("job-1", 42));
    several_cycles().await;
    assert!(
        !rx.has_changed().unwrap(),
        "unchanged current entry must not publish"
    );

    // Queue moved on to another entry.
    status_script.push(wq_status("job-2", 0));
    wait_changed(&mut rx).await;
    assert_eq!(
        rx.borrow_and_update().current.as_ref().unwrap().item.uuid,
        "job-2"
    );
}

#[tokio::test]
async fn workqueue_state_republishes_every_poll() {
    let api = MockWorkQueue {
        status: Script::new(vec![WorkQueueStatus::default()]),
        state: Script::new(vec![WorkQueueState::default()]),
    };
    let observer = WorkQueueObserver::with_config(api, fast(), fast());

    let mut rx = observer.subscribe_state();
    // The state stream has no suppression: even identical snapshots are
    // republished every cycle.
    for _ in 0..3 {
        wait_changed(&mut rx).await;
        rx.borrow_and_update();
    }
}
