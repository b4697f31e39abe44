//! opsdeck CLI - tail the backend status streams.
//!
//! Connects to an opsdeck backend, starts every observer, and logs each
//! stream update until Ctrl-C. Useful for watching what a dashboard would
//! see without running one.

use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::info;

use opsdeck::api::{ApiClient, BenchClient, ContainersClient, S3TestsClient, WorkQueueClient};
use opsdeck::logging;
use opsdeck::sync::poller::PollConfig;
use opsdeck::sync::{
    ConfigsObserver, ContainersObserver, StatusAggregator, WorkQueueObserver,
    CONFIG_POLL_INTERVAL, CONFIG_POLL_JITTER, CONTAINERS_POLL_INTERVAL, STATUS_POLL_INTERVAL,
    WQ_STATE_POLL_INTERVAL, WQ_STATUS_POLL_INTERVAL,
};

#[derive(Parser)]
#[command(name = "opsdeck")]
#[command(about = "Tail the backend status streams", long_about = None)]
struct Args {
    /// Backend API root URL
    #[arg(long, default_value = "http://127.0.0.1:7480/api")]
    api_url: String,

    /// Status poll interval in milliseconds
    #[arg(long, default_value_t = STATUS_POLL_INTERVAL.as_millis() as u64)]
    status_interval_ms: u64,

    /// Config list poll interval in milliseconds
    #[arg(long, default_value_t = CONFIG_POLL_INTERVAL.as_millis() as u64)]
    config_interval_ms: u64,

    /// Upper bound for the extra random delay between config polls,
    /// in milliseconds
    #[arg(long, default_value_t = CONFIG_POLL_JITTER.as_millis() as u64)]
    config_jitter_ms: u64,

    /// Container inventory poll interval in milliseconds
    #[arg(long, default_value_t = CONTAINERS_POLL_INTERVAL.as_millis() as u64)]
    containers_interval_ms: u64,

    /// Work-queue status poll interval in milliseconds
    #[arg(long, default_value_t = WQ_STATUS_POLL_INTERVAL.as_millis() as u64)]
    workqueue_interval_ms: u64,

    /// Work-queue full-state poll interval in milliseconds
    #[arg(long, default_value_t = WQ_STATE_POLL_INTERVAL.as_millis() as u64)]
    workqueue_state_interval_ms: u64,

    /// Write the log to a file under this directory instead of stdout only
    #[arg(long)]
    log_dir: Option<String>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let _guard = match &args.log_dir {
        Some(dir) => match logging::init_logging(dir, logging::default_log_file()) {
            Ok(guard) => guard,
            Err(e) => {
                eprintln!("Error initializing logging in {}: {}", dir, e);
                process::exit(1);
            }
        },
        None => logging::init_console_logging(),
    };

    info!(version = opsdeck::VERSION, api_url = %args.api_url, "opsdeck starting");

    let api = Arc::new(ApiClient::new(&args.api_url));
    let s3tests = S3TestsClient::new(Arc::clone(&api));
    let bench = BenchClient::new(Arc::clone(&api));
    let containers = ContainersClient::new(Arc::clone(&api));
    let workqueue = WorkQueueClient::new(Arc::clone(&api));

    let status = StatusAggregator::with_config(
        s3tests.clone(),
        bench.clone(),
        PollConfig::fixed(Duration::from_millis(args.status_interval_ms)),
    );
    let configs = ConfigsObserver::with_config(
        s3tests,
        bench,
        PollConfig::jittered(
            Duration::from_millis(args.config_interval_ms),
            Duration::from_millis(args.config_jitter_ms),
        ),
    );
    let containers = ContainersObserver::with_config(
        containers,
        PollConfig::fixed(Duration::from_millis(args.containers_interval_ms)),
    );
    let workqueue = WorkQueueObserver::with_config(
        workqueue,
        PollConfig::fixed(Duration::from_millis(args.workqueue_interval_ms)),
        PollConfig::fixed(Duration::from_millis(args.workqueue_state_interval_ms)),
    );

    tail_streams(&status, &configs, &containers, &workqueue);

    if let Err(e) = tokio::signal::ctrl_c().await {
        eprintln!("Error waiting for Ctrl-C: {}", e);
        process::exit(1);
    }

    info!("shutting down");
    status.shutdown();
    configs.shutdown();
    containers.shutdown();
    workqueue.shutdown();
}

/// Spawn one logging task per stream. Tasks end on their own when the
/// observers shut down and drop the senders.
fn tail_streams(
    status: &StatusAggregator,
    configs: &ConfigsObserver,
    containers: &ContainersObserver,
    workqueue: &WorkQueueObserver,
) {
    let mut busy_rx = status.subscribe_busy();
    tokio::spawn(async move {
        while busy_rx.changed().await.is_ok() {
            let busy = *busy_rx.borrow_and_update();
            info!(busy, "combined busy signal changed");
        }
    });

    let mut s3tests_rx = status.subscribe_s3tests();
    tokio::spawn(async move {
        while s3tests_rx.changed().await.is_ok() {
            let status = s3tests_rx.borrow_and_update().clone();
            if let Some(status) = status {
                match &status.progress {
                    Some(progress) => info!(
                        busy = status.busy,
                        percent = progress.percent,
                        done = progress.done,
                        total = progress.total,
                        "s3tests status"
                    ),
                    None => info!(busy = status.busy, "s3tests status"),
                }
            }
        }
    });

    let mut bench_rx = status.subscribe_bench();
    tokio::spawn(async move {
        while bench_rx.changed().await.is_ok() {
            let status = bench_rx.borrow_and_update().clone();
            if let Some(status) = status {
                info!(running = status.running, busy = status.busy, "bench status");
            }
        }
    });

    let mut s3tests_configs_rx = configs.subscribe_s3tests();
    tokio::spawn(async move {
        while s3tests_configs_rx.changed().await.is_ok() {
            let count = s3tests_configs_rx.borrow_and_update().len();
            info!(count, "s3tests configuration list changed");
        }
    });

    let mut bench_configs_rx = configs.subscribe_bench();
    tokio::spawn(async move {
        while bench_configs_rx.changed().await.is_ok() {
            let count = bench_configs_rx.borrow_and_update().len();
            info!(count, "bench configuration list changed");
        }
    });

    let mut containers_rx = containers.subscribe();
    tokio::spawn(async move {
        while containers_rx.changed().await.is_ok() {
            let entries = containers_rx.borrow_and_update().clone();
            info!(count = entries.len(), "container inventory changed");
            for entry in &entries {
                info!(
                    id = %entry.id,
                    image = %entry.image_name.name,
                    state = %entry.state,
                    "container"
                );
            }
        }
    });

    let mut wq_status_rx = workqueue.subscribe_status();
    tokio::spawn(async move {
        while wq_status_rx.changed().await.is_ok() {
            let status = wq_status_rx.borrow_and_update().clone();
            match &status.current {
                Some(entry) => info!(
                    uuid = %entry.item.uuid,
                    kind = ?entry.item.kind,
                    "work queue current entry changed"
                ),
                None => info!("work queue idle"),
            }
        }
    });

    let mut wq_state_rx = workqueue.subscribe_state();
    tokio::spawn(async move {
        while wq_state_rx.changed().await.is_ok() {
            let state = wq_state_rx.borrow_and_update().clone();
            info!(
                waiting = state.waiting.len(),
                finished = state.finished.len(),
                running = state.current.is_some(),
                "work queue state"
            );
        }
    });
}
