//! opsdeck - status synchronization layer for a job-runner dashboard.
//!
//! This library keeps an operator dashboard in sync with a backend that runs
//! two kinds of long-lived jobs - an S3-compatibility test-suite runner and a
//! multi-target storage benchmark runner - plus an auxiliary container
//! inventory. The backend offers no push channel, so every view of its state
//! is maintained by long-lived pollers that fetch, diff, and conditionally
//! republish.
//!
//! # Architecture
//!
//! ```text
//! backend HTTP API
//!     │
//!     ├── api::*        typed resource clients (one call per endpoint)
//!     │
//!     └── sync::*       observers: poll loop + diff + hot stream
//!             │
//!             ├── StatusAggregator   s3tests + bench status, combined busy
//!             ├── ConfigsObserver    uuid-keyed config set, per-kind streams
//!             ├── ContainersObserver container inventory
//!             └── WorkQueueObserver  queue status + full queue state
//! ```
//!
//! Each observer owns one or more [`sync::poller`] loops. A loop is a
//! serialized request-then-wait cycle: it never has two calls in flight for
//! the same resource, a failed call only skips that cycle, and cancellation
//! is honoured at both suspension points. Observers publish to
//! [`tokio::sync::watch`] channels, so late subscribers always see the last
//! published value and there is a single writer per stream.
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use opsdeck::api::{ApiClient, BenchClient, S3TestsClient};
//! use opsdeck::sync::StatusAggregator;
//!
//! let api = Arc::new(ApiClient::new("http://127.0.0.1:7480/api"));
//! let status = StatusAggregator::start(
//!     S3TestsClient::new(Arc::clone(&api)),
//!     BenchClient::new(api),
//! );
//!
//! let mut busy = status.subscribe_busy();
//! while busy.changed().await.is_ok() {
//!     println!("busy: {}", *busy.borrow());
//! }
//! ```

pub mod api;
pub mod logging;
pub mod sync;

/// Version of the opsdeck library and CLI.
///
/// This is synchronized across all components in the workspace.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
