//! Status synchronization core.
//!
//! The backend exposes no push channel, so every dashboard view is an
//! eventually-consistent mirror maintained by polling. This module provides
//! the pieces that make that mirror cheap to consume:
//!
//! - [`poller`] - the generic polling-loop primitive: serialized
//!   call-then-wait cycles, optional additive jitter, cancel-safe teardown.
//! - [`S3TestsStatusObserver`] - test-suite runner status with
//!   percent-based update suppression.
//! - [`StatusAggregator`] - joint s3tests + bench status cycle and the
//!   combined busy signal.
//! - [`ConfigsObserver`] - uuid-keyed configuration set merged from two
//!   independently polled list endpoints.
//! - [`ContainersObserver`] - container inventory.
//! - [`WorkQueueObserver`] - queue status (suppressed on an unchanged
//!   current entry) and full queue state (never suppressed).
//!
//! # Streams
//!
//! Observers publish to [`tokio::sync::watch`] channels: one writer (the
//! observer's poll task), any number of readers, and the last published
//! value retained for late subscribers. A value is only sent when the
//! observable state meaningfully changed, so `Receiver::changed()` is a
//! change notification, not a poll tick.
//!
//! # Teardown
//!
//! Every observer owns the [`poller::PollHandle`]s of its loops. Calling
//! `shutdown()` (or dropping the observer) cancels the loops; a response
//! already in flight when the loop is cancelled is discarded without
//! publishing or rescheduling.

pub mod poller;

mod configs;
mod containers;
mod s3tests;
mod status;
mod workqueue;

pub use configs::{ConfigKind, ConfigsObserver, CONFIG_POLL_INTERVAL, CONFIG_POLL_JITTER};
pub use containers::{ContainersObserver, CONTAINERS_POLL_INTERVAL};
pub use s3tests::{S3TestsProgress, S3TestsStatus, S3TestsStatusObserver, STATUS_POLL_INTERVAL};
pub use status::{BenchStatus, StatusAggregator};
pub use workqueue::{
    WorkQueueObserver, WQ_STATE_POLL_INTERVAL, WQ_STATUS_POLL_INTERVAL,
};
