//! Typed clients for the backend HTTP API.
//!
//! One client per backend resource, each mapping an endpoint onto a single
//! typed call. Clients carry no retry or polling logic - that lives in
//! [`crate::sync`]. Each resource is described by a trait
//! ([`S3TestsApi`], [`BenchApi`], [`ContainersApi`], [`WorkQueueApi`]) so
//! observers can be exercised against scripted implementations in tests.
//!
//! The wire shapes are the backend's contract and are mirrored here as serde
//! types, decoupled from any transport crate.

mod bench;
mod client;
mod containers;
mod error;
mod s3tests;
mod workqueue;

pub use bench::{
    BenchApi, BenchClient, BenchConfig, BenchConfigEntry, BenchConfigParams, BenchConfigResult,
    BenchConfigTarget, BenchPostResult, BenchProgress, BenchResult, BenchResultsResult,
    BenchRunDesc, BenchStatusResult, BenchTargetError, BenchTargetProgress,
};
pub use client::{ApiClient, DEFAULT_HTTP_TIMEOUT};
pub use containers::{ContainerEntry, ContainerImageName, ContainersApi, ContainersClient,
    ContainersPsResult};
pub use error::ApiError;
pub use s3tests::{
    S3TestsApi, S3TestsClient, S3TestsCollectedUnits, S3TestsConfig, S3TestsConfigDesc,
    S3TestsConfigEntry, S3TestsConfigItem, S3TestsConfigPostResult, S3TestsConfigResult,
    S3TestsContainerConfig, S3TestsCurrentRun, S3TestsProgressCounters, S3TestsResultEntry,
    S3TestsResultsResult, S3TestsStatusResult, S3TestsUnitsConfig,
};
pub use workqueue::{
    WorkQueueApi, WorkQueueClient, WorkQueueEntry, WorkQueueEntryKind, WorkQueueItemConfig,
    WorkQueueItemProgress, WorkQueueProgress, WorkQueueState, WorkQueueStatus,
    WorkQueueStatusEntry,
};
