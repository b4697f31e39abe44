//! Work-queue resource client.
//!
//! The backend serializes queue entry kinds as integers and wraps both
//! work-queue responses in a `{ "status": ... }` envelope; the client
//! unwraps the envelope so the sync layer only sees the payload.

use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::bench::{BenchConfigEntry, BenchProgress};
use super::client::ApiClient;
use super::error::ApiError;
use super::s3tests::{S3TestsConfigEntry, S3TestsProgressCounters};

/// Kind of a work-queue entry.
///
/// Serialized as an integer on the wire (0 = none, 1 = bench, 2 = s3tests).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum WorkQueueEntryKind {
    None,
    Bench,
    S3Tests,
}

impl TryFrom<u8> for WorkQueueEntryKind {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::None),
            1 => Ok(Self::Bench),
            2 => Ok(Self::S3Tests),
            other => Err(format!("unknown work queue entry kind: {other}")),
        }
    }
}

impl From<WorkQueueEntryKind> for u8 {
    fn from(kind: WorkQueueEntryKind) -> Self {
        match kind {
            WorkQueueEntryKind::None => 0,
            WorkQueueEntryKind::Bench => 1,
            WorkQueueEntryKind::S3Tests => 2,
        }
    }
}

/// One enqueued or running job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkQueueEntry {
    pub uuid: String,
    pub kind: WorkQueueEntryKind,
    pub is_running: bool,
    pub is_done: bool,
    #[serde(default)]
    pub time_start: Option<String>,
    #[serde(default)]
    pub time_end: Option<String>,
    pub duration: i64,
}

/// Full queue state: waiting list, finished list, current entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkQueueState {
    pub waiting: Vec<WorkQueueEntry>,
    pub finished: Vec<WorkQueueEntry>,
    #[serde(default)]
    pub current: Option<WorkQueueEntry>,
}

/// Progress payload of the current entry; shape depends on the job kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WorkQueueItemProgress {
    Bench(BenchProgress),
    S3Tests(S3TestsProgressCounters),
}

/// Configuration of the current entry; shape depends on the job kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WorkQueueItemConfig {
    Bench(BenchConfigEntry),
    S3Tests(S3TestsConfigEntry),
}

/// Progress envelope of the current entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkQueueProgress {
    pub uuid: String,
    pub is_running: bool,
    pub is_done: bool,
    pub time_start: String,
    pub time_end: String,
    pub duration: i64,
    pub progress: WorkQueueItemProgress,
}

/// The currently running queue entry with its progress and configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkQueueStatusEntry {
    pub item: WorkQueueEntry,
    pub progress: WorkQueueProgress,
    pub config: WorkQueueItemConfig,
}

/// `GET /workqueue/status` payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkQueueStatus {
    pub is_running: bool,
    #[serde(default)]
    pub current: Option<WorkQueueStatusEntry>,
}

/// Wire envelope for `GET /workqueue/`.
#[derive(Debug, Clone, Deserialize)]
struct WorkQueueStateResult {
    status: WorkQueueState,
}

/// Wire envelope for `GET /workqueue/status`.
#[derive(Debug, Clone, Deserialize)]
struct WorkQueueStatusResult {
    status: WorkQueueStatus,
}

/// Trait for the work-queue resource calls.
pub trait WorkQueueApi: Send + Sync {
    /// Fetch the condensed queue status (current entry + progress).
    fn status(&self) -> impl Future<Output = Result<WorkQueueStatus, ApiError>> + Send;

    /// Fetch the full queue state (waiting, finished, current).
    fn state(&self) -> impl Future<Output = Result<WorkQueueState, ApiError>> + Send;
}

/// Backend-backed work-queue client.
#[derive(Clone)]
pub struct WorkQueueClient {
    api: Arc<ApiClient>,
}

impl WorkQueueClient {
    /// Create a new client over a shared transport.
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }
}

impl WorkQueueApi for WorkQueueClient {
    async fn status(&self) -> Result<WorkQueueStatus, ApiError> {
        let res: WorkQueueStatusResult = self.api.get("/workqueue/status").await?;
        Ok(res.status)
    }

    async fn state(&self) -> Result<WorkQueueState, ApiError> {
        let res: WorkQueueStateResult = self.api.get("/workqueue/").await?;
        Ok(res.status)
    }
}
