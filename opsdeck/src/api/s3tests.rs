//! S3 test-suite resource client.
//!
//! Maps the `/s3tests/*` endpoints onto typed calls. The [`S3TestsApi`]
//! trait abstracts the client so the sync layer can be driven by scripted
//! implementations in tests.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::client::ApiClient;
use super::error::ApiError;

/// Container settings of one test-suite configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct S3TestsContainerConfig {
    pub image: String,
    pub ports: Vec<String>,
    pub volumes: Vec<String>,
}

/// Test selection of one test-suite configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct S3TestsUnitsConfig {
    pub suite: String,
    pub ignore: Vec<String>,
    pub exclude: Vec<String>,
    pub include: Vec<String>,
}

/// One test-suite configuration body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct S3TestsConfig {
    pub container: S3TestsContainerConfig,
    pub tests: S3TestsUnitsConfig,
}

/// Named configuration, as submitted by the operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct S3TestsConfigDesc {
    pub name: String,
    pub config: S3TestsConfig,
}

/// Stored configuration with its backend-assigned identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct S3TestsConfigEntry {
    pub uuid: String,
    pub desc: S3TestsConfigDesc,
}

/// Test units the backend collected for a configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct S3TestsCollectedUnits {
    pub all: Vec<String>,
    pub filtered: Vec<String>,
}

/// Config list entry: stored configuration plus its collected units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct S3TestsConfigItem {
    pub config: S3TestsConfigEntry,
    pub tests: S3TestsCollectedUnits,
}

/// Raw progress counters of a running test suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct S3TestsProgressCounters {
    pub tests_total: u64,
    pub tests_run: u64,
}

/// The currently running test suite, as reported by `/s3tests/status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct S3TestsCurrentRun {
    pub uuid: String,
    pub time_start: String,
    pub config: S3TestsConfigEntry,
    pub progress: S3TestsProgressCounters,
}

/// `GET /s3tests/status` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct S3TestsStatusResult {
    pub date: String,
    pub busy: bool,
    #[serde(default)]
    pub current: Option<S3TestsCurrentRun>,
}

/// `GET /s3tests/config` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct S3TestsConfigResult {
    pub date: String,
    pub entries: Vec<S3TestsConfigItem>,
}

/// One finished run in the results map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct S3TestsResultEntry {
    pub uuid: String,
    pub time_start: String,
    pub time_end: String,
    pub config: S3TestsConfigEntry,
    pub results: HashMap<String, String>,
    pub is_error: bool,
    pub error_msg: String,
    #[serde(default)]
    pub progress: Option<S3TestsProgressCounters>,
}

/// `GET /s3tests/results` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct S3TestsResultsResult {
    pub date: String,
    pub results: HashMap<String, S3TestsResultEntry>,
}

/// `POST /s3tests/config` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct S3TestsConfigPostResult {
    pub date: String,
    pub uuid: String,
}

/// Trait for the s3tests resource calls.
pub trait S3TestsApi: Send + Sync {
    /// Fetch the current test-suite runner status.
    fn status(&self) -> impl Future<Output = Result<S3TestsStatusResult, ApiError>> + Send;

    /// Fetch the list of stored test-suite configurations.
    fn config(&self) -> impl Future<Output = Result<S3TestsConfigResult, ApiError>> + Send;

    /// Fetch the results of finished runs.
    fn results(&self) -> impl Future<Output = Result<S3TestsResultsResult, ApiError>> + Send;

    /// Submit a new test-suite configuration.
    fn post_config(
        &self,
        desc: &S3TestsConfigDesc,
    ) -> impl Future<Output = Result<S3TestsConfigPostResult, ApiError>> + Send;
}

/// Backend-backed s3tests client.
#[derive(Clone)]
pub struct S3TestsClient {
    api: Arc<ApiClient>,
}

impl S3TestsClient {
    /// Create a new client over a shared transport.
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }
}

impl S3TestsApi for S3TestsClient {
    async fn status(&self) -> Result<S3TestsStatusResult, ApiError> {
        self.api.get("/s3tests/status").await
    }

    async fn config(&self) -> Result<S3TestsConfigResult, ApiError> {
        self.api.get("/s3tests/config").await
    }

    async fn results(&self) -> Result<S3TestsResultsResult, ApiError> {
        self.api.get("/s3tests/results").await
    }

    async fn post_config(&self, desc: &S3TestsConfigDesc) -> Result<S3TestsConfigPostResult, ApiError> {
        self.api.post_json("/s3tests/config", desc).await
    }
}
