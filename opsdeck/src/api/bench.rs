//! Benchmark resource client.
//!
//! Maps the `/bench/*` endpoints onto typed calls behind the [`BenchApi`]
//! trait.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::client::ApiClient;
use super::error::ApiError;

/// Workload parameters of one benchmark configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchConfigParams {
    pub num_objects: u64,
    pub object_size: String,
    pub duration: String,
}

/// One storage target the benchmark runs against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchConfigTarget {
    pub image: String,
    #[serde(default)]
    pub args: Option<Vec<String>>,
    pub port: u16,
    pub access_key: String,
    pub secret_key: String,
}

/// One benchmark configuration body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchConfig {
    pub name: String,
    pub params: BenchConfigParams,
    pub targets: HashMap<String, BenchConfigTarget>,
}

/// Stored benchmark configuration with its backend-assigned identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchConfigEntry {
    pub uuid: String,
    pub config: BenchConfig,
}

/// Error reported for a single target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchTargetError {
    pub target: String,
    pub error_str: String,
}

/// Progress of one target within a benchmark run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchTargetProgress {
    pub name: String,
    pub state: i32,
    pub value: f64,
    pub has_progress: bool,
    pub is_running: bool,
    pub is_done: bool,
    pub is_error: bool,
    #[serde(default)]
    pub error_str: Option<String>,
    #[serde(default)]
    pub time_start: Option<String>,
    #[serde(default)]
    pub time_end: Option<String>,
    pub duration: i64,
}

/// Progress of a whole benchmark run across its targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchProgress {
    pub is_running: bool,
    pub is_done: bool,
    #[serde(default)]
    pub time_start: Option<String>,
    #[serde(default)]
    pub time_end: Option<String>,
    pub duration: i64,
    pub targets: Vec<BenchTargetProgress>,
}

/// The currently running benchmark, as reported by `/bench/status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchRunDesc {
    pub config: BenchConfig,
    pub progress: BenchProgress,
}

/// `GET /bench/status` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchStatusResult {
    pub date: String,
    pub running: bool,
    pub busy: bool,
    #[serde(default)]
    pub current: Option<BenchRunDesc>,
}

/// `GET /bench/config` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchConfigResult {
    pub date: String,
    pub entries: Vec<BenchConfigEntry>,
}

/// One finished benchmark run in the results map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchResult {
    pub uuid: String,
    pub progress: BenchProgress,
    pub is_error: bool,
    pub errors: Vec<BenchTargetError>,
    pub config: BenchConfig,
    pub results: HashMap<String, String>,
}

/// `GET /bench/results` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchResultsResult {
    pub date: String,
    pub results: HashMap<String, BenchResult>,
}

/// `POST /bench/config` and `POST /bench/run` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchPostResult {
    pub date: String,
    pub uuid: String,
}

/// Trait for the benchmark resource calls.
pub trait BenchApi: Send + Sync {
    /// Fetch the current benchmark runner status.
    fn status(&self) -> impl Future<Output = Result<BenchStatusResult, ApiError>> + Send;

    /// Fetch the list of stored benchmark configurations.
    fn config(&self) -> impl Future<Output = Result<BenchConfigResult, ApiError>> + Send;

    /// Fetch the results of finished runs.
    fn results(&self) -> impl Future<Output = Result<BenchResultsResult, ApiError>> + Send;

    /// Submit a new benchmark configuration.
    fn post_config(
        &self,
        config: &BenchConfig,
    ) -> impl Future<Output = Result<BenchPostResult, ApiError>> + Send;

    /// Enqueue a run of a stored configuration.
    fn run(&self, uuid: &str) -> impl Future<Output = Result<BenchPostResult, ApiError>> + Send;
}

/// Backend-backed benchmark client.
#[derive(Clone)]
pub struct BenchClient {
    api: Arc<ApiClient>,
}

impl BenchClient {
    /// Create a new client over a shared transport.
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }
}

impl BenchApi for BenchClient {
    async fn status(&self) -> Result<BenchStatusResult, ApiError> {
        self.api.get("/bench/status").await
    }

    async fn config(&self) -> Result<BenchConfigResult, ApiError> {
        self.api.get("/bench/config").await
    }

    async fn results(&self) -> Result<BenchResultsResult, ApiError> {
        self.api.get("/bench/results").await
    }

    async fn post_config(&self, config: &BenchConfig) -> Result<BenchPostResult, ApiError> {
        self.api.post_json("/bench/config", config).await
    }

    async fn run(&self, uuid: &str) -> Result<BenchPostResult, ApiError> {
        self.api
            .post_with_params("/bench/run", &[("uuid", uuid)])
            .await
    }
}
