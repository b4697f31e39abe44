//! Container inventory resource client.

use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::client::ApiClient;
use super::error::ApiError;

/// Image name and tag of a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerImageName {
    pub name: String,
    pub tag: String,
}

/// One container known to the backend's container runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerEntry {
    pub command: Vec<String>,
    pub created: String,
    pub started: String,
    pub running: bool,
    pub state: String,
    pub id: String,
    pub image_id: String,
    pub image_name: ContainerImageName,
    pub names: Vec<String>,
}

/// `GET /containers/ps` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainersPsResult {
    pub date: String,
    pub result: Vec<ContainerEntry>,
}

/// Trait for the container inventory call.
pub trait ContainersApi: Send + Sync {
    /// List containers known to the backend.
    fn ps(&self) -> impl Future<Output = Result<ContainersPsResult, ApiError>> + Send;
}

/// Backend-backed container inventory client.
#[derive(Clone)]
pub struct ContainersClient {
    api: Arc<ApiClient>,
}

impl ContainersClient {
    /// Create a new client over a shared transport.
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }
}

impl ContainersApi for ContainersClient {
    async fn ps(&self) -> Result<ContainersPsResult, ApiError> {
        self.api.get("/containers/ps").await
    }
}
