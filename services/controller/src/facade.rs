//! Controller facades used by the workers.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Errors from a facade call.
#[derive(Debug, Error)]
pub enum FacadeError {
    /// The controller rejected the call.
    #[error("{message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Refreshes the latest known revision of deployed charms.
#[async_trait]
pub trait CharmRevisionFacade: Send + Sync {
    async fn update_latest_revisions(&self) -> Result<(), FacadeError>;
}

/// Records the newest agent tools version available to the environment.
#[async_trait]
pub trait ToolsVersionFacade: Send + Sync {
    async fn update_tools_version(&self) -> Result<(), FacadeError>;
}

/// HTTP client for the controller's worker facades.
#[derive(Debug, Clone)]
pub struct FacadeClient {
    client: reqwest::Client,
    base_url: String,
}

impl FacadeClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FacadeError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post(&self, path: &str) -> Result<(), FacadeError> {
        debug!(path, "Calling facade");
        let response = self.client.post(self.url(path)).send().await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        let error = serde_json::from_str::<ApiErrorResponse>(&body).unwrap_or_else(|_| {
            ApiErrorResponse {
                code: "unknown".to_string(),
                message: if body.is_empty() {
                    status.to_string()
                } else {
                    body
                },
            }
        });
        Err(FacadeError::Api {
            status: status.as_u16(),
            code: error.code,
            message: error.message,
        })
    }
}

#[async_trait]
impl CharmRevisionFacade for FacadeClient {
    async fn update_latest_revisions(&self) -> Result<(), FacadeError> {
        self.post("/v1/charms/revisions/refresh").await
    }
}

#[async_trait]
impl ToolsVersionFacade for FacadeClient {
    async fn update_tools_version(&self) -> Result<(), FacadeError> {
        self.post("/v1/environment/tools-version/refresh").await
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    code: String,
    message: String,
}
