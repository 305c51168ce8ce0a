//! HTTP client for the controller's machine API.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use corral_provision::{
    AddMachineParams, AddMachineResult, BackendError, ProvisioningBackend,
    ProvisioningScriptParams,
};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

/// Error code the controller uses for calls it does not support.
const NOT_IMPLEMENTED_CODE: &str = "not_implemented";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// API client for the controller.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Create a new API client for the controller at `base_url`.
    pub fn new(base_url: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Build a URL for an endpoint.
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, BackendError> {
        debug!(path, "GET");
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(transport)?;
        self.handle_response(response).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, BackendError> {
        debug!(path, "POST");
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(transport)?;
        self.handle_response(response).await
    }

    /// POST where only the status matters; any success body is ignored.
    async fn post_unit<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(), BackendError> {
        debug!(path, "POST");
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(transport)?;
        if response.status().is_success() {
            Ok(())
        } else {
            self.handle_error(response).await
        }
    }

    /// Handle a successful or error response.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, BackendError> {
        if response.status().is_success() {
            response
                .json()
                .await
                .map_err(|e| BackendError::Transport(format!("Failed to parse response: {e}")))
        } else {
            self.handle_error(response).await
        }
    }

    /// Handle an error response.
    async fn handle_error<T>(&self, response: reqwest::Response) -> Result<T, BackendError> {
        let status = response.status();

        let error_body: ApiErrorResponse =
            response.json().await.unwrap_or_else(|_| ApiErrorResponse {
                code: "unknown".to_string(),
                message: status.to_string(),
            });

        if status == reqwest::StatusCode::NOT_IMPLEMENTED || error_body.code == NOT_IMPLEMENTED_CODE
        {
            return Err(BackendError::NotImplemented(error_body.message));
        }

        Err(BackendError::Api {
            status: status.as_u16(),
            code: error_body.code,
            message: error_body.message,
        })
    }

    async fn add(
        &self,
        path: &str,
        params: &[AddMachineParams],
    ) -> Result<Vec<AddMachineResult>, BackendError> {
        let response: MachinesResponse = self.post(path, &MachinesRequest { params }).await?;
        if response.machines.len() != params.len() {
            return Err(BackendError::Transport(format!(
                "expected {} results, got {}",
                params.len(),
                response.machines.len()
            )));
        }
        Ok(response.machines)
    }
}

#[async_trait]
impl ProvisioningBackend for ApiClient {
    async fn add_machines(
        &self,
        params: &[AddMachineParams],
    ) -> Result<Vec<AddMachineResult>, BackendError> {
        self.add("/v1/machines", params).await
    }

    async fn add_machines_legacy(
        &self,
        params: &[AddMachineParams],
    ) -> Result<Vec<AddMachineResult>, BackendError> {
        self.add("/v1/machines/legacy", params).await
    }

    async fn environment_uuid(&self) -> Result<String, BackendError> {
        let response: EnvironmentResponse = self.get("/v1/environment").await?;
        Ok(response.uuid)
    }

    async fn provisioning_script(
        &self,
        params: &ProvisioningScriptParams,
    ) -> Result<String, BackendError> {
        let response: ScriptResponse = self
            .post("/v1/machines/provisioning-script", params)
            .await?;
        Ok(response.script)
    }

    async fn force_destroy_machines(&self, machines: &[String]) -> Result<(), BackendError> {
        self.post_unit(
            "/v1/machines/destroy",
            &DestroyRequest {
                machines,
                force: true,
            },
        )
        .await
    }
}

fn transport(err: reqwest::Error) -> BackendError {
    BackendError::Transport(err.to_string())
}

/// API error response structure.
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    code: String,
    message: String,
}

#[derive(Debug, Serialize)]
struct MachinesRequest<'a> {
    params: &'a [AddMachineParams],
}

#[derive(Debug, Deserialize)]
struct MachinesResponse {
    machines: Vec<AddMachineResult>,
}

#[derive(Debug, Deserialize)]
struct EnvironmentResponse {
    uuid: String,
}

#[derive(Debug, Deserialize)]
struct ScriptResponse {
    script: String,
}

#[derive(Debug, Serialize)]
struct DestroyRequest<'a> {
    machines: &'a [String],
    force: bool,
}
