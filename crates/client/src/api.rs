//! REST API client for the workflow service.
//!
//! Thin typed wrappers over the service's HTTP endpoints using
//! [`reqwest`]. Errors are reported as [`ServiceApiError`]; the agents
//! built on top decide what each failure means for their caller.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{StatusCode, Url};

use cellflow_core::catalog::ModelDescriptor;
use cellflow_core::result_set::DownloadRef;
use cellflow_core::workflow::WorkflowRecord;
use cellflow_core::workflow_spec::SubmitRequest;

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::service::WorkflowService;
use crate::transfer::UploadFile;
use crate::wire::{CreateWorkflowResponse, ModelsResponse, RawWorkflow, UploadResponse};

/// Errors from the REST API layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceApiError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Transport(String),

    /// The service returned a non-2xx status code.
    #[error("Service API error ({status}): {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// A 2xx response whose body was not what the endpoint promises.
    #[error("Unexpected response body: {0}")]
    Decode(String),
}

impl ServiceApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status, .. } if *status == StatusCode::NOT_FOUND.as_u16())
    }

    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::Status { status, .. } if *status >= 500)
    }
}

impl From<reqwest::Error> for ServiceApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// HTTP client for one workflow service deployment.
#[derive(Debug, Clone)]
pub struct ServiceApi {
    client: reqwest::Client,
    base_url: Url,
}

impl ServiceApi {
    /// Build an API client from the shared configuration.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;
        Self::with_client(config.http_client()?, &config.base_url)
    }

    /// Create an API client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Result<Self, ClientError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ClientError::Config(format!("invalid base URL '{base_url}': {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::Config(format!(
                "base URL '{base_url}' cannot carry a path"
            )));
        }
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Upload an input file.
    ///
    /// Sends `POST /upload` as multipart with a single `file` part.
    pub async fn upload(&self, file: UploadFile) -> Result<UploadResponse, ServiceApiError> {
        let (file_name, bytes) = file.into_parts();
        let form = Form::new().part("file", Part::bytes(bytes).file_name(file_name));

        let response = self
            .client
            .post(self.endpoint(&["upload"]))
            .multipart(form)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// List every model the service hosts.
    ///
    /// Sends `GET /models`, optionally narrowed by `model_type`.
    pub async fn list_models(
        &self,
        model_type: Option<&str>,
    ) -> Result<Vec<ModelDescriptor>, ServiceApiError> {
        let mut request = self.client.get(self.endpoint(&["models"]));
        if let Some(model_type) = model_type {
            request = request.query(&[("model_type", model_type)]);
        }

        let body: ModelsResponse = Self::parse_response(request.send().await?).await?;
        Ok(body.models)
    }

    /// Submit a single-cell embedding workflow.
    ///
    /// Sends `POST /workflows/single-cell` and returns the assigned
    /// `workflow_id`.
    pub async fn create_workflow(&self, request: &SubmitRequest) -> Result<String, ServiceApiError> {
        let response = self
            .client
            .post(self.endpoint(&["workflows", "single-cell"]))
            .json(request)
            .send()
            .await?;

        let body: CreateWorkflowResponse = Self::parse_response(response).await?;
        body.workflow_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| ServiceApiError::Decode("response has no workflow_id".to_string()))
    }

    /// Retrieve the current snapshot of a workflow.
    ///
    /// Sends `GET /workflows/{id}`.
    pub async fn get_workflow(&self, workflow_id: &str) -> Result<WorkflowRecord, ServiceApiError> {
        let response = self
            .client
            .get(self.endpoint(&["workflows", workflow_id]))
            .send()
            .await?;

        let raw: RawWorkflow = Self::parse_response(response).await?;
        raw.into_record()
            .map_err(|e| ServiceApiError::Decode(e.to_string()))
    }

    /// List all workflows, newest first.
    ///
    /// Sends `GET /workflows`. Entries without a creation time sort last.
    pub async fn list_workflows(&self) -> Result<Vec<WorkflowRecord>, ServiceApiError> {
        let response = self
            .client
            .get(self.endpoint(&["workflows"]))
            .send()
            .await?;

        let raw: Vec<RawWorkflow> = Self::parse_response(response).await?;
        let mut records = raw
            .into_iter()
            .map(RawWorkflow::into_record)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ServiceApiError::Decode(e.to_string()))?;
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    /// Absolute download link for a result artifact.
    ///
    /// The link is handed to the user; the engine never fetches it.
    pub fn download_url(&self, download: &DownloadRef) -> Url {
        self.endpoint(&[
            "workflows",
            download.job_id.as_str(),
            "results",
            download.result_id.as_str(),
            "download",
        ])
    }

    // ---- private helpers ----

    /// Append path segments to the base URL, percent-encoding each.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`ServiceApiError::Status`]
    /// containing the status and body text on failure.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ServiceApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ServiceApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ServiceApiError> {
        let response = Self::ensure_success(response).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ServiceApiError::Decode(e.to_string()))
    }
}

#[async_trait]
impl WorkflowService for ServiceApi {
    async fn create_workflow(&self, request: &SubmitRequest) -> Result<String, ServiceApiError> {
        ServiceApi::create_workflow(self, request).await
    }

    async fn fetch_workflow(&self, workflow_id: &str) -> Result<WorkflowRecord, ServiceApiError> {
        self.get_workflow(workflow_id).await
    }
}
