//! Raw response payloads and their normalisation into domain types.
//!
//! The service is loose about field names and formats; everything it
//! sends is funnelled through these structs so the rest of the engine
//! only ever sees [`WorkflowRecord`]s.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;

use cellflow_core::catalog::ModelDescriptor;
use cellflow_core::error::CoreError;
use cellflow_core::types::Timestamp;
use cellflow_core::workflow::{normalize_progress, ResultItem, WorkflowRecord, WorkflowStatus};

/// `POST /upload` response.
#[derive(Debug, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub filename: Option<String>,
}

/// `GET /models` response.
#[derive(Debug, Deserialize)]
pub struct ModelsResponse {
    #[serde(default)]
    pub models: Vec<ModelDescriptor>,
}

/// `POST /workflows/single-cell` response.
#[derive(Debug, Deserialize)]
pub struct CreateWorkflowResponse {
    #[serde(default)]
    pub workflow_id: Option<String>,
}

/// `GET /workflows/{id}` response, and each entry of `GET /workflows`.
#[derive(Debug, Deserialize)]
pub struct RawWorkflow {
    #[serde(alias = "id")]
    pub workflow_id: String,
    pub status: String,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default, alias = "error")]
    pub error_message: Option<String>,
    #[serde(default)]
    pub results: Option<Vec<RawResult>>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// One entry of a workflow's `results` array.
#[derive(Debug, Deserialize)]
pub struct RawResult {
    #[serde(alias = "id")]
    pub result_id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, alias = "size_bytes")]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl RawWorkflow {
    pub fn into_record(self) -> Result<WorkflowRecord, CoreError> {
        let status = WorkflowStatus::parse(&self.status)?;
        let results = self
            .results
            .unwrap_or_default()
            .into_iter()
            .map(RawResult::into_item)
            .collect::<Result<Vec<_>, _>>()?;
        let created_at = self.created_at.as_deref().map(parse_timestamp).transpose()?;
        let error_message = self.error_message.filter(|m| !m.trim().is_empty());

        Ok(WorkflowRecord {
            id: self.workflow_id,
            status,
            progress: normalize_progress(self.progress),
            error_message,
            results,
            created_at,
        })
    }
}

impl RawResult {
    pub fn into_item(self) -> Result<ResultItem, CoreError> {
        Ok(ResultItem {
            created_at: self.created_at.as_deref().map(parse_timestamp).transpose()?,
            id: self.result_id,
            kind: self.kind,
            size_bytes: self.file_size.unwrap_or(0),
        })
    }
}

/// Parse an RFC 3339 timestamp, or a naive ISO-8601 one read as UTC.
pub fn parse_timestamp(raw: &str) -> Result<Timestamp, CoreError> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| CoreError::Malformed(format!("Unparseable timestamp '{raw}'")))
}
