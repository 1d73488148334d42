//! Input file upload.

use std::path::Path;
use std::sync::Arc;

use cellflow_core::workflow_spec::{has_accepted_extension, FileHandle, ACCEPTED_INPUT_EXTENSION};

use crate::api::{ServiceApi, ServiceApiError};
use crate::error::ClientError;

/// Advertised upper bound for an input file (500 MB).
///
/// The service enforces the real limit; larger files only log a warning.
pub const MAX_UPLOAD_HINT_BYTES: u64 = 500 * 1024 * 1024;

/// A file picked for upload, read fully into memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    file_name: String,
    bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a local file. Unreadable paths are an [`ClientError::InvalidUpload`].
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                ClientError::InvalidUpload(format!("'{}' does not name a file", path.display()))
            })?
            .to_string();
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            ClientError::InvalidUpload(format!("failed to read '{}': {e}", path.display()))
        })?;
        Ok(Self { file_name, bytes })
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub(crate) fn into_parts(self) -> (String, Vec<u8>) {
        (self.file_name, self.bytes)
    }
}

/// Sends input files to the service and hands back the resulting
/// [`FileHandle`].
#[derive(Debug, Clone)]
pub struct TransferAgent {
    api: Arc<ServiceApi>,
}

impl TransferAgent {
    pub fn new(api: Arc<ServiceApi>) -> Self {
        Self { api }
    }

    /// Upload one file. No retries; the caller decides whether to try again.
    pub async fn upload(&self, file: UploadFile) -> Result<FileHandle, ClientError> {
        if file.is_empty() {
            return Err(ClientError::InvalidUpload(format!(
                "'{}' is empty",
                file.file_name()
            )));
        }
        if !has_accepted_extension(file.file_name()) {
            tracing::warn!(
                file_name = %file.file_name(),
                expected = ACCEPTED_INPUT_EXTENSION,
                "Uploading file with unexpected extension",
            );
        }
        if file.len() > MAX_UPLOAD_HINT_BYTES {
            tracing::warn!(
                file_name = %file.file_name(),
                size_bytes = file.len(),
                "Upload exceeds the advertised size limit",
            );
        }

        let file_name = file.file_name().to_string();
        let size_bytes = file.len();
        let response = self.api.upload(file).await.map_err(upload_error)?;

        let handle = response
            .filename
            .ok_or_else(|| {
                ClientError::ServiceRejected("upload response has no filename".to_string())
            })
            .and_then(|name| {
                FileHandle::new(name).map_err(|e| ClientError::ServiceRejected(e.to_string()))
            })?;

        tracing::info!(
            file_name = %file_name,
            size_bytes,
            handle = %handle,
            "Input file uploaded",
        );
        Ok(handle)
    }
}

fn upload_error(err: ServiceApiError) -> ClientError {
    match err {
        ServiceApiError::Transport(msg) => ClientError::Transport(msg),
        e @ ServiceApiError::Status { .. } if e.is_server_error() => {
            ClientError::Transport(e.to_string())
        }
        e => ClientError::ServiceRejected(e.to_string()),
    }
}
