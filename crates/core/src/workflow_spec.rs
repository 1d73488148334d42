//! The in-progress job specification assembled by the intake wizard.
//!
//! A [`WorkflowSpec`] is mutable until submission. [`WorkflowSpec::validate`]
//! turns it into a [`SubmitRequest`], the read-only form consumed by the
//! submission controller.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// The only workflow type the service accepts from this client.
pub const WORKFLOW_TYPE_SINGLE_CELL: &str = "single_cell_embeddings";

/// File extension the service expects for single-cell input data.
pub const ACCEPTED_INPUT_EXTENSION: &str = "h5ad";

// ---------------------------------------------------------------------------
// Model id
// ---------------------------------------------------------------------------

/// Compute targets known to be compatible with single-cell workflows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelId {
    Scgpt,
    Geneformer,
}

impl ModelId {
    pub const ALL: [ModelId; 2] = [Self::Scgpt, Self::Geneformer];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scgpt => "scgpt",
            Self::Geneformer => "geneformer",
        }
    }

    /// Match a service-reported model name against the compatibility set.
    ///
    /// Names are trimmed and compared case-insensitively, so `"scGPT"`
    /// and `" Geneformer "` both resolve.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "scgpt" => Some(Self::Scgpt),
            "geneformer" => Some(Self::Geneformer),
            _ => None,
        }
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| {
            CoreError::Validation(format!(
                "Unknown model '{s}'. Must be one of: scgpt, geneformer"
            ))
        })
    }
}

// ---------------------------------------------------------------------------
// Embedding mode
// ---------------------------------------------------------------------------

/// Which embedding the workflow extracts from the model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingMode {
    #[default]
    Cls,
    Cell,
    Gene,
}

impl EmbeddingMode {
    pub const ALL: [EmbeddingMode; 3] = [Self::Cls, Self::Cell, Self::Gene];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cls => "cls",
            Self::Cell => "cell",
            Self::Gene => "gene",
        }
    }
}

impl fmt::Display for EmbeddingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmbeddingMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cls" => Ok(Self::Cls),
            "cell" => Ok(Self::Cell),
            "gene" => Ok(Self::Gene),
            _ => Err(CoreError::Validation(format!(
                "Unknown embedding mode '{s}'. Must be one of: cls, cell, gene"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// File handle
// ---------------------------------------------------------------------------

/// Opaque reference to an uploaded file, issued by the service.
///
/// Never empty: an upload that did not produce a usable name never
/// becomes a handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct FileHandle(String);

impl FileHandle {
    pub fn new(value: impl Into<String>) -> Result<Self, CoreError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(CoreError::Validation(
                "File handle must not be empty".to_string(),
            ));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Workflow spec
// ---------------------------------------------------------------------------

/// Client-held job specification, filled in step by step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkflowSpec {
    /// Handle returned by the upload; empty until an upload succeeds.
    pub input_file_ref: String,
    pub model_id: Option<ModelId>,
    pub embedding_mode: Option<EmbeddingMode>,
}

/// A validated specification, ready to be sent to the service.
///
/// Serializes to the `POST /workflows/single-cell` request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmitRequest {
    pub input_file: String,
    pub model_id: ModelId,
    pub embedding_mode: EmbeddingMode,
}

impl WorkflowSpec {
    /// `true` when every field holds a value from its domain.
    pub fn is_submittable(&self) -> bool {
        self.validate().is_ok()
    }

    /// Check the submittable invariant and produce the request form.
    ///
    /// All missing fields are reported together.
    pub fn validate(&self) -> Result<SubmitRequest, CoreError> {
        let mut missing = Vec::new();
        if self.input_file_ref.trim().is_empty() {
            missing.push("input_file");
        }
        if self.model_id.is_none() {
            missing.push("model_id");
        }
        if self.embedding_mode.is_none() {
            missing.push("embedding_mode");
        }

        match (self.model_id, self.embedding_mode) {
            (Some(model_id), Some(embedding_mode)) if missing.is_empty() => Ok(SubmitRequest {
                input_file: self.input_file_ref.clone(),
                model_id,
                embedding_mode,
            }),
            _ => Err(CoreError::Validation(format!(
                "Workflow is missing required fields: {}",
                missing.join(", ")
            ))),
        }
    }
}

/// Whether a local file name carries the extension the service expects.
///
/// This is a hint only; the service performs the real format check.
pub fn has_accepted_extension(file_name: &str) -> bool {
    std::path::Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(ACCEPTED_INPUT_EXTENSION))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn complete_spec() -> WorkflowSpec {
        WorkflowSpec {
            input_file_ref: "abc123.h5ad".to_string(),
            model_id: Some(ModelId::Scgpt),
            embedding_mode: Some(EmbeddingMode::Cls),
        }
    }

    #[test]
    fn empty_spec_is_not_submittable() {
        let spec = WorkflowSpec::default();
        assert!(!spec.is_submittable());
        assert_matches!(
            spec.validate(),
            Err(CoreError::Validation(msg)) if msg.contains("input_file, model_id, embedding_mode")
        );
    }

    #[test]
    fn complete_spec_produces_request() {
        let request = complete_spec().validate().unwrap();
        assert_eq!(request.input_file, "abc123.h5ad");
        assert_eq!(request.model_id, ModelId::Scgpt);
        assert_eq!(request.embedding_mode, EmbeddingMode::Cls);
    }

    #[test]
    fn blank_file_ref_is_rejected() {
        let spec = WorkflowSpec {
            input_file_ref: "   ".to_string(),
            ..complete_spec()
        };
        assert_matches!(spec.validate(), Err(CoreError::Validation(msg)) if msg.ends_with("input_file"));
    }

    #[test]
    fn submit_request_serializes_wire_names() {
        let json = serde_json::to_value(complete_spec().validate().unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "input_file": "abc123.h5ad",
                "model_id": "scgpt",
                "embedding_mode": "cls",
            })
        );
    }

    #[test]
    fn model_names_are_normalized() {
        assert_eq!(ModelId::from_name("scGPT"), Some(ModelId::Scgpt));
        assert_eq!(ModelId::from_name(" Geneformer "), Some(ModelId::Geneformer));
        assert_eq!(ModelId::from_name("uce"), None);
        assert!("uce".parse::<ModelId>().is_err());
    }

    #[test]
    fn embedding_mode_defaults_to_cls() {
        assert_eq!(EmbeddingMode::default(), EmbeddingMode::Cls);
        assert_eq!("GENE".parse::<EmbeddingMode>().unwrap(), EmbeddingMode::Gene);
    }

    #[test]
    fn file_handle_rejects_blank() {
        assert!(FileHandle::new("").is_err());
        assert!(FileHandle::new("  ").is_err());
        assert_eq!(FileHandle::new("x.h5ad").unwrap().as_str(), "x.h5ad");
    }

    #[test]
    fn extension_hint() {
        assert!(has_accepted_extension("pbmc.h5ad"));
        assert!(has_accepted_extension("PBMC.H5AD"));
        assert!(!has_accepted_extension("pbmc.csv"));
        assert!(!has_accepted_extension("h5ad"));
    }
}
