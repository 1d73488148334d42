//! Compute-target catalog filtering.
//!
//! The service advertises every model it hosts; the wizard may only offer
//! the ones known to work with single-cell workflows.

use serde::{Deserialize, Serialize};

use crate::workflow_spec::ModelId;

/// A model as described by `GET /models`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub name: String,
    #[serde(rename = "type", default)]
    pub model_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub input_formats: Vec<String>,
    #[serde(default)]
    pub version: String,
}

impl ModelDescriptor {
    /// The compatible model this descriptor names, if any.
    pub fn model_id(&self) -> Option<ModelId> {
        ModelId::from_name(&self.name)
    }
}

/// A descriptor that passed the compatibility filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompatibleModel {
    pub id: ModelId,
    pub descriptor: ModelDescriptor,
}

/// Models the wizard may offer, in service order.
///
/// An empty catalog is a valid outcome ("no compatible targets"), not
/// an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ModelCatalog {
    models: Vec<CompatibleModel>,
}

impl ModelCatalog {
    /// Keep only compatible descriptors, preserving their order.
    pub fn from_descriptors(descriptors: impl IntoIterator<Item = ModelDescriptor>) -> Self {
        let models = descriptors
            .into_iter()
            .filter_map(|descriptor| {
                descriptor
                    .model_id()
                    .map(|id| CompatibleModel { id, descriptor })
            })
            .collect();
        Self { models }
    }

    pub fn models(&self) -> &[CompatibleModel] {
        &self.models
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn find(&self, id: ModelId) -> Option<&CompatibleModel> {
        self.models.iter().find(|m| m.id == id)
    }

    pub fn contains(&self, id: ModelId) -> bool {
        self.find(id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(name: &str) -> ModelDescriptor {
        ModelDescriptor {
            name: name.to_string(),
            model_type: "single_cell".to_string(),
            description: String::new(),
            input_formats: vec!["h5ad".to_string()],
            version: "1.0".to_string(),
        }
    }

    #[test]
    fn filters_to_compatible_set_in_service_order() {
        let catalog = ModelCatalog::from_descriptors(vec![
            descriptor("UCE"),
            descriptor("Geneformer"),
            descriptor("esm2"),
            descriptor("scGPT"),
        ]);
        let ids: Vec<_> = catalog.models().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![ModelId::Geneformer, ModelId::Scgpt]);
        assert_eq!(catalog.find(ModelId::Scgpt).unwrap().descriptor.name, "scGPT");
    }

    #[test]
    fn no_compatible_models_is_empty_not_error() {
        let catalog = ModelCatalog::from_descriptors(vec![descriptor("esm2")]);
        assert!(catalog.is_empty());
        assert!(!catalog.contains(ModelId::Scgpt));
    }

    #[test]
    fn descriptor_tolerates_missing_optional_fields() {
        let d: ModelDescriptor = serde_json::from_value(serde_json::json!({
            "name": "scgpt",
            "type": "single_cell",
        }))
        .unwrap();
        assert_eq!(d.model_type, "single_cell");
        assert!(d.input_formats.is_empty());
        assert_eq!(d.model_id(), Some(ModelId::Scgpt));
    }
}
