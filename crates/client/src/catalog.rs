//! Lazily loaded model catalog.

use std::sync::Arc;

use tokio::sync::OnceCell;

use cellflow_core::catalog::ModelCatalog;

use crate::api::ServiceApi;
use crate::error::ClientError;

/// Fetches the model list once per wizard session and keeps only the
/// models that work with single-cell workflows.
///
/// A failed fetch is not remembered, so the next call tries again.
#[derive(Debug)]
pub struct CatalogAgent {
    api: Arc<ServiceApi>,
    model_type: Option<String>,
    catalog: OnceCell<ModelCatalog>,
}

impl CatalogAgent {
    pub fn new(api: Arc<ServiceApi>) -> Self {
        Self {
            api,
            model_type: None,
            catalog: OnceCell::new(),
        }
    }

    /// Narrow the service-side listing by model type.
    pub fn with_model_type(mut self, model_type: impl Into<String>) -> Self {
        self.model_type = Some(model_type.into());
        self
    }

    pub async fn list_compatible_models(&self) -> Result<ModelCatalog, ClientError> {
        self.catalog
            .get_or_try_init(|| async {
                let descriptors = self
                    .api
                    .list_models(self.model_type.as_deref())
                    .await
                    .map_err(|e| {
                        tracing::warn!(error = %e, "Model catalog fetch failed");
                        ClientError::Fetch(e.to_string())
                    })?;

                let total = descriptors.len();
                let catalog = ModelCatalog::from_descriptors(descriptors);
                tracing::info!(
                    total,
                    compatible = catalog.len(),
                    "Model catalog loaded",
                );
                Ok::<_, ClientError>(catalog)
            })
            .await
            .cloned()
    }

    /// The catalog if it has already been loaded.
    pub fn cached(&self) -> Option<&ModelCatalog> {
        self.catalog.get()
    }
}
