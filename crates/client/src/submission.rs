//! Job submission with double-submit protection.
//!
//! The in-flight flag is claimed before the first await, so two calls
//! racing on the same controller produce exactly one `POST`. The flag is
//! released by a drop guard: completing, failing, or dropping the submit
//! future all re-enable submission.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cellflow_core::workflow_spec::WorkflowSpec;

use crate::error::ClientError;
use crate::service::WorkflowService;

/// A job the service accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobHandle {
    pub id: String,
}

/// Creates workflows from validated specs, one request at a time.
pub struct SubmissionController<S> {
    service: Arc<S>,
    in_flight: AtomicBool,
}

impl<S: WorkflowService> SubmissionController<S> {
    pub fn new(service: Arc<S>) -> Self {
        Self {
            service,
            in_flight: AtomicBool::new(false),
        }
    }

    /// `true` while a submission is outstanding.
    pub fn is_submitting(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Validate `spec` and create the workflow.
    ///
    /// Keeps no job state: the returned handle is all there is.
    pub async fn submit(&self, spec: &WorkflowSpec) -> Result<JobHandle, ClientError> {
        let request = spec
            .validate()
            .map_err(|e| ClientError::InvalidSpec(e.to_string()))?;

        let _guard = InFlightGuard::claim(&self.in_flight).ok_or_else(|| {
            tracing::debug!("Submission ignored, another is in flight");
            ClientError::AlreadySubmitting
        })?;

        tracing::info!(
            model_id = %request.model_id,
            embedding_mode = %request.embedding_mode,
            input_file = %request.input_file,
            "Submitting workflow",
        );

        match self.service.create_workflow(&request).await {
            Ok(id) => {
                tracing::info!(job_id = %id, "Workflow created");
                Ok(JobHandle { id })
            }
            Err(e) => {
                tracing::error!(error = %e, "Workflow submission failed");
                Err(ClientError::SubmissionFailed(e.to_string()))
            }
        }
    }
}

/// Holds the in-flight flag for the lifetime of one submit call.
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    fn claim(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
