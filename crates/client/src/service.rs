//! The seam between job orchestration and the HTTP transport.
//!
//! [`SubmissionController`](crate::submission::SubmissionController) and
//! [`StatusPoller`](crate::poller::StatusPoller) only need to create and
//! read workflows, so they depend on this trait rather than on
//! [`ServiceApi`](crate::api::ServiceApi) directly.

use async_trait::async_trait;

use cellflow_core::workflow::WorkflowRecord;
use cellflow_core::workflow_spec::SubmitRequest;

use crate::api::ServiceApiError;

#[async_trait]
pub trait WorkflowService: Send + Sync {
    /// Create a workflow and return its service-assigned id.
    async fn create_workflow(&self, request: &SubmitRequest) -> Result<String, ServiceApiError>;

    /// Fetch the current snapshot of a workflow.
    async fn fetch_workflow(&self, workflow_id: &str) -> Result<WorkflowRecord, ServiceApiError>;
}
