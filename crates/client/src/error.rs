//! Client error taxonomy and how each class is meant to be handled.

use cellflow_core::wizard::WizardError;

/// Errors surfaced by the client engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// Network, connectivity or timeout failure. Retryable.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The service answered, but not with anything usable. Asking again
    /// gets the same answer.
    #[error("Service rejected the request: {0}")]
    ServiceRejected(String),

    /// The workflow specification is incomplete; nothing was sent.
    #[error("Invalid workflow specification: {0}")]
    InvalidSpec(String),

    /// The file picked for upload is unusable; nothing was sent.
    #[error("Invalid upload: {0}")]
    InvalidUpload(String),

    /// A submission is already in flight for this controller.
    #[error("A submission is already in flight")]
    AlreadySubmitting,

    /// The service does not know the workflow id.
    #[error("Workflow {0} not found")]
    JobNotFound(String),

    /// The service did not create the workflow.
    #[error("Workflow submission failed: {0}")]
    SubmissionFailed(String),

    /// The model catalog could not be loaded.
    #[error("Failed to load models: {0}")]
    Fetch(String),

    /// Client configuration is unusable.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// How a caller should react to a [`ClientError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Resolve in place by re-enabling the gated control. No alert.
    Local,
    /// Show the error with a retry affordance.
    Retryable,
    /// Stop; the user has to start over explicitly.
    Terminal,
}

impl ClientError {
    pub fn disposition(&self) -> Disposition {
        match self {
            Self::InvalidSpec(_) | Self::InvalidUpload(_) | Self::AlreadySubmitting => {
                Disposition::Local
            }
            Self::Transport(_) | Self::Fetch(_) => Disposition::Retryable,
            Self::ServiceRejected(_)
            | Self::JobNotFound(_)
            | Self::SubmissionFailed(_)
            | Self::Config(_) => Disposition::Terminal,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.disposition() == Disposition::Retryable
    }
}

impl From<WizardError> for ClientError {
    fn from(err: WizardError) -> Self {
        Self::InvalidSpec(err.to_string())
    }
}
