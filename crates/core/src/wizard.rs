//! Intake wizard state machine.
//!
//! The wizard walks the user through three strictly linear steps
//! (upload, model selection, configuration). Every [`WizardState`] is an
//! immutable snapshot; [`WizardState::apply`] is a pure transition that
//! either returns the next snapshot or explains why the action is not
//! allowed. Nothing here renders or performs I/O.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::workflow_spec::{EmbeddingMode, FileHandle, ModelId, SubmitRequest, WorkflowSpec};

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

/// The three wizard steps, in order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    #[default]
    Upload,
    SelectModel,
    Configure,
}

/// Total number of steps in the wizard.
pub const TOTAL_STEPS: u8 = 3;

impl WizardStep {
    /// Convert a 1-based step number to a `WizardStep`.
    pub fn from_number(n: u8) -> Result<Self, CoreError> {
        match n {
            1 => Ok(Self::Upload),
            2 => Ok(Self::SelectModel),
            3 => Ok(Self::Configure),
            _ => Err(CoreError::Validation(format!(
                "Invalid step number {n}. Must be between 1 and {TOTAL_STEPS}"
            ))),
        }
    }

    /// Convert to a 1-based step number.
    pub fn number(self) -> u8 {
        match self {
            Self::Upload => 1,
            Self::SelectModel => 2,
            Self::Configure => 3,
        }
    }

    /// Human-readable label for the step.
    pub fn label(self) -> &'static str {
        match self {
            Self::Upload => "Upload Data",
            Self::SelectModel => "Select Model",
            Self::Configure => "Configure Settings",
        }
    }

    pub fn next(self) -> Option<Self> {
        match self {
            Self::Upload => Some(Self::SelectModel),
            Self::SelectModel => Some(Self::Configure),
            Self::Configure => None,
        }
    }

    pub fn previous(self) -> Option<Self> {
        match self {
            Self::Upload => None,
            Self::SelectModel => Some(Self::Upload),
            Self::Configure => Some(Self::SelectModel),
        }
    }
}

// ---------------------------------------------------------------------------
// Actions and errors
// ---------------------------------------------------------------------------

/// Everything the user (or an agent callback) can do to the wizard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardAction {
    /// The upload finished and the service issued a handle.
    FileUploaded(FileHandle),
    ModelSelected(ModelId),
    EmbeddingModeSelected(EmbeddingMode),
    Next,
    Previous,
    /// The submit control was pressed and the request is about to go out.
    SubmissionStarted,
    /// The submission came back with an error; editing is allowed again.
    SubmissionFailed,
}

/// Reasons a wizard action is refused.
///
/// All of these are local validation outcomes: the caller re-enables or
/// keeps disabling the relevant control, nothing reaches the network.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WizardError {
    #[error("Upload an input file before continuing")]
    MissingInputFile,

    #[error("Select a model before continuing")]
    MissingModel,

    #[error("There is no step {direction} '{}'", .from.label())]
    NoSuchStep {
        from: WizardStep,
        direction: &'static str,
    },

    #[error("The wizard is locked while a submission is in flight")]
    Locked,

    #[error("Submission is only possible from the final step")]
    NotOnFinalStep,

    #[error(transparent)]
    Invalid(#[from] CoreError),
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Immutable snapshot of the wizard.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WizardState {
    step: WizardStep,
    spec: WorkflowSpec,
    submitting: bool,
}

impl WizardState {
    /// A freshly opened wizard: step 1 with an empty spec.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn spec(&self) -> &WorkflowSpec {
        &self.spec
    }

    /// `true` between `SubmissionStarted` and `SubmissionFailed`.
    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// Whether the "Next" control should be enabled.
    pub fn can_advance(&self) -> bool {
        !self.submitting && self.advance_target().is_ok()
    }

    /// Whether the "Previous" control should be enabled.
    pub fn can_go_back(&self) -> bool {
        !self.submitting && self.step.previous().is_some()
    }

    /// Whether the submit control should be enabled.
    pub fn can_submit(&self) -> bool {
        !self.submitting && self.submit_request().is_ok()
    }

    /// Re-validate the whole spec for the final submit action.
    pub fn submit_request(&self) -> Result<SubmitRequest, WizardError> {
        if self.step != WizardStep::Configure {
            return Err(WizardError::NotOnFinalStep);
        }
        Ok(self.spec.validate()?)
    }

    /// Apply an action, returning the next snapshot.
    ///
    /// `self` is never modified; a refused action leaves the caller
    /// holding the unchanged previous snapshot.
    pub fn apply(&self, action: WizardAction) -> Result<Self, WizardError> {
        if self.submitting && action != WizardAction::SubmissionFailed {
            return Err(WizardError::Locked);
        }

        let mut next = self.clone();
        match action {
            WizardAction::FileUploaded(handle) => {
                next.spec.input_file_ref = handle.into_inner();
            }
            WizardAction::ModelSelected(model_id) => {
                next.spec.model_id = Some(model_id);
            }
            WizardAction::EmbeddingModeSelected(mode) => {
                next.spec.embedding_mode = Some(mode);
            }
            WizardAction::Next => {
                next.step = self.advance_target()?;
                if next.step == WizardStep::Configure && next.spec.embedding_mode.is_none() {
                    next.spec.embedding_mode = Some(EmbeddingMode::default());
                }
            }
            WizardAction::Previous => {
                next.step = self.step.previous().ok_or(WizardError::NoSuchStep {
                    from: self.step,
                    direction: "before",
                })?;
            }
            WizardAction::SubmissionStarted => {
                self.submit_request()?;
                next.submitting = true;
            }
            WizardAction::SubmissionFailed => {
                next.submitting = false;
            }
        }
        Ok(next)
    }

    /// The step "Next" would move to, if its guard is satisfied.
    fn advance_target(&self) -> Result<WizardStep, WizardError> {
        let target = self.step.next().ok_or(WizardError::NoSuchStep {
            from: self.step,
            direction: "after",
        })?;

        match self.step {
            WizardStep::Upload if self.spec.input_file_ref.trim().is_empty() => {
                Err(WizardError::MissingInputFile)
            }
            WizardStep::SelectModel if self.spec.model_id.is_none() => {
                Err(WizardError::MissingModel)
            }
            _ => Ok(target),
        }
    }
}
