//! Server-owned workflow snapshots.
//!
//! The client never owns a workflow; it observes successive
//! [`WorkflowRecord`] snapshots. This module defines the status
//! lifecycle, progress normalisation and the rules for accepting a new
//! snapshot after a previous one.

use std::fmt;

use serde::Serialize;

use crate::error::CoreError;
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Workflow lifecycle: `created -> running -> {completed | failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Created,
    Running,
    Completed,
    Failed,
}

impl WorkflowStatus {
    /// Parse a status string reported by the service.
    ///
    /// `pending` and `processing` are accepted as older spellings of
    /// `created` and `running`.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "created" | "pending" => Ok(Self::Created),
            "running" | "processing" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(CoreError::Malformed(format!(
                "Unknown workflow status '{s}'"
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Display label used by status badges.
    pub fn label(self) -> &'static str {
        match self {
            Self::Created => "Pending",
            Self::Running => "Processing",
            Self::Completed => "Completed",
            Self::Failed => "Failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    fn rank(self) -> u8 {
        match self {
            Self::Created => 0,
            Self::Running => 1,
            Self::Completed | Self::Failed => 2,
        }
    }

    /// Whether a snapshot with status `next` may follow one with `self`.
    ///
    /// Repeating a status is always allowed. Terminal statuses admit
    /// nothing else, and no status may move backwards.
    pub fn can_transition_to(self, next: Self) -> bool {
        if self == next {
            return true;
        }
        !self.is_terminal() && next.rank() >= self.rank()
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Normalise a raw progress value into `[0, 1]`.
///
/// Missing or non-finite values become `0`. Values above `1` and up to
/// `100` are read as percentages.
pub fn normalize_progress(raw: Option<f64>) -> f64 {
    let value = match raw {
        Some(v) if v.is_finite() => v,
        _ => return 0.0,
    };
    let fraction = if value > 1.0 && value <= 100.0 {
        value / 100.0
    } else {
        value
    };
    fraction.clamp(0.0, 1.0)
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One artifact produced by a completed workflow.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultItem {
    pub id: String,
    /// Artifact kind, e.g. `"embedding"`.
    #[serde(rename = "type")]
    pub kind: String,
    pub size_bytes: u64,
    /// Absent when the service did not report it.
    pub created_at: Option<Timestamp>,
}

/// A snapshot of a workflow as last reported by the service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowRecord {
    pub id: String,
    pub status: WorkflowStatus,
    /// Fraction in `[0, 1]`; only meaningful while running.
    pub progress: f64,
    /// Populated only when the workflow failed.
    pub error_message: Option<String>,
    /// Empty until the workflow completed.
    pub results: Vec<ResultItem>,
    /// Submission time, when the service reports it.
    pub created_at: Option<Timestamp>,
}

impl WorkflowRecord {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Progress, but only while the workflow is running.
    pub fn running_progress(&self) -> Option<f64> {
        (self.status == WorkflowStatus::Running).then_some(self.progress)
    }

    /// The failure reason, only for failed workflows.
    pub fn failure(&self) -> Option<&str> {
        match self.status {
            WorkflowStatus::Failed => self.error_message.as_deref(),
            _ => None,
        }
    }
}

/// Accept `next` as the successor of `previous`.
///
/// Rejects snapshots whose status moves backwards. While both snapshots
/// are running, progress is carried forward so it never decreases.
pub fn reconcile_snapshot(
    previous: Option<&WorkflowRecord>,
    mut next: WorkflowRecord,
) -> Result<WorkflowRecord, CoreError> {
    let Some(previous) = previous else {
        return Ok(next);
    };

    if !previous.status.can_transition_to(next.status) {
        return Err(CoreError::Validation(format!(
            "Workflow {} status moved from {} to {}",
            next.id, previous.status, next.status
        )));
    }

    if previous.status == WorkflowStatus::Running && next.status == WorkflowStatus::Running {
        next.progress = next.progress.max(previous.progress);
    }

    Ok(next)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn record(status: WorkflowStatus, progress: f64) -> WorkflowRecord {
        WorkflowRecord {
            id: "wf-1".to_string(),
            status,
            progress,
            error_message: None,
            results: Vec::new(),
            created_at: None,
        }
    }

    #[test]
    fn parse_accepts_aliases() {
        assert_eq!(WorkflowStatus::parse("pending").unwrap(), WorkflowStatus::Created);
        assert_eq!(WorkflowStatus::parse("processing").unwrap(), WorkflowStatus::Running);
        assert_eq!(WorkflowStatus::parse("Completed").unwrap(), WorkflowStatus::Completed);
        assert_matches!(WorkflowStatus::parse("exploded"), Err(CoreError::Malformed(_)));
    }

    #[test]
    fn lifecycle_transitions() {
        use WorkflowStatus::*;
        assert!(Created.can_transition_to(Running));
        assert!(Created.can_transition_to(Completed));
        assert!(Running.can_transition_to(Running));
        assert!(Running.can_transition_to(Failed));
        assert!(!Running.can_transition_to(Created));
        assert!(!Completed.can_transition_to(Running));
        assert!(!Completed.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Completed));
        assert!(Failed.can_transition_to(Failed));
    }

    #[test]
    fn progress_normalization() {
        assert_eq!(normalize_progress(None), 0.0);
        assert_eq!(normalize_progress(Some(f64::NAN)), 0.0);
        assert_eq!(normalize_progress(Some(0.4)), 0.4);
        assert_eq!(normalize_progress(Some(1.0)), 1.0);
        assert_eq!(normalize_progress(Some(40.0)), 0.4);
        assert_eq!(normalize_progress(Some(-0.5)), 0.0);
        assert_eq!(normalize_progress(Some(250.0)), 1.0);
    }

    #[test]
    fn reconcile_keeps_progress_non_decreasing() {
        let prev = record(WorkflowStatus::Running, 0.6);
        let next = reconcile_snapshot(Some(&prev), record(WorkflowStatus::Running, 0.4)).unwrap();
        assert_eq!(next.progress, 0.6);

        let next = reconcile_snapshot(Some(&prev), record(WorkflowStatus::Running, 0.7)).unwrap();
        assert_eq!(next.progress, 0.7);
    }

    #[test]
    fn reconcile_rejects_backwards_status() {
        let prev = record(WorkflowStatus::Running, 0.5);
        assert_matches!(
            reconcile_snapshot(Some(&prev), record(WorkflowStatus::Created, 0.0)),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn failure_only_reported_when_failed() {
        let mut rec = record(WorkflowStatus::Running, 0.2);
        rec.error_message = Some("stale".to_string());
        assert_eq!(rec.failure(), None);
        assert_eq!(rec.running_progress(), Some(0.2));

        rec.status = WorkflowStatus::Failed;
        assert_eq!(rec.failure(), Some("stale"));
        assert_eq!(rec.running_progress(), None);
    }
}
