//! Read-only projection of a workflow's produced artifacts.

use serde::Serialize;

use crate::workflow::{ResultItem, WorkflowRecord};

/// Stable reference to a downloadable artifact.
///
/// Derived only from `(job_id, result_id)`, so the same pair always
/// yields the same reference. The HTTP client turns it into a URL,
/// percent-encoding each id as a path segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DownloadRef {
    pub job_id: String,
    pub result_id: String,
}

impl DownloadRef {
    pub fn new(job_id: impl Into<String>, result_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            result_id: result_id.into(),
        }
    }
}

/// Results of one workflow snapshot.
///
/// Built from a single [`WorkflowRecord`]; rebuild it for every new
/// snapshot rather than patching an old one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultSet {
    job_id: String,
    results: Vec<ResultItem>,
}

impl ResultSet {
    /// Results of `record`, referenced under the id the record reports.
    pub fn from_record(record: &WorkflowRecord) -> Self {
        Self::for_job(record.id.as_str(), record)
    }

    /// Results of `record`, referenced under `job_id`.
    ///
    /// Use this when the job id is already known, e.g. the id a watch
    /// was started for.
    pub fn for_job(job_id: impl Into<String>, record: &WorkflowRecord) -> Self {
        Self {
            job_id: job_id.into(),
            results: record.results.clone(),
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Results in the order the service reported them.
    pub fn results(&self) -> &[ResultItem] {
        &self.results
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Download reference for a result in this set.
    pub fn download_ref(&self, result_id: &str) -> Option<DownloadRef> {
        self.results
            .iter()
            .any(|r| r.id == result_id)
            .then(|| DownloadRef::new(self.job_id.as_str(), result_id))
    }

    /// Every result paired with its download reference.
    pub fn entries(&self) -> impl Iterator<Item = (&ResultItem, DownloadRef)> + '_ {
        self.results
            .iter()
            .map(|r| (r, DownloadRef::new(self.job_id.as_str(), r.id.as_str())))
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::workflow::WorkflowStatus;

    fn completed_record() -> WorkflowRecord {
        WorkflowRecord {
            id: "wf-1".to_string(),
            status: WorkflowStatus::Completed,
            progress: 1.0,
            error_message: None,
            results: vec![ResultItem {
                id: "r1".to_string(),
                kind: "embedding".to_string(),
                size_bytes: 2048,
                created_at: Some(chrono::Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()),
            }],
            created_at: None,
        }
    }

    #[test]
    fn exposes_results_unchanged() {
        let record = completed_record();
        let set = ResultSet::from_record(&record);
        assert_eq!(set.job_id(), "wf-1");
        assert_eq!(set.results(), record.results.as_slice());
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn download_ref_is_deterministic() {
        let set = ResultSet::from_record(&completed_record());
        let a = set.download_ref("r1").unwrap();
        let b = ResultSet::from_record(&completed_record()).download_ref("r1").unwrap();
        assert_eq!(a, b);
        assert_eq!(a, DownloadRef::new("wf-1", "r1"));
    }

    #[test]
    fn for_job_uses_the_given_id() {
        let mut record = completed_record();
        record.id = "echoed-id".to_string();
        let set = ResultSet::for_job("wf-1", &record);
        assert_eq!(set.job_id(), "wf-1");
        assert_eq!(set.download_ref("r1"), Some(DownloadRef::new("wf-1", "r1")));
    }

    #[test]
    fn unknown_result_has_no_download_ref() {
        let set = ResultSet::from_record(&completed_record());
        assert_eq!(set.download_ref("r9"), None);
    }

    #[test]
    fn entries_pair_each_result_with_its_ref() {
        let set = ResultSet::from_record(&completed_record());
        let entries: Vec<_> = set.entries().collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0.id, "r1");
        assert_eq!(entries[0].1, DownloadRef::new("wf-1", "r1"));
    }
}
