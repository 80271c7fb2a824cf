use crate::core::identifiers::JobId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Running,
    Finished,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Running => "Running",
            JobStatus::Finished => "Finished",
            JobStatus::Failed => "Failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Running)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress record of one load job as kept by the job progress store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobInfo {
    pub job_id: JobId,
    pub status: JobStatus,
    /// Frozen when the submission channel closes.
    pub total_expected: Option<u64>,
    pub finished_count: u64,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobInfo {
    pub fn new(job_id: JobId) -> Self {
        let now = Utc::now();
        JobInfo {
            job_id,
            status: JobStatus::Running,
            total_expected: None,
            finished_count: 0,
            error: None,
            started_at: now,
            updated_at: now,
        }
    }

    /// Total expected only ever grows; a smaller value is ignored.
    pub fn apply_total_expected(&mut self, count: u64) {
        let total = self.total_expected.map_or(count, |current| current.max(count));
        self.total_expected = Some(total);
        self.touch();
    }

    pub fn apply_finished(&mut self, delta: u64) {
        self.finished_count = self.finished_count.saturating_add(delta);
        self.touch();
    }

    /// Returns `false` when the job had already reached a terminal status.
    pub fn mark_finished(&mut self) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = JobStatus::Finished;
        self.touch();
        true
    }

    /// Returns `false` when the job had already reached a terminal status.
    pub fn mark_failed(&mut self, reason: impl Into<String>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = JobStatus::Failed;
        self.error = Some(reason.into());
        self.touch();
        true
    }

    /// Puts a terminal job back to `Running` for another run under the same id.
    /// The error and the frozen total are cleared; the finished count is kept
    /// because files loaded by earlier runs are skipped, not reloaded.
    ///
    /// Returns `false` when the job was still running.
    pub fn reopen(&mut self) -> bool {
        if !self.status.is_terminal() {
            return false;
        }
        self.status = JobStatus::Running;
        self.error = None;
        self.total_expected = None;
        self.touch();
        true
    }

    /// Completion percentage for display.
    ///
    /// A finished job is always 100. A running job never reports 100 even if
    /// its finished count already reached the frozen total.
    pub fn process_percent(&self) -> u8 {
        if self.status == JobStatus::Finished {
            return 100;
        }

        match self.total_expected {
            Some(total) if total > 0 => {
                let pct = self.finished_count.saturating_mul(100) / total;
                pct.min(99) as u8
            }
            _ => 0,
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> JobInfo {
        JobInfo::new(JobId::from("load_test"))
    }

    #[test]
    fn total_expected_never_shrinks() {
        let mut info = job();
        info.apply_total_expected(7);
        info.apply_total_expected(3);
        assert_eq!(info.total_expected, Some(7));

        info.apply_total_expected(9);
        assert_eq!(info.total_expected, Some(9));
    }

    #[test]
    fn terminal_status_is_sticky() {
        let mut info = job();
        assert!(info.mark_failed("remote task failed"));
        assert!(!info.mark_finished());
        assert_eq!(info.status, JobStatus::Failed);
        assert_eq!(info.error.as_deref(), Some("remote task failed"));
    }

    #[test]
    fn reopen_clears_failure_of_previous_run() {
        let mut info = job();
        info.apply_total_expected(3);
        info.apply_finished(2);
        assert!(info.mark_failed("collection not found"));

        assert!(info.reopen());
        assert_eq!(info.status, JobStatus::Running);
        assert_eq!(info.error, None);
        assert_eq!(info.total_expected, None);
        assert_eq!(info.finished_count, 2);

        assert!(!info.reopen());
        assert!(info.mark_finished());
        assert_eq!(info.process_percent(), 100);
    }

    #[test]
    fn percent_is_capped_until_finished() {
        let mut info = job();
        assert_eq!(info.process_percent(), 0);

        info.apply_total_expected(4);
        info.apply_finished(1);
        assert_eq!(info.process_percent(), 25);

        info.apply_finished(3);
        assert_eq!(info.process_percent(), 99);

        info.mark_finished();
        assert_eq!(info.process_percent(), 100);
    }

    #[test]
    fn survives_bincode_round_trip() {
        let mut info = job();
        info.apply_total_expected(2);
        info.apply_finished(1);

        let bytes = bincode::serialize(&info).unwrap();
        let decoded: JobInfo = bincode::deserialize(&bytes).unwrap();
        assert_eq!(decoded, info);
    }
}
