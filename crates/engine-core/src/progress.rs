use crate::{error::ProgressError, state::JobProgressStore};
use chrono::{DateTime, Utc};
use model::{
    core::identifiers::JobId,
    job::{JobInfo, JobStatus},
};
use serde::Serialize;
use std::sync::Arc;

#[derive(Clone)]
pub struct ProgressService {
    pub store: Arc<dyn JobProgressStore>,
}

/// Job progress as reported to users.
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub job_id: String,
    pub status: JobStatus,
    pub total_expected: Option<u64>,
    pub finished_count: u64,
    pub percent: u8,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<JobInfo> for JobReport {
    fn from(info: JobInfo) -> Self {
        JobReport {
            percent: info.process_percent(),
            job_id: info.job_id.to_string(),
            status: info.status,
            total_expected: info.total_expected,
            finished_count: info.finished_count,
            error: info.error,
            started_at: info.started_at,
            updated_at: info.updated_at,
        }
    }
}

impl ProgressService {
    pub fn new(store: Arc<dyn JobProgressStore>) -> Self {
        ProgressService { store }
    }

    pub async fn job_report(&self, job_id: &str) -> Result<JobReport, ProgressError> {
        if job_id.trim().is_empty() {
            return Err(ProgressError::UnknownJob("job id is empty".to_string()));
        }

        let info = self
            .store
            .job_info(&JobId::from(job_id))
            .await?
            .ok_or_else(|| ProgressError::UnknownJob(job_id.to_string()))?;

        Ok(JobReport::from(info))
    }

    /// All known jobs, most recently started first.
    pub async fn all_reports(&self) -> Result<Vec<JobReport>, ProgressError> {
        let mut jobs = self.store.list_jobs().await?;
        jobs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(jobs.into_iter().map(JobReport::from).collect())
    }
}
