use crate::error::StoreError;
use async_trait::async_trait;
use model::{core::identifiers::JobId, job::JobInfo};

pub mod memory;
pub mod sled_store;

/// Process-wide record of load job progress, keyed by job id.
///
/// Every mutation creates the job record if it does not exist yet, so
/// independent taskers can report against their own job without setup.
/// Implementations must serialize updates per job.
#[async_trait]
pub trait JobProgressStore: Send + Sync {
    /// Registers a run of the job. A job left Finished or Failed by an earlier
    /// run is reopened as Running; its done file markers are kept.
    async fn start_job(&self, job_id: &JobId) -> Result<(), StoreError>;

    async fn set_total_expected(&self, job_id: &JobId, count: u64) -> Result<(), StoreError>;

    async fn add_finished(&self, job_id: &JobId, delta: u64) -> Result<(), StoreError>;

    async fn set_finished(&self, job_id: &JobId) -> Result<(), StoreError>;

    async fn set_failed(&self, job_id: &JobId, reason: &str) -> Result<(), StoreError>;

    async fn mark_file_task_done(
        &self,
        job_id: &JobId,
        collection: &str,
        file: &str,
    ) -> Result<(), StoreError>;

    async fn is_file_task_done(
        &self,
        job_id: &JobId,
        collection: &str,
        file: &str,
    ) -> Result<bool, StoreError>;

    async fn job_info(&self, job_id: &JobId) -> Result<Option<JobInfo>, StoreError>;

    async fn list_jobs(&self) -> Result<Vec<JobInfo>, StoreError>;
}
