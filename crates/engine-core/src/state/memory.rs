use crate::{error::StoreError, state::JobProgressStore};
use async_trait::async_trait;
use model::{core::identifiers::JobId, job::JobInfo};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use tracing::{info, warn};

struct JobEntry {
    info: JobInfo,
    done_files: HashSet<(String, String)>,
}

impl JobEntry {
    fn new(job_id: &JobId) -> Self {
        JobEntry {
            info: JobInfo::new(job_id.clone()),
            done_files: HashSet::new(),
        }
    }
}

/// In-process job store. Lost on restart.
#[derive(Default)]
pub struct MemoryJobStore {
    jobs: RwLock<HashMap<JobId, JobEntry>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn with_job<R>(&self, job_id: &JobId, f: impl FnOnce(&mut JobEntry) -> R) -> R {
        let mut jobs = self.jobs.write().await;
        let entry = jobs
            .entry(job_id.clone())
            .or_insert_with(|| JobEntry::new(job_id));
        f(entry)
    }
}

#[async_trait]
impl JobProgressStore for MemoryJobStore {
    async fn start_job(&self, job_id: &JobId) -> Result<(), StoreError> {
        if self.with_job(job_id, |entry| entry.info.reopen()).await {
            info!(job_id = %job_id, "Reopened terminal job for another run");
        }
        Ok(())
    }

    async fn set_total_expected(&self, job_id: &JobId, count: u64) -> Result<(), StoreError> {
        self.with_job(job_id, |entry| entry.info.apply_total_expected(count))
            .await;
        Ok(())
    }

    async fn add_finished(&self, job_id: &JobId, delta: u64) -> Result<(), StoreError> {
        self.with_job(job_id, |entry| entry.info.apply_finished(delta))
            .await;
        Ok(())
    }

    async fn set_finished(&self, job_id: &JobId) -> Result<(), StoreError> {
        let changed = self
            .with_job(job_id, |entry| entry.info.mark_finished())
            .await;
        if !changed {
            warn!(job_id = %job_id, "Job already terminal, finished flag ignored");
        }
        Ok(())
    }

    async fn set_failed(&self, job_id: &JobId, reason: &str) -> Result<(), StoreError> {
        let changed = self
            .with_job(job_id, |entry| entry.info.mark_failed(reason))
            .await;
        if !changed {
            warn!(job_id = %job_id, "Job already terminal, failure ignored");
        }
        Ok(())
    }

    async fn mark_file_task_done(
        &self,
        job_id: &JobId,
        collection: &str,
        file: &str,
    ) -> Result<(), StoreError> {
        self.with_job(job_id, |entry| {
            entry
                .done_files
                .insert((collection.to_string(), file.to_string()))
        })
        .await;
        Ok(())
    }

    async fn is_file_task_done(
        &self,
        job_id: &JobId,
        collection: &str,
        file: &str,
    ) -> Result<bool, StoreError> {
        let jobs = self.jobs.read().await;
        Ok(jobs.get(job_id).is_some_and(|entry| {
            entry
                .done_files
                .contains(&(collection.to_string(), file.to_string()))
        }))
    }

    async fn job_info(&self, job_id: &JobId) -> Result<Option<JobInfo>, StoreError> {
        let jobs = self.jobs.read().await;
        Ok(jobs.get(job_id).map(|entry| entry.info.clone()))
    }

    async fn list_jobs(&self) -> Result<Vec<JobInfo>, StoreError> {
        let jobs = self.jobs.read().await;
        let mut infos: Vec<JobInfo> = jobs.values().map(|entry| entry.info.clone()).collect();
        infos.sort_by(|a, b| a.job_id.cmp(&b.job_id));
        Ok(infos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::job::JobStatus;
    use std::sync::Arc;

    #[tokio::test]
    async fn creates_job_on_first_update() {
        let store = MemoryJobStore::new();
        let job = JobId::from("load_a");

        assert!(store.job_info(&job).await.unwrap().is_none());
        store.add_finished(&job, 1).await.unwrap();

        let info = store.job_info(&job).await.unwrap().unwrap();
        assert_eq!(info.finished_count, 1);
        assert_eq!(info.status, JobStatus::Running);
    }

    #[tokio::test]
    async fn concurrent_increments_are_not_lost() {
        let store = Arc::new(MemoryJobStore::new());
        let job = JobId::from("load_a");

        let mut handles = Vec::new();
        for _ in 0..50 {
            let store = store.clone();
            let job = job.clone();
            handles.push(tokio::spawn(async move {
                store.add_finished(&job, 1).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let info = store.job_info(&job).await.unwrap().unwrap();
        assert_eq!(info.finished_count, 50);
    }

    #[tokio::test]
    async fn start_job_reopens_failed_job() {
        let store = MemoryJobStore::new();
        let job = JobId::from("load_a");

        store.start_job(&job).await.unwrap();
        store.mark_file_task_done(&job, "books", "a.json").await.unwrap();
        store.set_failed(&job, "collection not found").await.unwrap();

        store.start_job(&job).await.unwrap();
        let info = store.job_info(&job).await.unwrap().unwrap();
        assert_eq!(info.status, JobStatus::Running);
        assert_eq!(info.error, None);
        assert!(store.is_file_task_done(&job, "books", "a.json").await.unwrap());
    }

    #[tokio::test]
    async fn tracks_done_files_per_job() {
        let store = MemoryJobStore::new();
        let a = JobId::from("load_a");
        let b = JobId::from("load_b");

        store
            .mark_file_task_done(&a, "books", "part-1.json")
            .await
            .unwrap();

        assert!(store.is_file_task_done(&a, "books", "part-1.json").await.unwrap());
        assert!(!store.is_file_task_done(&a, "books", "part-2.json").await.unwrap());
        assert!(!store.is_file_task_done(&b, "books", "part-1.json").await.unwrap());
    }
}
