use crate::{error::StoreError, state::JobProgressStore};
use async_trait::async_trait;
use model::{core::identifiers::JobId, job::JobInfo};
use sled::transaction::{ConflictableTransactionError, TransactionError};
use std::path::Path;
use tracing::{info, warn};

/// Job store persisted in sled so progress survives restarts and can be
/// inspected from the CLI.
pub struct SledJobStore {
    db: sled::Db,
}

impl SledJobStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, sled::Error> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    #[inline]
    fn job_key(job_id: &JobId) -> String {
        format!("job:{}", job_id)
    }

    /// Job id and collection are length-prefixed, so names containing `:`
    /// cannot collide across jobs or collections.
    #[inline]
    fn file_key(job_id: &JobId, collection: &str, file: &str) -> String {
        let job_id = job_id.as_str();
        format!(
            "file:{}:{}{}:{}{}",
            job_id.len(),
            job_id,
            collection.len(),
            collection,
            file
        )
    }

    /// Read-modify-write of one job record inside a transaction, so concurrent
    /// updates to the same job never lose increments. `apply` may run more
    /// than once if the transaction is retried.
    fn update_job<R>(
        &self,
        job_id: &JobId,
        apply: impl Fn(&mut JobInfo) -> R,
    ) -> Result<R, StoreError> {
        let key = Self::job_key(job_id);

        let result = self.db.transaction::<_, _, StoreError>(|tx_db| {
            let mut info = match tx_db.get(key.as_bytes())? {
                Some(bytes) => bincode::deserialize::<JobInfo>(&bytes)
                    .map_err(|e| ConflictableTransactionError::Abort(e.into()))?,
                None => JobInfo::new(job_id.clone()),
            };

            let out = apply(&mut info);

            let bytes = bincode::serialize(&info)
                .map_err(|e| ConflictableTransactionError::Abort(e.into()))?;
            tx_db.insert(key.as_bytes(), bytes)?;
            Ok(out)
        });

        match result {
            Ok(out) => Ok(out),
            Err(TransactionError::Abort(e)) => Err(e),
            Err(TransactionError::Storage(e)) => Err(StoreError::Sled(e)),
        }
    }
}

#[async_trait]
impl JobProgressStore for SledJobStore {
    async fn start_job(&self, job_id: &JobId) -> Result<(), StoreError> {
        if self.update_job(job_id, |info| info.reopen())? {
            info!(job_id = %job_id, "Reopened terminal job for another run");
        }
        Ok(())
    }

    async fn set_total_expected(&self, job_id: &JobId, count: u64) -> Result<(), StoreError> {
        self.update_job(job_id, |info| info.apply_total_expected(count))
    }

    async fn add_finished(&self, job_id: &JobId, delta: u64) -> Result<(), StoreError> {
        self.update_job(job_id, |info| info.apply_finished(delta))
    }

    async fn set_finished(&self, job_id: &JobId) -> Result<(), StoreError> {
        if !self.update_job(job_id, |info| info.mark_finished())? {
            warn!(job_id = %job_id, "Job already terminal, finished flag ignored");
        }
        Ok(())
    }

    async fn set_failed(&self, job_id: &JobId, reason: &str) -> Result<(), StoreError> {
        if !self.update_job(job_id, |info| info.mark_failed(reason))? {
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
        let key = Self::file_key(job_id, collection, file);
        let at = chrono::Utc::now().timestamp_millis();
        self.db.insert(key, at.to_be_bytes().to_vec())?;
        Ok(())
    }

    async fn is_file_task_done(
        &self,
        job_id: &JobId,
        collection: &str,
        file: &str,
    ) -> Result<bool, StoreError> {
        let key = Self::file_key(job_id, collection, file);
        Ok(self.db.contains_key(key)?)
    }

    async fn job_info(&self, job_id: &JobId) -> Result<Option<JobInfo>, StoreError> {
        match self.db.get(Self::job_key(job_id))? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn list_jobs(&self) -> Result<Vec<JobInfo>, StoreError> {
        let mut jobs = Vec::new();
        for item in self.db.scan_prefix("job:") {
            let (_key, value) = item?;
            jobs.push(bincode::deserialize::<JobInfo>(&value)?);
        }
        Ok(jobs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::job::JobStatus;
    use std::sync::Arc;
    use tempfile::tempdir;

    #[tokio::test]
    async fn persists_progress_across_reopen() {
        let dir = tempdir().unwrap();
        let job = JobId::from("load_persist");

        {
            let store = SledJobStore::open(dir.path()).unwrap();
            store.start_job(&job).await.unwrap();
            store.set_total_expected(&job, 3).await.unwrap();
            store.add_finished(&job, 1).await.unwrap();
            store
                .mark_file_task_done(&job, "books", "part-1.json")
                .await
                .unwrap();
        }

        let store = SledJobStore::open(dir.path()).unwrap();
        let info = store.job_info(&job).await.unwrap().unwrap();
        assert_eq!(info.total_expected, Some(3));
        assert_eq!(info.finished_count, 1);
        assert!(
            store
                .is_file_task_done(&job, "books", "part-1.json")
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn jobs_do_not_interfere() {
        let dir = tempdir().unwrap();
        let store = Arc::new(SledJobStore::open(dir.path()).unwrap());
        let a = JobId::from("load_a");
        let b = JobId::from("load_b");

        let mut handles = Vec::new();
        for i in 0..40 {
            let store = store.clone();
            let job = if i % 2 == 0 { a.clone() } else { b.clone() };
            handles.push(tokio::spawn(async move {
                store.add_finished(&job, 1).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        store.set_failed(&b, "remote task failed").await.unwrap();

        let info_a = store.job_info(&a).await.unwrap().unwrap();
        let info_b = store.job_info(&b).await.unwrap().unwrap();
        assert_eq!(info_a.finished_count, 20);
        assert_eq!(info_a.status, JobStatus::Running);
        assert_eq!(info_b.finished_count, 20);
        assert_eq!(info_b.status, JobStatus::Failed);
    }

    #[tokio::test]
    async fn file_markers_with_colons_do_not_collide() {
        let dir = tempdir().unwrap();
        let store = SledJobStore::open(dir.path()).unwrap();
        let a = JobId::from("a");
        let ab = JobId::from("a:b");

        store.mark_file_task_done(&a, "b:c", "x.json").await.unwrap();

        assert!(store.is_file_task_done(&a, "b:c", "x.json").await.unwrap());
        assert!(!store.is_file_task_done(&ab, "c", "x.json").await.unwrap());
        assert!(!store.is_file_task_done(&a, "b", "c:x.json").await.unwrap());
    }

    #[tokio::test]
    async fn reopens_failed_job_on_restart() {
        let dir = tempdir().unwrap();
        let store = SledJobStore::open(dir.path()).unwrap();
        let job = JobId::from("load_rerun");

        store.start_job(&job).await.unwrap();
        store.set_total_expected(&job, 2).await.unwrap();
        store.set_failed(&job, "collection not found").await.unwrap();
        store.start_job(&job).await.unwrap();

        let info = store.job_info(&job).await.unwrap().unwrap();
        assert_eq!(info.status, JobStatus::Running);
        assert_eq!(info.error, None);
        assert_eq!(info.total_expected, None);
    }

    #[tokio::test]
    async fn lists_only_job_records() {
        let dir = tempdir().unwrap();
        let store = SledJobStore::open(dir.path()).unwrap();
        let job = JobId::from("load_list");

        store.start_job(&job).await.unwrap();
        store
            .mark_file_task_done(&job, "books", "part-1.json")
            .await
            .unwrap();

        let jobs = store.list_jobs().await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].job_id, job);
    }
}
