use crate::error::LoaderError;
use async_trait::async_trait;
use model::{
    core::identifiers::RemoteTaskId,
    load::{BulkLoadState, FileTask},
};
use tokio_util::sync::CancellationToken;

/// Client for the remote vector database's bulk-insert API.
///
/// The cancellation token is the caller's context; implementations should
/// abandon in-flight requests once it fires and return `LoaderError::Cancelled`.
#[async_trait]
pub trait RemoteLoadClient: Send + Sync {
    /// Submit a dumped file as a bulk-insert task into its collection.
    async fn submit(
        &self,
        cancel: &CancellationToken,
        task: &FileTask,
    ) -> Result<RemoteTaskId, LoaderError>;

    /// Query the current state of a previously submitted task.
    async fn get_state(
        &self,
        cancel: &CancellationToken,
        task_id: RemoteTaskId,
    ) -> Result<BulkLoadState, LoaderError>;

    /// Called once after every task of a job has been confirmed.
    async fn post_process(&self, _cancel: &CancellationToken) -> Result<(), LoaderError> {
        Ok(())
    }
}
