use crate::{error::MigrationError, execution::executor::LoadJob};
use model::{core::identifiers::JobId, load::FileTask};
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Whether the caller waits for the load job or gets it back as a background task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    Sync,
    Async,
}

impl DispatchMode {
    pub fn from_async_flag(is_async: bool) -> Self {
        if is_async {
            DispatchMode::Async
        } else {
            DispatchMode::Sync
        }
    }
}

pub enum Dispatched {
    Completed(JobId),
    Spawned {
        job_id: JobId,
        handle: JoinHandle<Result<(), MigrationError>>,
    },
}

impl Dispatched {
    pub fn job_id(&self) -> &JobId {
        match self {
            Dispatched::Completed(job_id) => job_id,
            Dispatched::Spawned { job_id, .. } => job_id,
        }
    }
}

pub async fn dispatch_load(
    job: LoadJob,
    files: Vec<FileTask>,
    mode: DispatchMode,
) -> Result<Dispatched, MigrationError> {
    let job_id = job.job_id().clone();

    match mode {
        DispatchMode::Sync => {
            job.run(files).await?;
            Ok(Dispatched::Completed(job_id))
        }
        DispatchMode::Async => {
            let background_id = job_id.clone();
            let handle = tokio::spawn(async move {
                let result = job.run(files).await;
                if let Err(e) = &result {
                    error!(job_id = %background_id, error = %e, "Background load job failed");
                }
                result
            });

            info!(job_id = %job_id, "Load job dispatched in background");
            Ok(Dispatched::Spawned { job_id, handle })
        }
    }
}
