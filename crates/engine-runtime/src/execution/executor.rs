use crate::{error::MigrationError, error::TaskerError, tasker::LoadTasker};
use model::{core::identifiers::JobId, load::FileTask};
use std::sync::Arc;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Drives one load job: feeds the dumped files into the tasker, runs the
/// submit loop, and waits for the check loop to confirm every task.
pub struct LoadJob {
    tasker: Arc<LoadTasker>,
    cancel: CancellationToken,
}

impl LoadJob {
    pub fn new(tasker: LoadTasker, cancel: CancellationToken) -> Self {
        Self {
            tasker: Arc::new(tasker),
            cancel,
        }
    }

    pub fn job_id(&self) -> &JobId {
        self.tasker.job_id()
    }

    pub fn tasker(&self) -> &Arc<LoadTasker> {
        &self.tasker
    }

    /// Runs the job to completion. On failure the job is marked failed in the
    /// job store and the root-cause error is returned.
    pub async fn run(self, files: Vec<FileTask>) -> Result<(), MigrationError> {
        let start_time = std::time::Instant::now();
        let job_id = self.tasker.job_id().clone();
        let store = self.tasker.store().clone();
        // A failing loop cancels its siblings, never the caller's token.
        let cancel = self.cancel.child_token();

        store.start_job(&job_id).await?;
        info!(job_id = %job_id, files = files.len(), "Starting load job");

        let checker = {
            let tasker = self.tasker.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                // Cancels the siblings on error and on panic.
                let guard = cancel.clone().drop_guard();
                let result = tasker.check(&cancel).await;
                if result.is_ok() {
                    guard.disarm();
                }
                result
            })
        };

        let feeder = {
            let tasker = self.tasker.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                let guard = cancel.clone().drop_guard();
                let result = feed(&tasker, files, &cancel).await;
                if result.is_ok() {
                    guard.disarm();
                }
                result
            })
        };

        let submitted = match self.tasker.submit(&cancel).await {
            Ok(_) => self.tasker.close_check_channel().await,
            Err(err) => {
                cancel.cancel();
                Err(err)
            }
        };
        let checked = joined("check", checker.await);
        let fed = joined("feed", feeder.await);

        match root_cause([checked, submitted, fed]) {
            Ok(()) => {
                let snapshot = self.tasker.metrics().snapshot();
                info!(
                    job_id = %job_id,
                    completed = snapshot.tasks_completed,
                    poll_retries = snapshot.poll_retries,
                    backlog_waits = snapshot.backlog_waits,
                    "Load job completed in {:.2}s",
                    start_time.elapsed().as_secs_f64()
                );
                Ok(())
            }
            Err(err) => {
                error!(job_id = %job_id, error = %err, "Load job failed");
                store.set_failed(&job_id, &err.to_string()).await?;
                Err(err.into())
            }
        }
    }
}

/// Stands in for the dump stage: commits every file not already loaded by
/// an earlier run of the same job, then closes the submission channel.
async fn feed(
    tasker: &LoadTasker,
    files: Vec<FileTask>,
    cancel: &CancellationToken,
) -> Result<usize, TaskerError> {
    let mut committed = 0;

    for task in files {
        if cancel.is_cancelled() {
            return Err(TaskerError::Cancelled);
        }

        let done = tasker
            .store()
            .is_file_task_done(tasker.job_id(), task.collection(), task.source_file())
            .await?;
        if done {
            info!(
                job_id = %tasker.job_id(),
                file = task.source_file(),
                collection = task.collection(),
                "File task already loaded, skipping"
            );
            continue;
        }

        tasker.commit_data(task).await?;
        committed += 1;
    }

    tasker.close_data_channel().await?;
    Ok(committed)
}

fn joined<T>(
    name: &'static str,
    result: Result<Result<T, TaskerError>, JoinError>,
) -> Result<(), TaskerError> {
    match result {
        Ok(result) => result.map(|_| ()),
        Err(source) => Err(TaskerError::LoopJoin { name, source }),
    }
}

/// Errors that only follow from another loop failing first.
fn is_secondary(err: &TaskerError) -> bool {
    matches!(
        err,
        TaskerError::Cancelled
            | TaskerError::SubmissionChannelClosed(_)
            | TaskerError::CheckChannelClosed(_)
    )
}

fn root_cause<const N: usize>(results: [Result<(), TaskerError>; N]) -> Result<(), TaskerError> {
    let mut secondary = None;

    for result in results {
        match result {
            Ok(()) => {}
            Err(err) if is_secondary(&err) => {
                secondary.get_or_insert(err);
            }
            Err(err) => return Err(err),
        }
    }

    match secondary {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
