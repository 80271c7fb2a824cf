use engine_core::error::{LoaderError, StoreError};
use model::core::identifiers::{JobId, RemoteTaskId};
use thiserror::Error;

/// Errors raised by a load tasker's submit and check loops.
#[derive(Debug, Error)]
pub enum TaskerError {
    #[error("Submission channel of job {0} is closed")]
    SubmissionChannelClosed(JobId),

    #[error("Check channel of job {0} is closed")]
    CheckChannelClosed(JobId),

    #[error("The {0} loop of this tasker was already started")]
    LoopAlreadyStarted(&'static str),

    #[error("File task {0} reached the check queue without a remote task id")]
    MissingTaskId(String),

    #[error("Failed to submit {file} into collection {collection}: {source}")]
    Submit {
        file: String,
        collection: String,
        source: LoaderError,
    },

    #[error("Remote task {task_id} for {file} failed: {reason}")]
    RemoteFailed {
        task_id: RemoteTaskId,
        file: String,
        reason: String,
    },

    #[error("Failed to query state of remote task {task_id}: {source}")]
    StateQuery {
        task_id: RemoteTaskId,
        source: LoaderError,
    },

    #[error("Remote task {task_id} still in progress after {attempts} polls")]
    PollExhausted {
        task_id: RemoteTaskId,
        attempts: usize,
    },

    #[error("Loader post-processing failed: {0}")]
    PostProcess(#[source] LoaderError),

    #[error("In-flight task count would drop below zero")]
    InFlightUnderflow,

    /// The spawned loop panicked or was aborted before returning.
    #[error("The {name} loop stopped abnormally: {source}")]
    LoopJoin {
        name: &'static str,
        source: tokio::task::JoinError,
    },

    #[error("Load cancelled")]
    Cancelled,

    #[error("Job store error: {0}")]
    Store(#[from] StoreError),
}

/// Top-level errors of a load job run.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Load tasker error: {0}")]
    Tasker(#[from] TaskerError),

    #[error("Job store error: {0}")]
    Store(#[from] StoreError),
}
