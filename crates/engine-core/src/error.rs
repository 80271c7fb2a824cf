use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("Failed to encode or decode job record: {0}")]
    Codec(#[from] bincode::Error),
}

/// Errors reported by a remote load client.
///
/// Every variant is fatal to the check loop; "still processing" is not an
/// error but `BulkLoadState::Pending`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoaderError {
    #[error("Remote request failed: {0}")]
    Request(String),

    #[error("Remote rejected the request: {0}")]
    Rejected(String),

    #[error("Not authorized: {0}")]
    Unauthorized(String),

    #[error("Remote call cancelled")]
    Cancelled,
}

#[derive(Error, Debug)]
pub enum ProgressError {
    #[error("Job not found: {0}")]
    UnknownJob(String),

    #[error("Failed to read job progress: {0}")]
    Store(#[from] StoreError),
}
