use engine_config::settings::error::SettingsError;
use engine_core::error::ProgressError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Failed to load the load settings: {0}")]
    Settings(#[from] SettingsError),

    #[error("Failed to open job store at {path}: {source}")]
    StoreOpen {
        path: String,
        #[source]
        source: sled::Error,
    },

    #[error("Failed to load progress: {0}")]
    Progress(#[from] ProgressError),

    #[error("Failed to serialize data to JSON: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}
