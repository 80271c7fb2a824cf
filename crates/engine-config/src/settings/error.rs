use thiserror::Error;

/// Errors raised when reading or validating load settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings file could not be read.
    #[error("Failed to read settings file: {0}")]
    Io(#[from] std::io::Error),

    /// The settings file is not valid JSON for `LoadSettings`.
    #[error("Failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),

    /// A value is out of range.
    #[error("Invalid setting `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}
