use engine_core::retry::PollPolicy;
use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};
use tracing::info;

pub mod error;

use error::SettingsError;

pub const DEFAULT_CHANNEL_CAPACITY: usize = 100;
pub const DEFAULT_BACKLOG_THRESHOLD: usize = 20;
pub const DEFAULT_BACKLOG_INTERVAL_MS: u64 = 10_000;
pub const DEFAULT_STATE_POLL_INTERVAL_MS: u64 = 2_000;

/// Per-job tuning of the load pipeline.
///
/// Every field is optional in the JSON form; missing fields take the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoadSettings {
    /// Capacity of the queue between the dump stage and the submit loop.
    pub submission_capacity: usize,
    /// Capacity of the queue between the submit loop and the check loop.
    pub check_capacity: usize,
    /// The submit loop waits while more tasks than this are in flight.
    pub backlog_threshold: usize,
    pub backlog_interval_ms: u64,
    pub state_poll_interval_ms: u64,
    /// `None` polls a remote task until it reaches a terminal state.
    pub max_state_polls: Option<usize>,
}

impl Default for LoadSettings {
    fn default() -> Self {
        LoadSettings {
            submission_capacity: DEFAULT_CHANNEL_CAPACITY,
            check_capacity: DEFAULT_CHANNEL_CAPACITY,
            backlog_threshold: DEFAULT_BACKLOG_THRESHOLD,
            backlog_interval_ms: DEFAULT_BACKLOG_INTERVAL_MS,
            state_poll_interval_ms: DEFAULT_STATE_POLL_INTERVAL_MS,
            max_state_polls: None,
        }
    }
}

impl LoadSettings {
    pub fn from_json(source: &str) -> Result<Self, SettingsError> {
        let settings: LoadSettings = serde_json::from_str(source)?;
        settings.validate()?;
        Ok(settings)
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let source = tokio::fs::read_to_string(path).await?;
        let settings = Self::from_json(&source)?;
        info!(path = %path.display(), ?settings, "Loaded load settings");
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        let positive = [
            ("submission_capacity", self.submission_capacity as u64),
            ("check_capacity", self.check_capacity as u64),
            ("backlog_interval_ms", self.backlog_interval_ms),
            ("state_poll_interval_ms", self.state_poll_interval_ms),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(SettingsError::Invalid {
                    field,
                    reason: "must be greater than zero".to_string(),
                });
            }
        }

        if self.max_state_polls == Some(0) {
            return Err(SettingsError::Invalid {
                field: "max_state_polls",
                reason: "must be greater than zero or omitted".to_string(),
            });
        }

        Ok(())
    }

    pub fn backlog_interval(&self) -> Duration {
        Duration::from_millis(self.backlog_interval_ms)
    }

    pub fn state_poll_interval(&self) -> Duration {
        Duration::from_millis(self.state_poll_interval_ms)
    }

    pub fn state_poll_policy(&self) -> PollPolicy {
        PollPolicy::new(self.state_poll_interval(), self.max_state_polls)
    }
}
