use serde::{Deserialize, Serialize};
use std::fmt;

/// State of a remote bulk-insert task as reported by the vector database.
///
/// `Pending` covers both "submitted" and "in bulk-load process"; the check
/// loop keeps polling while it sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BulkLoadState {
    Pending,
    Completed,
    Failed(String),
}

impl fmt::Display for BulkLoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BulkLoadState::Pending => f.write_str("Pending"),
            BulkLoadState::Completed => f.write_str("Completed"),
            BulkLoadState::Failed(reason) => write!(f, "Failed({reason})"),
        }
    }
}
