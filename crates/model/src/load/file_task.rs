use crate::core::identifiers::RemoteTaskId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One unit of load work: a dumped source file destined for one collection.
///
/// The remote task id is attached once the file has been accepted by the
/// remote bulk-insert API; until then it is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileTask {
    source_file: String,
    collection: String,
    remote_task_id: Option<RemoteTaskId>,
}

impl FileTask {
    pub fn new(source_file: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            source_file: source_file.into(),
            collection: collection.into(),
            remote_task_id: None,
        }
    }

    pub fn source_file(&self) -> &str {
        &self.source_file
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn remote_task_id(&self) -> Option<RemoteTaskId> {
        self.remote_task_id
    }

    pub fn assign_remote_task(&mut self, task_id: RemoteTaskId) {
        self.remote_task_id = Some(task_id);
    }
}

impl fmt::Display for FileTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.source_file)
    }
}
