use async_trait::async_trait;
use engine_config::settings::LoadSettings;
use engine_core::{
    error::LoaderError, loader::RemoteLoadClient, retry::Sleeper, state::JobProgressStore,
};
use model::{
    core::identifiers::RemoteTaskId,
    load::{BulkLoadState, FileTask},
};
use std::{
    collections::{HashMap, VecDeque},
    sync::{
        Arc, Mutex,
        atomic::{AtomicI64, AtomicUsize, Ordering},
    },
    time::Duration,
};
use tokio_util::sync::CancellationToken;

use crate::tasker::LoadTasker;

pub const STATE_INTERVAL: Duration = Duration::from_millis(10);
pub const BACKLOG_INTERVAL: Duration = Duration::from_millis(5);

pub type StateStep = Result<BulkLoadState, LoaderError>;

/// Remote load client that replays a scripted state sequence per file.
/// Files without a script (or with an exhausted one) report `Completed`.
#[derive(Default)]
pub struct ScriptedLoader {
    next_id: AtomicI64,
    scripts: Mutex<HashMap<String, VecDeque<StateStep>>>,
    rejections: Mutex<HashMap<String, LoaderError>>,
    files_by_task: Mutex<HashMap<RemoteTaskId, String>>,
    submitted: Mutex<Vec<String>>,
    state_calls: AtomicUsize,
    post_process_calls: AtomicUsize,
}

impl ScriptedLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&self, file: &str, steps: Vec<StateStep>) {
        self.scripts
            .lock()
            .unwrap()
            .insert(file.to_string(), steps.into());
    }

    pub fn reject(&self, file: &str, err: LoaderError) {
        self.rejections
            .lock()
            .unwrap()
            .insert(file.to_string(), err);
    }

    pub fn submitted(&self) -> Vec<String> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn state_calls(&self) -> usize {
        self.state_calls.load(Ordering::SeqCst)
    }

    pub fn post_process_calls(&self) -> usize {
        self.post_process_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteLoadClient for ScriptedLoader {
    async fn submit(
        &self,
        _cancel: &CancellationToken,
        task: &FileTask,
    ) -> Result<RemoteTaskId, LoaderError> {
        if let Some(err) = self.rejections.lock().unwrap().get(task.source_file()) {
            return Err(err.clone());
        }

        let task_id = RemoteTaskId::new(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.files_by_task
            .lock()
            .unwrap()
            .insert(task_id, task.source_file().to_string());
        self.submitted
            .lock()
            .unwrap()
            .push(task.source_file().to_string());
        Ok(task_id)
    }

    async fn get_state(
        &self,
        _cancel: &CancellationToken,
        task_id: RemoteTaskId,
    ) -> Result<BulkLoadState, LoaderError> {
        self.state_calls.fetch_add(1, Ordering::SeqCst);

        let file = self
            .files_by_task
            .lock()
            .unwrap()
            .get(&task_id)
            .cloned()
            .ok_or_else(|| LoaderError::Rejected(format!("unknown task {task_id}")))?;

        let next = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&file)
            .and_then(|steps| steps.pop_front());
        next.unwrap_or(Ok(BulkLoadState::Completed))
    }

    async fn post_process(&self, _cancel: &CancellationToken) -> Result<(), LoaderError> {
        self.post_process_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Records requested sleeps and yields instead of waiting.
#[derive(Default)]
pub struct RecordingSleeper {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn count_of(&self, duration: Duration) -> usize {
        self.sleeps
            .lock()
            .unwrap()
            .iter()
            .filter(|d| **d == duration)
            .count()
    }

    pub fn total(&self) -> usize {
        self.sleeps.lock().unwrap().len()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
        tokio::task::yield_now().await;
    }
}

pub fn test_settings() -> LoadSettings {
    LoadSettings {
        state_poll_interval_ms: STATE_INTERVAL.as_millis() as u64,
        backlog_interval_ms: BACKLOG_INTERVAL.as_millis() as u64,
        ..LoadSettings::default()
    }
}

pub fn build_tasker(
    job_id: &str,
    loader: &Arc<ScriptedLoader>,
    store: &Arc<dyn JobProgressStore>,
    sleeper: &Arc<RecordingSleeper>,
    settings: LoadSettings,
) -> LoadTasker {
    LoadTasker::new(job_id, loader.clone(), store.clone(), settings).with_sleeper(sleeper.clone())
}

/// Submits a file to the loader and hands it to the check queue, the way the
/// submit loop does.
pub async fn accept(tasker: &LoadTasker, loader: &ScriptedLoader, file: &str) {
    let cancel = CancellationToken::new();
    let task = FileTask::new(file, "books");
    let task_id = loader.submit(&cancel, &task).await.unwrap();
    tasker.commit_check(task, task_id).await.unwrap();
}

pub fn files(names: &[&str]) -> Vec<FileTask> {
    names
        .iter()
        .map(|name| FileTask::new(*name, "books"))
        .collect()
}
