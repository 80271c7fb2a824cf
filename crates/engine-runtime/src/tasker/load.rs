use crate::{error::TaskerError, tasker::counter::InFlightCounter};
use engine_config::settings::LoadSettings;
use engine_core::{
    loader::RemoteLoadClient,
    metrics::LoadMetrics,
    retry::{PollError, PollStatus, Sleeper, TokioSleeper},
    state::JobProgressStore,
};
use model::{
    core::identifiers::{JobId, RemoteTaskId},
    load::{BulkLoadState, FileTask},
};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

type TaskSender = mpsc::Sender<FileTask>;
type TaskReceiver = mpsc::Receiver<FileTask>;

/// Two-stage load pipeline of one job.
///
/// File tasks committed by the dump stage wait in the submission queue until
/// the submit loop hands them to the remote load client. Accepted tasks move
/// to the check queue, where the check loop polls each remote task until it
/// completes. Both queues are bounded, so a full queue suspends its producer.
///
/// A tasker is single-use: each loop can be started once and each channel
/// closed once.
pub struct LoadTasker {
    job_id: JobId,
    settings: LoadSettings,
    loader: Arc<dyn RemoteLoadClient>,
    store: Arc<dyn JobProgressStore>,
    sleeper: Arc<dyn Sleeper>,
    metrics: LoadMetrics,
    in_flight: InFlightCounter,

    data_tx: Mutex<Option<TaskSender>>,
    data_rx: Mutex<Option<TaskReceiver>>,
    check_tx: Mutex<Option<TaskSender>>,
    check_rx: Mutex<Option<TaskReceiver>>,
}

impl LoadTasker {
    pub fn new(
        job_id: impl Into<JobId>,
        loader: Arc<dyn RemoteLoadClient>,
        store: Arc<dyn JobProgressStore>,
        settings: LoadSettings,
    ) -> Self {
        let (data_tx, data_rx) = mpsc::channel(settings.submission_capacity.max(1));
        let (check_tx, check_rx) = mpsc::channel(settings.check_capacity.max(1));

        Self {
            job_id: job_id.into(),
            settings,
            loader,
            store,
            sleeper: Arc::new(TokioSleeper),
            metrics: LoadMetrics::new(),
            in_flight: InFlightCounter::new(),
            data_tx: Mutex::new(Some(data_tx)),
            data_rx: Mutex::new(Some(data_rx)),
            check_tx: Mutex::new(Some(check_tx)),
            check_rx: Mutex::new(Some(check_rx)),
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    pub fn settings(&self) -> &LoadSettings {
        &self.settings
    }

    pub fn store(&self) -> &Arc<dyn JobProgressStore> {
        &self.store
    }

    pub fn metrics(&self) -> &LoadMetrics {
        &self.metrics
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load()
    }

    /// Queue a dumped file for submission. Waits while the submission queue is full.
    pub async fn commit_data(&self, task: FileTask) -> Result<(), TaskerError> {
        let sender = self
            .data_tx
            .lock()
            .await
            .clone()
            .ok_or_else(|| TaskerError::SubmissionChannelClosed(self.job_id.clone()))?;

        sender
            .send(task)
            .await
            .map_err(|_| TaskerError::SubmissionChannelClosed(self.job_id.clone()))
    }

    /// Signal that the dump stage will commit no more files.
    ///
    /// The job's total expected count is frozen to the number of tasks in
    /// flight at this moment.
    pub async fn close_data_channel(&self) -> Result<(), TaskerError> {
        let sender = self.data_tx.lock().await.take();
        if sender.is_none() {
            return Err(TaskerError::SubmissionChannelClosed(self.job_id.clone()));
        }
        drop(sender);

        let total = self.in_flight.load() as u64;
        self.store.set_total_expected(&self.job_id, total).await?;
        info!(job_id = %self.job_id, total, "[LoadTasker] Submission channel closed");
        Ok(())
    }

    /// Hand a remotely accepted task to the check loop. Waits while the check
    /// queue is full.
    pub async fn commit_check(
        &self,
        mut task: FileTask,
        task_id: RemoteTaskId,
    ) -> Result<(), TaskerError> {
        task.assign_remote_task(task_id);

        let sender = self
            .check_tx
            .lock()
            .await
            .clone()
            .ok_or_else(|| TaskerError::CheckChannelClosed(self.job_id.clone()))?;

        // Counted before the send so the check loop can never decrement first.
        let count = self.in_flight.increment();
        info!(
            job_id = %self.job_id,
            count,
            file = task.source_file(),
            task_id = %task_id,
            "[LoadTasker] Inc task processing"
        );

        if sender.send(task).await.is_err() {
            let _ = self.in_flight.decrement();
            return Err(TaskerError::CheckChannelClosed(self.job_id.clone()));
        }
        Ok(())
    }

    pub async fn close_check_channel(&self) -> Result<(), TaskerError> {
        let sender = self.check_tx.lock().await.take();
        if sender.is_none() {
            return Err(TaskerError::CheckChannelClosed(self.job_id.clone()));
        }
        debug!(job_id = %self.job_id, "[LoadTasker] Check channel closed");
        Ok(())
    }

    /// Submit loop: drains the submission queue until it is closed, handing
    /// every file to the remote client and forwarding it to the check queue.
    ///
    /// Returns the number of tasks submitted. Does not close the check queue.
    pub async fn submit(&self, cancel: &CancellationToken) -> Result<usize, TaskerError> {
        let mut rx = Self::take_receiver(&self.data_rx, "submit").await?;
        let mut submitted = 0;

        loop {
            let task = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(TaskerError::Cancelled),
                task = rx.recv() => match task {
                    Some(task) => task,
                    None => break,
                },
            };

            self.loop_check_backlog(cancel).await?;

            let task_id = match self.loader.submit(cancel, &task).await {
                Ok(task_id) => task_id,
                Err(source) => {
                    self.metrics.increment_failures(1);
                    error!(
                        job_id = %self.job_id,
                        file = task.source_file(),
                        collection = task.collection(),
                        error = %source,
                        "[LoadTasker] Remote rejected file task"
                    );
                    return Err(TaskerError::Submit {
                        file: task.source_file().to_string(),
                        collection: task.collection().to_string(),
                        source,
                    });
                }
            };
            self.metrics.increment_submitted(1);

            self.commit_check(task, task_id).await?;
            submitted += 1;
        }

        info!(job_id = %self.job_id, submitted, "[LoadTasker] Submission queue drained");
        Ok(submitted)
    }

    /// Backlog guard: waits until no more than `backlog_threshold` tasks are
    /// in flight. Cancellation is observed between polls.
    ///
    /// Returns the in-flight count observed when the guard let the caller through.
    pub async fn loop_check_backlog(
        &self,
        cancel: &CancellationToken,
    ) -> Result<usize, TaskerError> {
        let threshold = self.settings.backlog_threshold;
        let mut count = self.in_flight.load();

        while count > threshold {
            if cancel.is_cancelled() {
                return Err(TaskerError::Cancelled);
            }

            self.metrics.increment_backlog_waits(1);
            debug!(
                job_id = %self.job_id,
                count,
                threshold,
                "[LoadTasker] Too many tasks in flight, waiting"
            );
            self.sleeper.sleep(self.settings.backlog_interval()).await;
            count = self.in_flight.load();
        }

        Ok(count)
    }

    /// Check loop: confirms every task of the check queue in order until the
    /// queue is closed, then runs the loader's post-processing and marks the
    /// job finished.
    ///
    /// Stops at the first failed task; tasks still queued are left unchecked.
    pub async fn check(&self, cancel: &CancellationToken) -> Result<(), TaskerError> {
        let mut rx = Self::take_receiver(&self.check_rx, "check").await?;

        loop {
            let task = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(TaskerError::Cancelled),
                task = rx.recv() => match task {
                    Some(task) => task,
                    None => break,
                },
            };

            self.loop_check_state_until_success(cancel, &task).await?;
        }

        self.loader
            .post_process(cancel)
            .await
            .map_err(TaskerError::PostProcess)?;
        self.store.set_finished(&self.job_id).await?;

        info!(
            job_id = %self.job_id,
            completed = self.metrics.snapshot().tasks_completed,
            "[LoadTasker] All load tasks confirmed"
        );
        Ok(())
    }

    /// Polls one remote task until it completes, then records it as done.
    ///
    /// Counters are only touched after the remote side confirmed success.
    pub async fn loop_check_state_until_success(
        &self,
        cancel: &CancellationToken,
        task: &FileTask,
    ) -> Result<(), TaskerError> {
        let task_id = task
            .remote_task_id()
            .ok_or_else(|| TaskerError::MissingTaskId(task.to_string()))?;

        let result = self
            .settings
            .state_poll_policy()
            .run(self.sleeper.as_ref(), || self.poll_state(cancel, task, task_id))
            .await;

        let polled = match result {
            Ok(polled) => polled,
            Err(PollError::Fatal(TaskerError::Cancelled)) => {
                debug!(
                    job_id = %self.job_id,
                    file = task.source_file(),
                    task_id = %task_id,
                    "[LoadTasker] State polling cancelled"
                );
                return Err(TaskerError::Cancelled);
            }
            Err(PollError::Fatal(err)) => {
                self.metrics.increment_failures(1);
                error!(
                    job_id = %self.job_id,
                    file = task.source_file(),
                    task_id = %task_id,
                    error = %err,
                    "[LoadTasker] Load task failed"
                );
                return Err(err);
            }
            Err(PollError::AttemptsExceeded { attempts }) => {
                self.metrics.increment_failures(1);
                error!(
                    job_id = %self.job_id,
                    file = task.source_file(),
                    task_id = %task_id,
                    attempts,
                    "[LoadTasker] Gave up waiting for load task"
                );
                return Err(TaskerError::PollExhausted { task_id, attempts });
            }
        };
        self.metrics.increment_poll_retries(polled.retries as u64);

        self.store
            .mark_file_task_done(&self.job_id, task.collection(), task.source_file())
            .await?;
        let count = self
            .in_flight
            .decrement()
            .ok_or(TaskerError::InFlightUnderflow)?;
        self.store.add_finished(&self.job_id, 1).await?;
        self.metrics.increment_completed(1);

        info!(
            job_id = %self.job_id,
            count,
            file = task.source_file(),
            task_id = %task_id,
            retries = polled.retries,
            "[LoadTasker] Dec task processing"
        );
        Ok(())
    }

    async fn poll_state(
        &self,
        cancel: &CancellationToken,
        task: &FileTask,
        task_id: RemoteTaskId,
    ) -> Result<PollStatus<()>, TaskerError> {
        if cancel.is_cancelled() {
            return Err(TaskerError::Cancelled);
        }

        match self.loader.get_state(cancel, task_id).await {
            Ok(BulkLoadState::Pending) => {
                debug!(
                    task_id = %task_id,
                    file = task.source_file(),
                    "Still in bulk-load process"
                );
                Ok(PollStatus::Pending)
            }
            Ok(BulkLoadState::Completed) => Ok(PollStatus::Ready(())),
            Ok(BulkLoadState::Failed(reason)) => Err(TaskerError::RemoteFailed {
                task_id,
                file: task.source_file().to_string(),
                reason,
            }),
            Err(source) => Err(TaskerError::StateQuery { task_id, source }),
        }
    }

    async fn take_receiver(
        slot: &Mutex<Option<TaskReceiver>>,
        loop_name: &'static str,
    ) -> Result<TaskReceiver, TaskerError> {
        slot.lock()
            .await
            .take()
            .ok_or(TaskerError::LoopAlreadyStarted(loop_name))
    }
}
