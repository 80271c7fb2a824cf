use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

#[derive(Debug, Default)]
struct InnerMetrics {
    tasks_submitted: AtomicU64,
    tasks_completed: AtomicU64,
    poll_retries: AtomicU64,
    backlog_waits: AtomicU64,
    failure_count: AtomicU64,
}

/// Counters shared by the submit and check loops of a load tasker.
#[derive(Debug, Clone)]
pub struct LoadMetrics {
    inner: Arc<InnerMetrics>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadMetricsSnapshot {
    pub tasks_submitted: u64,
    pub tasks_completed: u64,
    pub poll_retries: u64,
    pub backlog_waits: u64,
    pub failure_count: u64,
}

impl LoadMetrics {
    pub fn new() -> Self {
        LoadMetrics {
            inner: Arc::new(InnerMetrics::default()),
        }
    }

    pub fn increment_submitted(&self, count: u64) {
        self.inner.tasks_submitted.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_completed(&self, count: u64) {
        self.inner.tasks_completed.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_poll_retries(&self, count: u64) {
        self.inner.poll_retries.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_backlog_waits(&self, count: u64) {
        self.inner.backlog_waits.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_failures(&self, count: u64) {
        self.inner.failure_count.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> LoadMetricsSnapshot {
        LoadMetricsSnapshot {
            tasks_submitted: self.inner.tasks_submitted.load(Ordering::Relaxed),
            tasks_completed: self.inner.tasks_completed.load(Ordering::Relaxed),
            poll_retries: self.inner.poll_retries.load(Ordering::Relaxed),
            backlog_waits: self.inner.backlog_waits.load(Ordering::Relaxed),
            failure_count: self.inner.failure_count.load(Ordering::Relaxed),
        }
    }
}

impl Default for LoadMetrics {
    fn default() -> Self {
        Self::new()
    }
}
