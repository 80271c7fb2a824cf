use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Suspends the caller between polls. Injected so tests never wait on a clock.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Result of a single poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStatus<T> {
    Ready(T),
    Pending,
}

/// Value produced once polling reached `Ready`, with the number of retries it took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Polled<T> {
    pub value: T,
    pub retries: usize,
}

#[derive(Debug, Error)]
pub enum PollError<E> {
    /// The operation failed; polling stops immediately.
    #[error("{0}")]
    Fatal(E),
    /// The operation was still pending when the configured attempts ran out.
    #[error("still pending after {attempts} attempts")]
    AttemptsExceeded { attempts: usize },
}

/// Fixed-interval polling with an optional cap on the number of attempts.
///
/// `max_attempts: None` polls until the operation becomes ready or fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: Option<usize>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_attempts: None,
        }
    }
}

impl PollPolicy {
    pub fn new(interval: Duration, max_attempts: Option<usize>) -> Self {
        Self {
            interval,
            max_attempts: max_attempts.map(|n| n.max(1)),
        }
    }

    /// Polls `op` until it returns `Ready` or an error, sleeping `interval`
    /// between pending results.
    pub async fn run<F, Fut, T, E>(
        &self,
        sleeper: &dyn Sleeper,
        mut op: F,
    ) -> Result<Polled<T>, PollError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<PollStatus<T>, E>>,
    {
        let mut attempts = 0;

        loop {
            attempts += 1;
            match op().await {
                Ok(PollStatus::Ready(value)) => {
                    return Ok(Polled {
                        value,
                        retries: attempts - 1,
                    });
                }
                Err(err) => return Err(PollError::Fatal(err)),
                Ok(PollStatus::Pending) => {
                    if self.max_attempts.is_some_and(|max| attempts >= max) {
                        return Err(PollError::AttemptsExceeded { attempts });
                    }

                    debug!(
                        attempt = attempts,
                        interval_ms = self.interval.as_millis() as u64,
                        "Still pending, polling again"
                    );
                    sleeper.sleep(self.interval).await;
                }
            }
        }
    }
}
