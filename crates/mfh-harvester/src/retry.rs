use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;

/// Bounded retries with a fixed delay between attempts.
///
/// Failures of the retried action never escape: the caller only learns whether one of the
/// attempts succeeded and decides to skip its unit of work otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    retries: usize,
    delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(1_000))
    }
}

impl RetryPolicy {
    pub fn new(retries: usize, delay: Duration) -> Self {
        Self {
            retries: retries.max(1),
            delay,
        }
    }

    pub fn retries(&self) -> usize {
        self.retries
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Runs `f` with the 0-based attempt index until it succeeds or the budget is spent.
    pub async fn run<F, Fut, T, E>(&self, action: &str, f: F) -> bool
    where
        F: FnMut(usize) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        self.run_for_value(action, f).await.is_some()
    }

    /// Same as [`RetryPolicy::run`] but keeps the value of the successful attempt.
    pub async fn run_for_value<F, Fut, T, E>(&self, action: &str, mut f: F) -> Option<T>
    where
        F: FnMut(usize) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        for attempt in 0..self.retries {
            match f(attempt).await {
                Ok(value) => return Some(value),
                Err(e) => {
                    log::warn!(
                        "Attempt {}/{} of `{action}` failed: {e}",
                        attempt + 1,
                        self.retries
                    );
                    if attempt + 1 < self.retries {
                        sleep(self.delay).await;
                    }
                }
            }
        }
        log::warn!("Giving up on `{action}` after {} attempts", self.retries);
        None
    }
}
