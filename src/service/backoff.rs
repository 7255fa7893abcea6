//! Exponential backoff for calls that can be rate limited
//!
//! Only errors that report themselves as rate limited are retried. Any other
//! failure is returned to the caller on the first occurrence.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Default number of retries after the initial attempt
pub const DEFAULT_MAX_RETRIES: u32 = 6;

/// Errors that can signal transient rate limiting
pub trait Throttled {
    fn is_rate_limited(&self) -> bool;
}

#[derive(Debug, thiserror::Error)]
pub enum BackoffError<E> {
    #[error("retries exhausted after {attempts} rate-limited attempts")]
    RetriesExhausted { attempts: u32 },

    #[error("operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Failed(E),
}

/// Retries a unit of work with `2^attempt + jitter` second waits while it
/// keeps reporting rate limiting.
#[derive(Debug, Clone)]
pub struct BackoffPoller {
    max_retries: u32,
    base_delay: Duration,
}

impl Default for BackoffPoller {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES)
    }
}

impl BackoffPoller {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::from_secs(1),
        }
    }

    /// Wait before retry number `attempt` (0-based): base * 2^attempt plus up to one base of jitter
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self.base_delay.saturating_mul(2u32.saturating_pow(attempt));
        exp + self.base_delay.mul_f64(rand::random::<f64>())
    }

    /// Run `op` until it succeeds, fails with a non rate-limit error, exhausts
    /// the retry budget, or `cancel` fires.
    pub async fn run<T, E, F, Fut>(
        &self,
        cancel: &CancellationToken,
        mut op: F,
    ) -> Result<T, BackoffError<E>>
    where
        E: Throttled + std::fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(BackoffError::Cancelled);
            }

            let outcome = tokio::select! {
                _ = cancel.cancelled() => return Err(BackoffError::Cancelled),
                outcome = op() => outcome,
            };

            match outcome {
                Ok(value) => {
                    if attempt > 0 {
                        tracing::debug!(retries = attempt, "Call succeeded after backoff");
                    }
                    return Ok(value);
                }
                Err(e) if e.is_rate_limited() => {
                    if attempt >= self.max_retries {
                        tracing::error!(
                            attempts = attempt + 1,
                            max_retries = self.max_retries,
                            "Rate limit retries exhausted"
                        );
                        return Err(BackoffError::RetriesExhausted {
                            attempts: attempt + 1,
                        });
                    }

                    let delay = self.delay_for(attempt);
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Rate limited, backing off"
                    );

                    tokio::select! {
                        _ = cancel.cancelled() => return Err(BackoffError::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                    attempt += 1;
                }
                Err(e) => return Err(BackoffError::Failed(e)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    #[derive(Debug, thiserror::Error)]
    enum FakeError {
        #[error("throttled")]
        Throttled,
        #[error("boom")]
        Boom,
    }

    impl Throttled for FakeError {
        fn is_rate_limited(&self) -> bool {
            matches!(self, FakeError::Throttled)
        }
    }

    #[test]
    fn test_delay_bounds() {
        let poller = BackoffPoller::default();
        for attempt in 0..6 {
            let delay = poller.delay_for(attempt);
            let floor = Duration::from_secs(1 << attempt);
            assert!(delay >= floor);
            assert!(delay < floor + Duration::from_secs(1));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_three_rate_limits() {
        let poller = BackoffPoller::default();
        let token = CancellationToken::new();
        let calls = AtomicU32::new(0);
        let calls_ref = &calls;

        let start = Instant::now();
        let result = poller
            .run(&token, move || async move {
                let n = calls_ref.fetch_add(1, Ordering::SeqCst);
                if n < 3 { Err(FakeError::Throttled) } else { Ok("done") }
            })
            .await;

        assert_eq!(result.unwrap(), "done");
        // initial call + 3 retries
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert!(start.elapsed() >= Duration::from_secs(1 + 2 + 4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_rate_limited_exhausts() {
        let poller = BackoffPoller::default();
        let token = CancellationToken::new();
        let calls = AtomicU32::new(0);
        let calls_ref = &calls;

        let result: Result<(), _> = poller
            .run(&token, move || async move {
                calls_ref.fetch_add(1, Ordering::SeqCst);
                Err(FakeError::Throttled)
            })
            .await;

        assert!(matches!(
            result,
            Err(BackoffError::RetriesExhausted { attempts: 7 })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_errors_propagate_immediately() {
        let poller = BackoffPoller::default();
        let token = CancellationToken::new();
        let calls = AtomicU32::new(0);
        let calls_ref = &calls;

        let start = Instant::now();
        let result: Result<(), _> = poller
            .run(&token, move || async move {
                calls_ref.fetch_add(1, Ordering::SeqCst);
                Err(FakeError::Boom)
            })
            .await;

        assert!(matches!(result, Err(BackoffError::Failed(FakeError::Boom))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_during_backoff() {
        let poller = BackoffPoller::default();
        let token = CancellationToken::new();
        let calls = AtomicU32::new(0);
        let calls_ref = &calls;

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(1500)).await;
            canceller.cancel();
        });

        let result: Result<(), _> = poller
            .run(&token, move || async move {
                calls_ref.fetch_add(1, Ordering::SeqCst);
                Err(FakeError::Throttled)
            })
            .await;

        assert!(matches!(result, Err(BackoffError::Cancelled)));
        // no further calls once the token fired
        assert!(calls.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_already_cancelled_makes_no_call() {
        let poller = BackoffPoller::default();
        let token = CancellationToken::new();
        token.cancel();
        let calls = AtomicU32::new(0);
        let calls_ref = &calls;

        let result: Result<(), BackoffError<FakeError>> = poller
            .run(&token, move || async move {
                calls_ref.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(BackoffError::Cancelled)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
