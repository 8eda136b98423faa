//! Bounded retries with a fixed or linearly growing delay.

use anyhow::Result;
use std::future::Future;
use std::io;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Backoff {
    /// Same delay before every retry.
    Fixed(Duration),
    /// `attempt * step` before the next attempt, `attempt` counting from 1.
    Linear(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RetryPolicy {
    pub(crate) attempts: u32,
    pub(crate) backoff: Backoff,
}

impl RetryPolicy {
    pub(crate) const fn fixed(attempts: u32, delay: Duration) -> Self {
        Self {
            attempts,
            backoff: Backoff::Fixed(delay),
        }
    }

    pub(crate) const fn linear(attempts: u32, step: Duration) -> Self {
        Self {
            attempts,
            backoff: Backoff::Linear(step),
        }
    }

    /// Delay after failed attempt number `attempt` (1-based).
    pub(crate) fn delay_after(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed(delay) => delay,
            Backoff::Linear(step) => step * attempt,
        }
    }

    /// Run `op` until it succeeds, `retryable` rejects the error, or the
    /// attempts run out. The last error is returned as is.
    pub(crate) async fn retry<T, F, Fut>(
        &self,
        label: &str,
        retryable: impl Fn(&anyhow::Error) -> bool,
        mut op: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.attempts.max(1);
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < attempts && retryable(&e) => {
                    let delay = self.delay_after(attempt);
                    warn!(
                        "{label}: attempt {attempt}/{attempts} failed, retrying in {delay:?}: {e:#}"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Connection reset, connection aborted and timeouts anywhere in the chain.
pub(crate) fn is_transient(error: &anyhow::Error) -> bool {
    error.chain().any(|cause| {
        if let Some(e) = cause.downcast_ref::<reqwest::Error>() {
            return e.is_timeout();
        }
        if let Some(e) = cause.downcast_ref::<io::Error>() {
            return matches!(
                e.kind(),
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::TimedOut
            );
        }
        false
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Context};
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn linear_delay_grows_with_attempt() {
        let policy = RetryPolicy::linear(3, Duration::from_millis(3000));
        assert_eq!(policy.delay_after(1), Duration::from_millis(3000));
        assert_eq!(policy.delay_after(2), Duration::from_millis(6000));

        let fixed = RetryPolicy::fixed(3, Duration::from_secs(2));
        assert_eq!(fixed.delay_after(2), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_success() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let policy = RetryPolicy::fixed(3, Duration::from_secs(2));

        let value = policy
            .retry("flaky", |_| true, move || async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(anyhow!("not yet"))
                } else {
                    Ok(7)
                }
            })
            .await
            .unwrap();

        assert_eq!(value, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_last_attempt() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let policy = RetryPolicy::linear(3, Duration::from_millis(3000));

        let err = policy
            .retry("down", |_| true, move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(anyhow!("attempt failed"))
            })
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "attempt failed");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_errors_are_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let policy = RetryPolicy::linear(3, Duration::from_millis(3000));

        let result = policy
            .retry("auth", is_transient, move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(anyhow!("401 Unauthorized"))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn classifies_io_errors_in_chain() {
        let reset = Err::<(), _>(io::Error::from(io::ErrorKind::ConnectionReset))
            .context("sending completion request")
            .unwrap_err();
        assert!(is_transient(&reset));

        let timed_out = anyhow::Error::new(io::Error::from(io::ErrorKind::TimedOut));
        assert!(is_transient(&timed_out));

        let refused = anyhow::Error::new(io::Error::from(io::ErrorKind::ConnectionRefused));
        assert!(!is_transient(&refused));
        assert!(!is_transient(&anyhow!("bad json")));
    }
}
