use std::future::Future;
use std::num::NonZeroU32;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// How a failed attempt should be treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// Worth another attempt after backing off
    Transient,
    /// Retrying cannot help; give up immediately
    Fatal,
}

/// Backoff policy for whole synchronization runs.
///
/// The n-th retry waits `base_delay * 2^(n-1)`, capped at `max_delay`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: NonZeroU32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Policy for scheduled and one-off runs: 5s, 10s, 20s ... capped at 60s.
    ///
    /// A configured attempt count of zero still runs once.
    pub fn for_runs(max_attempts: u32) -> Self {
        Self {
            max_attempts: NonZeroU32::new(max_attempts).unwrap_or(NonZeroU32::MIN),
            base_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(60),
        }
    }

    pub fn with_delays(mut self, base_delay: Duration, max_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self.max_delay = max_delay;
        self
    }

    /// Delay to wait after the `failed_attempts`-th failure
    pub fn backoff(&self, failed_attempts: u32) -> Duration {
        let exponent = failed_attempts.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::for_runs(3)
    }
}

/// Run `operation` until it succeeds, `classify` marks an error fatal, or
/// the policy runs out of attempts. The last error is returned.
pub async fn retry_run<T, E, F, Fut, C>(
    policy: &RetryPolicy,
    label: &str,
    mut operation: F,
    classify: C,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    C: Fn(&E) -> Failure,
{
    let max_attempts = policy.max_attempts.get();
    let mut attempt = 0;

    loop {
        attempt += 1;

        let error = match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    info!("{} succeeded on attempt {}/{}", label, attempt, max_attempts);
                }
                return Ok(value);
            }
            Err(e) => e,
        };

        if classify(&error) == Failure::Fatal {
            debug!("{} failed with a fatal error, not retrying", label);
            return Err(error);
        }
        if attempt >= max_attempts {
            warn!("{} gave up after {} attempts: {}", label, max_attempts, error);
            return Err(error);
        }

        let delay = policy.backoff(attempt);
        warn!(
            "{} attempt {}/{} failed ({}), retrying in {:?}",
            label, attempt, max_attempts, error, delay
        );
        sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::for_runs(max_attempts)
            .with_delays(Duration::from_millis(1), Duration::from_millis(5))
    }

    // ==================== Policy Tests ====================

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts.get(), 3);
        assert_eq!(policy.base_delay, Duration::from_secs(5));
        assert_eq!(policy.max_delay, Duration::from_secs(60));
    }

    #[test]
    fn test_zero_attempts_runs_once() {
        assert_eq!(RetryPolicy::for_runs(0).max_attempts.get(), 1);
        assert_eq!(RetryPolicy::for_runs(4).max_attempts.get(), 4);
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy::for_runs(10);
        assert_eq!(policy.backoff(1), Duration::from_secs(5));
        assert_eq!(policy.backoff(2), Duration::from_secs(10));
        assert_eq!(policy.backoff(3), Duration::from_secs(20));
        assert_eq!(policy.backoff(4), Duration::from_secs(40));
        assert_eq!(policy.backoff(5), Duration::from_secs(60));
        assert_eq!(policy.backoff(u32::MAX), Duration::from_secs(60));
    }

    // ==================== retry_run Tests ====================

    #[tokio::test]
    async fn test_first_attempt_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result: Result<u32, &str> = retry_run(
            &fast_policy(3),
            "sync",
            || {
                let c = Arc::clone(&counter);
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Ok(7)
                }
            },
            |_| Failure::Transient,
        )
        .await;

        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result: Result<u32, &str> = retry_run(
            &fast_policy(3),
            "sync",
            || {
                let c = Arc::clone(&counter);
                async move {
                    if c.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err("database is locked")
                    } else {
                        Ok(7)
                    }
                }
            },
            |_| Failure::Transient,
        )
        .await;

        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_fatal_failure_stops_immediately() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result: Result<u32, &str> = retry_run(
            &fast_policy(5),
            "sync",
            || {
                let c = Arc::clone(&counter);
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err("malformed translation file")
                }
            },
            |e: &&str| {
                if e.contains("malformed") {
                    Failure::Fatal
                } else {
                    Failure::Transient
                }
            },
        )
        .await;

        assert_eq!(result, Err("malformed translation file"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhausted_attempts_return_last_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result: Result<u32, String> = retry_run(
            &fast_policy(3),
            "sync",
            || {
                let c = Arc::clone(&counter);
                async move {
                    let n = c.fetch_add(1, Ordering::SeqCst);
                    Err(format!("failure {}", n))
                }
            },
            |_| Failure::Transient,
        )
        .await;

        assert_eq!(result, Err("failure 2".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_transient_then_fatal() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result: Result<(), String> = retry_run(
            &fast_policy(5),
            "sync",
            || {
                let c = Arc::clone(&counter);
                async move {
                    match c.fetch_add(1, Ordering::SeqCst) {
                        0 => Err("timeout".to_string()),
                        _ => Err("fatal".to_string()),
                    }
                }
            },
            |e: &String| {
                if e == "fatal" {
                    Failure::Fatal
                } else {
                    Failure::Transient
                }
            },
        )
        .await;

        assert_eq!(result, Err("fatal".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
