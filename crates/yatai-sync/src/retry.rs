//! # Retry Executor
//!
//! Bounded retry with linear backoff for remote operations.
//!
//! ## Retry Decision Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      RetryExecutor Flow                                 │
//! │                                                                         │
//! │  execute(operation)                                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  invoke operation ──── Ok ───────────────────────► return result       │
//! │       │                                                                 │
//! │       Err(e)                                                            │
//! │       │                                                                 │
//! │       ├── e not retryable (AUTH/PERMISSION/NOT_FOUND/VALIDATION)        │
//! │       │        └──────────────────────────────────► raise immediately  │
//! │       │                                                                 │
//! │       ├── attempts exhausted ─────────────────────► raise last error   │
//! │       │                                                                 │
//! │       └── retryable, attempts left                                      │
//! │                sleep(base_delay × attempt)   ← linear, not exponential  │
//! │                then invoke again                                        │
//! │                                                                         │
//! │  Defaults: max_retries = 3, base_delay = 1s → waits of 1s, 2s, 3s       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The executor is a pure decorator: no persistent state, no I/O of its
//! own. The sleep goes through the [`Sleeper`] trait so tests observe the
//! chosen delays without waiting them out.

use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use yatai_core::PosResult;

// =============================================================================
// Sleeper
// =============================================================================

/// The clock dependency of the executor, injectable for tests.
pub trait Sleeper: Send + Sync {
    /// Suspends for the given duration.
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;
}

/// Production sleeper backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

// =============================================================================
// Retry Policy
// =============================================================================

/// Attempt limit and backoff shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt (so `max_retries = 3` means up to
    /// four invocations).
    pub max_retries: u32,

    /// Base delay; attempt `n` waits `base_delay × n`.
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Creates a policy.
    pub const fn new(max_retries: u32, base_delay: Duration) -> Self {
        RetryPolicy {
            max_retries,
            base_delay,
        }
    }

    /// Delay before retry number `attempt` (1-based). Linear backoff.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::new(3, Duration::from_secs(1))
    }
}

// =============================================================================
// Retry Executor
// =============================================================================

/// Wraps fallible async operations with classified, bounded retry.
#[derive(Debug, Clone)]
pub struct RetryExecutor<S: Sleeper = TokioSleeper> {
    policy: RetryPolicy,
    sleeper: S,
}

impl RetryExecutor<TokioSleeper> {
    /// Creates an executor with the tokio sleeper.
    pub fn new(policy: RetryPolicy) -> Self {
        RetryExecutor {
            policy,
            sleeper: TokioSleeper,
        }
    }
}

impl<S: Sleeper> RetryExecutor<S> {
    /// Creates an executor with a custom sleeper (tests).
    pub fn with_sleeper(policy: RetryPolicy, sleeper: S) -> Self {
        RetryExecutor { policy, sleeper }
    }

    /// Returns the configured policy.
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Invokes `operation`, retrying transient failures with linear
    /// backoff.
    ///
    /// Failures whose [`yatai_core::ErrorCode`] is not retryable
    /// propagate immediately after a single invocation: retrying a
    /// malformed request or a rejected credential is never productive.
    pub async fn execute<T, F, Fut>(&self, mut operation: F) -> PosResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = PosResult<T>>,
    {
        let mut attempt: u32 = 0;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(error) => {
                    if !error.is_retryable() {
                        debug!(code = %error.code, "Failure is not retryable; raising");
                        return Err(error);
                    }

                    if attempt >= self.policy.max_retries {
                        warn!(
                            code = %error.code,
                            attempts = attempt + 1,
                            "Retries exhausted; raising last error"
                        );
                        return Err(error);
                    }

                    attempt += 1;
                    let delay = self.policy.delay_for(attempt);
                    debug!(
                        code = %error.code,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Transient failure; backing off before retry"
                    );
                    self.sleeper.sleep(delay).await;
                }
            }
        }
    }

    /// Convenience wrapper returning how many invocations were made along
    /// with the result (diagnostics).
    pub async fn execute_counted<T, F, Fut>(&self, mut operation: F) -> (u32, PosResult<T>)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = PosResult<T>>,
    {
        let mut calls = 0u32;
        let result = self
            .execute(|| {
                calls += 1;
                operation()
            })
            .await;
        (calls, result)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use yatai_core::{ErrorCode, PosError};

    /// Records requested delays instead of waiting them out.
    #[derive(Default)]
    struct FakeSleeper {
        delays: Mutex<Vec<Duration>>,
    }

    impl Sleeper for FakeSleeper {
        async fn sleep(&self, duration: Duration) {
            self.delays.lock().unwrap().push(duration);
        }
    }

    fn executor(max_retries: u32) -> RetryExecutor<FakeSleeper> {
        RetryExecutor::with_sleeper(
            RetryPolicy::new(max_retries, Duration::from_millis(1000)),
            FakeSleeper::default(),
        )
    }

    #[tokio::test]
    async fn test_success_passes_through() {
        let exec = executor(3);
        let result = exec.execute(|| async { Ok::<_, PosError>(42) }).await;
        assert_eq!(result.unwrap(), 42);
        assert!(exec.sleeper.delays.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transient_failure_retries_with_linear_backoff() {
        let exec = executor(3);
        let calls = AtomicU32::new(0);

        let result: PosResult<u32> = exec
            .execute(|| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(PosError::offline("no route to host"))
                    } else {
                        Ok(7)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        // Linear: 1000ms then 2000ms.
        let delays = exec.sleeper.delays.lock().unwrap().clone();
        assert_eq!(
            delays,
            vec![Duration::from_millis(1000), Duration::from_millis(2000)]
        );
    }

    #[tokio::test]
    async fn test_exhaustion_raises_last_error() {
        let exec = executor(2);
        let calls = AtomicU32::new(0);

        let result: PosResult<()> = exec
            .execute(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(PosError::api("HTTP 503")) }
            })
            .await;

        let err = result.unwrap_err();
        assert_eq!(err.code, ErrorCode::ApiError);
        // 1 initial + 2 retries.
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_validation_error_is_never_retried() {
        let exec = executor(3);
        let calls = AtomicU32::new(0);

        let result: PosResult<()> = exec
            .execute(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(PosError::validation("negative quantity")) }
            })
            .await;

        assert_eq!(result.unwrap_err().code, ErrorCode::ValidationError);
        // Exactly one invocation, no sleeps.
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(exec.sleeper.delays.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_terminal_classifications_are_not_retried() {
        for code in [
            ErrorCode::AuthError,
            ErrorCode::PermissionError,
            ErrorCode::NotFound,
        ] {
            let exec = executor(3);
            let calls = AtomicU32::new(0);

            let result: PosResult<()> = exec
                .execute(|| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async move { Err(PosError::new(code, "rejected")) }
                })
                .await;

            assert_eq!(result.unwrap_err().code, code);
            assert_eq!(calls.load(Ordering::SeqCst), 1, "code {code} was retried");
        }
    }

    #[tokio::test]
    async fn test_execute_counted_reports_invocations() {
        let exec = executor(1);
        let (calls, result) = exec
            .execute_counted(|| async { Err::<(), _>(PosError::api("HTTP 500")) })
            .await;

        assert!(result.is_err());
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_policy_defaults_and_delays() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.delay_for(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for(3), Duration::from_secs(3));
    }
}
