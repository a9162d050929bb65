//! Bounded retry with exponential backoff.
//!
//! The executor blocks the calling thread between attempts. It knows
//! nothing about idempotency: operations handed to it must be safe to
//! repeat, since a retried call may duplicate a server-side effect whose
//! response was lost.

use crate::config::RetryConfig;
use crate::error::{SyncError, SyncResult};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Runs fallible operations with bounded retry.
#[derive(Debug)]
pub struct RetryExecutor {
    config: RetryConfig,
    cancelled: Arc<AtomicBool>,
    retries: AtomicU64,
}

impl RetryExecutor {
    /// Creates an executor with its own cancellation flag.
    pub fn new(config: RetryConfig) -> Self {
        Self::with_cancel_flag(config, Arc::new(AtomicBool::new(false)))
    }

    /// Creates an executor that stops retrying once `cancelled` is set.
    pub fn with_cancel_flag(config: RetryConfig, cancelled: Arc<AtomicBool>) -> Self {
        Self {
            config,
            cancelled,
            retries: AtomicU64::new(0),
        }
    }

    /// Returns the retry configuration.
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Total number of retries performed by this executor.
    pub fn retries(&self) -> u64 {
        self.retries.load(Ordering::SeqCst)
    }

    /// Runs `op` until it succeeds, fails permanently, or attempts run out.
    ///
    /// Only retryable errors trigger another attempt; anything else is
    /// returned as-is after the attempt that produced it. When all
    /// attempts fail, the last error is wrapped in
    /// [`SyncError::RetriesExhausted`].
    pub fn run<T, F>(&self, operation: &str, mut op: F) -> SyncResult<T>
    where
        F: FnMut() -> SyncResult<T>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0u32;

        loop {
            if attempt > 0 {
                if self.cancelled.load(Ordering::SeqCst) {
                    return Err(SyncError::Cancelled);
                }

                let delay = self.config.delay_for_attempt(attempt);
                debug!(
                    operation,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "retrying after transient failure"
                );
                if !delay.is_zero() {
                    std::thread::sleep(delay);
                }
                self.retries.fetch_add(1, Ordering::SeqCst);
            }

            match op() {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() => {
                    attempt += 1;
                    if attempt >= max_attempts {
                        warn!(operation, attempts = attempt, error = %err, "retries exhausted");
                        return Err(SyncError::RetriesExhausted {
                            attempts: attempt,
                            source: Box::new(err),
                        });
                    }
                    debug!(operation, attempt, error = %err, "attempt failed");
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl Default for RetryExecutor {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::time::{Duration, Instant};

    fn fast(max_attempts: u32) -> RetryExecutor {
        RetryExecutor::new(RetryConfig::new(max_attempts).with_base_delay(Duration::ZERO))
    }

    #[test]
    fn success_on_first_attempt() {
        let executor = fast(3);
        let calls = Cell::new(0);

        let result = executor.run("op", || {
            calls.set(calls.get() + 1);
            Ok::<_, SyncError>(7)
        });

        assert_eq!(result, Ok(7));
        assert_eq!(calls.get(), 1);
        assert_eq!(executor.retries(), 0);
    }

    #[test]
    fn always_failing_operation_attempted_max_times() {
        let executor = fast(3);
        let calls = Cell::new(0);

        let result: SyncResult<()> = executor.run("op", || {
            calls.set(calls.get() + 1);
            Err(SyncError::transport_retryable("connection reset"))
        });

        assert_eq!(calls.get(), 3);
        assert_eq!(
            result,
            Err(SyncError::RetriesExhausted {
                attempts: 3,
                source: Box::new(SyncError::transport_retryable("connection reset")),
            })
        );
        assert_eq!(executor.retries(), 2);
    }

    #[test]
    fn fail_once_then_succeed_stops_retrying() {
        let executor = fast(5);
        let calls = Cell::new(0);

        let result = executor.run("op", || {
            calls.set(calls.get() + 1);
            if calls.get() == 1 {
                Err(SyncError::transport_retryable("timeout"))
            } else {
                Ok("done")
            }
        });

        assert_eq!(result, Ok("done"));
        assert_eq!(calls.get(), 2);
        assert_eq!(executor.retries(), 1);
    }

    #[test]
    fn non_retryable_error_is_not_retried() {
        let executor = fast(3);
        let calls = Cell::new(0);
        let rejection = SyncError::ServerRejected {
            status: 400,
            message: "bad payload".into(),
        };

        let result: SyncResult<()> = executor.run("op", || {
            calls.set(calls.get() + 1);
            Err(rejection.clone())
        });

        assert_eq!(calls.get(), 1);
        assert_eq!(result, Err(rejection));
    }

    #[test]
    fn single_attempt_config_wraps_transport_error() {
        let executor = RetryExecutor::new(RetryConfig::no_retry());
        let result: SyncResult<()> =
            executor.run("op", || Err(SyncError::transport_retryable("down")));

        assert!(matches!(
            result,
            Err(SyncError::RetriesExhausted { attempts: 1, .. })
        ));
    }

    #[test]
    fn backoff_waits_between_attempts() {
        let executor = RetryExecutor::new(
            RetryConfig::new(3).with_base_delay(Duration::from_millis(10)),
        );
        let start = Instant::now();

        let _: SyncResult<()> = executor.run("op", || Err(SyncError::transport_retryable("x")));

        // 10ms before attempt 1, 20ms before attempt 2
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn cancellation_stops_retries() {
        let flag = Arc::new(AtomicBool::new(false));
        let executor = RetryExecutor::with_cancel_flag(
            RetryConfig::new(5).with_base_delay(Duration::ZERO),
            Arc::clone(&flag),
        );
        let calls = Cell::new(0);

        let result: SyncResult<()> = executor.run("op", || {
            calls.set(calls.get() + 1);
            flag.store(true, Ordering::SeqCst);
            Err(SyncError::transport_retryable("x"))
        });

        assert_eq!(result, Err(SyncError::Cancelled));
        assert_eq!(calls.get(), 1);
    }
}
