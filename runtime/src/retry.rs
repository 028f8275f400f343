//! Bounded retry with exponential backoff.
//!
//! Used to re-run an optimistic read-modify-write when the aggregate store
//! reports a concurrency conflict. Only errors accepted by the caller's
//! predicate are retried; everything else fails immediately.
//!
//! # Example
//!
//! ```rust
//! use complaint_desk_runtime::retry::{RetryPolicy, retry_with_predicate};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), String> {
//! let policy = RetryPolicy::builder()
//!     .max_retries(3)
//!     .initial_delay(Duration::from_millis(20))
//!     .build();
//!
//! let value = retry_with_predicate(
//!     &policy,
//!     || async { Ok::<_, String>(42) },
//!     |err: &String| err.contains("conflict"),
//! )
//! .await?;
//! assert_eq!(value, 42);
//! # Ok(())
//! # }
//! ```

use rand::Rng;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Retry policy configuration for exponential backoff.
///
/// # Default Values
///
/// - `max_retries`: 3
/// - `initial_delay`: 20ms
/// - `max_delay`: 1 second
/// - `multiplier`: 2.0
/// - `jitter`: enabled
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Cap for the exponential delay
    pub max_delay: Duration,
    /// Growth factor between retries
    pub multiplier: f64,
    /// Scale each delay by a random factor in `[0.5, 1.0]`
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl RetryPolicy {
    /// Create a new policy builder.
    #[must_use]
    pub const fn builder() -> RetryPolicyBuilder {
        RetryPolicyBuilder {
            max_retries: 3,
            initial_delay: Duration::from_millis(20),
            max_delay: Duration::from_secs(1),
            multiplier: 2.0,
            jitter: true,
        }
    }

    /// A policy that never retries.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            multiplier: 1.0,
            jitter: false,
        }
    }

    /// Delay before retry number `attempt` (0-indexed).
    ///
    /// `min(initial_delay * multiplier^attempt, max_delay)`, then scaled by a
    /// random factor in `[0.5, 1.0]` when jitter is enabled.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        #[allow(clippy::cast_possible_wrap)]
        let base = self.initial_delay.as_secs_f64() * self.multiplier.powi(attempt as i32);
        let capped = base.min(self.max_delay.as_secs_f64());

        let factor = if self.jitter {
            rand::thread_rng().gen_range(0.5..=1.0)
        } else {
            1.0
        };

        Duration::from_secs_f64(capped * factor)
    }
}

/// Builder for [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct RetryPolicyBuilder {
    max_retries: u32,
    initial_delay: Duration,
    max_delay: Duration,
    multiplier: f64,
    jitter: bool,
}

impl RetryPolicyBuilder {
    /// Set maximum number of retries.
    #[must_use]
    pub const fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set initial delay before first retry.
    #[must_use]
    pub const fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set maximum delay.
    #[must_use]
    pub const fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set multiplier for exponential backoff.
    #[must_use]
    pub const fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Enable or disable jitter.
    #[must_use]
    pub const fn jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Build the [`RetryPolicy`].
    #[must_use]
    pub const fn build(self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            initial_delay: self.initial_delay,
            max_delay: self.max_delay,
            multiplier: self.multiplier,
            jitter: self.jitter,
        }
    }
}

/// Run `operation`, retrying errors for which `is_retryable` returns `true`.
///
/// Returns the first success, the first non-retryable error, or the last
/// retryable error once `policy.max_retries` retries have been spent.
///
/// # Errors
///
/// Whatever error `operation` produced last.
pub async fn retry_with_predicate<F, Fut, T, E, P>(
    policy: &RetryPolicy,
    mut operation: F,
    is_retryable: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
    P: Fn(&E) -> bool,
{
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    tracing::info!(attempt, "Operation succeeded after retry");
                }
                return Ok(value);
            },
            Err(err) => {
                if !is_retryable(&err) {
                    return Err(err);
                }

                if attempt >= policy.max_retries {
                    tracing::warn!(attempt, error = %err, "Giving up after max retries");
                    return Err(err);
                }

                let delay = policy.delay_for_attempt(attempt);
                tracing::debug!(
                    attempt,
                    delay_ms = delay.as_millis(),
                    error = %err,
                    "Retrying after conflict"
                );

                sleep(delay).await;
                attempt += 1;
            },
        }
    }
}
