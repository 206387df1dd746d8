//! Retry strategies, backoff computation, and the shared retry quota.

use std::time::Duration;

use parking_lot::Mutex;

use crate::ClientError;

/// Jitter mode for exponential backoff.
///
/// For use with [`ExponentialBackoff`]. See
/// [Exponential Backoff and Jitter](https://aws.amazon.com/blogs/architecture/exponential-backoff-and-jitter/).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JitterMode {
    /// Truncated binary exponential backoff delay without jitter:
    /// `min(max_backoff, scale * 2^(attempt - 1))`.
    None,
    /// Equal jitter: keeps at least half of the capped delay and jitters
    /// the rest: `(0.5 + 0.5 * rand) * min(max_backoff, scale * 2^(attempt - 1))`.
    #[default]
    Equal,
    /// Full jitter: `rand * min(max_backoff, scale * 2^(attempt - 1))`.
    Full,
    /// Decorrelated jitter, increasing the maximum jitter at each retry:
    /// `min(max_backoff, scale + rand * previous_delay * 3)`.
    Decorrelated,
}

/// Source of randomness in `[0, 1)` used for jitter. Injectable for tests.
pub type RandomSource = Box<dyn Fn() -> f64 + Send + Sync>;

/// Exponential backoff with optional jitter.
pub struct ExponentialBackoff {
    backoff_scale_value: f64,
    max_backoff: f64,
    jitter: JitterMode,
    random: RandomSource,
    previous_delay: Mutex<f64>,
}

impl ExponentialBackoff {
    pub fn new(backoff_scale_value: f64, max_backoff: f64, jitter: JitterMode) -> Self {
        Self::with_random(
            backoff_scale_value,
            max_backoff,
            jitter,
            Box::new(rand::random::<f64>),
        )
    }

    /// Create a backoff strategy with an explicit randomness source.
    pub fn with_random(
        backoff_scale_value: f64,
        max_backoff: f64,
        jitter: JitterMode,
        random: RandomSource,
    ) -> Self {
        ExponentialBackoff {
            backoff_scale_value,
            max_backoff,
            jitter,
            random,
            previous_delay: Mutex::new(backoff_scale_value),
        }
    }

    /// Calculate the delay in seconds before the given retry attempt.
    ///
    /// The initial attempt, before any retries, is attempt `0` and returns
    /// a delay of zero. The first retry after a failed initial attempt is
    /// attempt `1`, and so on.
    #[must_use]
    pub fn compute_next_backoff_delay(&self, retry_attempt: u32) -> f64 {
        if retry_attempt == 0 {
            return 0.0;
        }

        let base = self.backoff_scale_value * 2f64.powi(retry_attempt as i32 - 1);
        let capped = base.min(self.max_backoff);
        let seconds = match self.jitter {
            JitterMode::None => capped,
            JitterMode::Full => (self.random)() * capped,
            JitterMode::Equal => ((self.random)() * 0.5 + 0.5) * capped,
            JitterMode::Decorrelated => {
                let previous = *self.previous_delay.lock();
                (self.backoff_scale_value + (self.random)() * previous * 3.0)
                    .min(self.max_backoff)
            }
        };
        *self.previous_delay.lock() = seconds;
        seconds
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        ExponentialBackoff::new(0.025, 20.0, JitterMode::default())
    }
}

/// Opaque handle carrying the current attempt's delay and strategy
/// bookkeeping.
///
/// Retry tokens should always be obtained from a [`RetryStrategy`].
#[derive(Debug, Clone)]
pub struct RetryToken {
    /// The total number of attempts minus the initial attempt.
    pub retry_count: u32,
    /// Delay to wait before the attempt this token admits.
    pub retry_delay: Duration,
    quota_consumed: u32,
    last_quota_acquired: u32,
}

impl RetryToken {
    fn initial() -> Self {
        RetryToken {
            retry_count: 0,
            retry_delay: Duration::ZERO,
            quota_consumed: 0,
            last_quota_acquired: 0,
        }
    }

    /// The total number of attempts including the initial attempt.
    #[must_use]
    pub fn attempt_count(&self) -> u32 {
        self.retry_count + 1
    }
}

/// Determines whether and when failed attempts are retried.
pub trait RetryStrategy: Send + Sync {
    /// Called before any retries, for the first attempt at the operation.
    fn acquire_initial_retry_token(
        &self,
        token_scope: Option<&str>,
    ) -> Result<RetryToken, ClientError>;

    /// Replace a token from a failed attempt with a token for a retry.
    ///
    /// Fails with a retry error when no further attempts are allowed.
    fn refresh_retry_token_for_retry(
        &self,
        token_to_renew: &RetryToken,
        error: &ClientError,
    ) -> Result<RetryToken, ClientError>;

    /// Return a token after successful completion of an operation.
    fn record_success(&self, token: &RetryToken);
}

/// Basic retry strategy that simply invokes the given backoff strategy.
///
/// Any error carrying `is_retry_safe` metadata is eligible until
/// `max_attempts` is reached.
pub struct SimpleRetryStrategy {
    backoff_strategy: ExponentialBackoff,
    max_attempts: u32,
}

impl SimpleRetryStrategy {
    pub fn new(max_attempts: u32) -> Self {
        SimpleRetryStrategy {
            backoff_strategy: ExponentialBackoff::default(),
            max_attempts,
        }
    }

    #[must_use]
    pub fn with_backoff(mut self, backoff_strategy: ExponentialBackoff) -> Self {
        self.backoff_strategy = backoff_strategy;
        self
    }
}

impl Default for SimpleRetryStrategy {
    fn default() -> Self {
        SimpleRetryStrategy::new(5)
    }
}

impl RetryStrategy for SimpleRetryStrategy {
    fn acquire_initial_retry_token(
        &self,
        _token_scope: Option<&str>,
    ) -> Result<RetryToken, ClientError> {
        Ok(RetryToken::initial())
    }

    fn refresh_retry_token_for_retry(
        &self,
        token_to_renew: &RetryToken,
        error: &ClientError,
    ) -> Result<RetryToken, ClientError> {
        if !error.is_retry_safe() {
            return Err(ClientError::Retry {
                message: format!("error is not retryable: {error}"),
            });
        }
        let retry_count = token_to_renew.retry_count + 1;
        if retry_count >= self.max_attempts {
            return Err(ClientError::Retry {
                message: format!(
                    "reached maximum number of allowed attempts: {}",
                    self.max_attempts
                ),
            });
        }
        let delay = self.backoff_strategy.compute_next_backoff_delay(retry_count);
        Ok(RetryToken {
            retry_count,
            retry_delay: Duration::from_secs_f64(delay),
            quota_consumed: 0,
            last_quota_acquired: 0,
        })
    }

    fn record_success(&self, _token: &RetryToken) {
        // Not used by this retry strategy.
    }
}

const INITIAL_RETRY_TOKENS: u32 = 500;
const RETRY_COST: u32 = 5;
const NO_RETRY_INCREMENT: u32 = 1;
const TIMEOUT_RETRY_COST: u32 = 10;

/// Retry quota used by [`StandardRetryStrategy`].
///
/// The quota is shared by every call made through the owning strategy
/// instance and is protected by a mutex around acquire/release.
struct RetryQuota {
    max_capacity: u32,
    available_capacity: Mutex<u32>,
}

impl RetryQuota {
    fn new() -> Self {
        RetryQuota {
            max_capacity: INITIAL_RETRY_TOKENS,
            available_capacity: Mutex::new(INITIAL_RETRY_TOKENS),
        }
    }

    /// Attempt to acquire capacity for a retry, failing when exhausted.
    fn acquire(&self, error: &ClientError) -> Result<u32, ClientError> {
        let capacity_amount = if error.is_timeout() {
            TIMEOUT_RETRY_COST
        } else {
            RETRY_COST
        };

        let mut available = self.available_capacity.lock();
        if capacity_amount > *available {
            return Err(ClientError::Retry {
                message: "retry quota exceeded".to_string(),
            });
        }
        *available -= capacity_amount;
        Ok(capacity_amount)
    }

    /// Release capacity back to the quota, truncated to the maximum.
    fn release(&self, release_amount: u32) {
        let increment = if release_amount == 0 {
            NO_RETRY_INCREMENT
        } else {
            release_amount
        };

        let mut available = self.available_capacity.lock();
        *available = (*available + increment).min(self.max_capacity);
    }
}

/// Standard retry strategy using truncated binary exponential backoff with
/// full jitter and a bounded token quota.
pub struct StandardRetryStrategy {
    backoff_strategy: ExponentialBackoff,
    max_attempts: u32,
    retry_quota: RetryQuota,
}

impl StandardRetryStrategy {
    pub fn new(max_attempts: u32) -> Self {
        StandardRetryStrategy {
            backoff_strategy: ExponentialBackoff::new(1.0, 20.0, JitterMode::Full),
            max_attempts,
            retry_quota: RetryQuota::new(),
        }
    }
}

impl Default for StandardRetryStrategy {
    fn default() -> Self {
        StandardRetryStrategy::new(3)
    }
}

impl RetryStrategy for StandardRetryStrategy {
    fn acquire_initial_retry_token(
        &self,
        _token_scope: Option<&str>,
    ) -> Result<RetryToken, ClientError> {
        Ok(RetryToken::initial())
    }

    fn refresh_retry_token_for_retry(
        &self,
        token_to_renew: &RetryToken,
        error: &ClientError,
    ) -> Result<RetryToken, ClientError> {
        if !error.is_retry_safe() {
            return Err(ClientError::Retry {
                message: format!("error is not retryable: {error}"),
            });
        }
        let retry_count = token_to_renew.retry_count + 1;
        if retry_count >= self.max_attempts {
            return Err(ClientError::Retry {
                message: format!(
                    "reached maximum number of allowed attempts: {}",
                    self.max_attempts
                ),
            });
        }

        // Acquire additional quota for this retry attempt.
        let quota_acquired = self.retry_quota.acquire(error)?;
        let total_quota = token_to_renew.quota_consumed + quota_acquired;

        // A service-provided hint overrides the computed delay.
        let retry_delay = match error.retry_after() {
            Some(hint) => hint,
            None => Duration::from_secs_f64(
                self.backoff_strategy.compute_next_backoff_delay(retry_count),
            ),
        };

        Ok(RetryToken {
            retry_count,
            retry_delay,
            quota_consumed: total_quota,
            last_quota_acquired: quota_acquired,
        })
    }

    fn record_success(&self, token: &RetryToken) {
        self.retry_quota.release(token.last_quota_acquired);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TransportErrorKind;

    fn transient_error() -> ClientError {
        ClientError::transport(TransportErrorKind::Transient, "connection reset")
    }

    #[test]
    fn initial_attempt_has_no_delay() {
        let backoff = ExponentialBackoff::new(1.0, 20.0, JitterMode::None);
        assert_eq!(backoff.compute_next_backoff_delay(0), 0.0);
    }

    #[test]
    fn no_jitter_doubles_until_cap() {
        let backoff = ExponentialBackoff::new(1.0, 20.0, JitterMode::None);
        assert_eq!(backoff.compute_next_backoff_delay(1), 1.0);
        assert_eq!(backoff.compute_next_backoff_delay(2), 2.0);
        assert_eq!(backoff.compute_next_backoff_delay(3), 4.0);
        assert_eq!(backoff.compute_next_backoff_delay(10), 20.0);
    }

    #[test]
    fn full_jitter_scales_the_capped_delay() {
        let backoff =
            ExponentialBackoff::with_random(1.0, 20.0, JitterMode::Full, Box::new(|| 0.5));
        assert_eq!(backoff.compute_next_backoff_delay(2), 1.0);
    }

    #[test]
    fn equal_jitter_keeps_half_the_delay() {
        let backoff =
            ExponentialBackoff::with_random(1.0, 20.0, JitterMode::Equal, Box::new(|| 0.0));
        assert_eq!(backoff.compute_next_backoff_delay(2), 1.0);
    }

    #[test]
    fn decorrelated_jitter_uses_previous_delay() {
        let backoff =
            ExponentialBackoff::with_random(1.0, 20.0, JitterMode::Decorrelated, Box::new(|| 1.0));
        // previous delay starts at the scale value
        assert_eq!(backoff.compute_next_backoff_delay(1), 4.0);
        assert_eq!(backoff.compute_next_backoff_delay(2), 13.0);
    }

    #[test]
    fn simple_strategy_honors_max_attempts() {
        let strategy = SimpleRetryStrategy::new(3);
        let token = strategy.acquire_initial_retry_token(None).unwrap();
        let token = strategy
            .refresh_retry_token_for_retry(&token, &transient_error())
            .unwrap();
        let token = strategy
            .refresh_retry_token_for_retry(&token, &transient_error())
            .unwrap();
        assert_eq!(token.attempt_count(), 3);
        assert!(
            strategy
                .refresh_retry_token_for_retry(&token, &transient_error())
                .is_err()
        );
    }

    #[test]
    fn simple_strategy_rejects_unsafe_errors() {
        let strategy = SimpleRetryStrategy::new(3);
        let token = strategy.acquire_initial_retry_token(None).unwrap();
        let error = ClientError::Config("bad".to_string());
        assert!(
            strategy
                .refresh_retry_token_for_retry(&token, &error)
                .is_err()
        );
    }

    #[test]
    fn retry_after_hint_overrides_backoff() {
        let strategy = StandardRetryStrategy::new(3);
        let token = strategy.acquire_initial_retry_token(None).unwrap();
        let error = ClientError::Transport {
            kind: TransportErrorKind::Throttling,
            message: "slow down".into(),
            is_timeout: false,
            retry_after: Some(Duration::from_millis(250)),
        };
        let token = strategy
            .refresh_retry_token_for_retry(&token, &error)
            .unwrap();
        assert_eq!(token.retry_delay, Duration::from_millis(250));
    }

    #[test]
    fn quota_exhaustion_refuses_retries() {
        let quota = RetryQuota::new();
        let error = transient_error();
        for _ in 0..(INITIAL_RETRY_TOKENS / RETRY_COST) {
            quota.acquire(&error).unwrap();
        }
        assert!(quota.acquire(&error).is_err());
    }

    #[test]
    fn quota_release_replenishes_up_to_cap() {
        let quota = RetryQuota::new();
        let error = transient_error();
        let acquired = quota.acquire(&error).unwrap();
        quota.release(acquired);
        assert_eq!(*quota.available_capacity.lock(), INITIAL_RETRY_TOKENS);
        // Releasing at the cap never exceeds it.
        quota.release(100);
        assert_eq!(*quota.available_capacity.lock(), INITIAL_RETRY_TOKENS);
    }

    #[test]
    fn timeouts_cost_more_quota() {
        let quota = RetryQuota::new();
        let timeout = ClientError::Transport {
            kind: TransportErrorKind::Transient,
            message: "timed out".into(),
            is_timeout: true,
            retry_after: None,
        };
        assert_eq!(quota.acquire(&timeout).unwrap(), TIMEOUT_RETRY_COST);
    }

    #[test]
    fn standard_strategy_releases_quota_on_success() {
        let strategy = StandardRetryStrategy::new(3);
        let token = strategy.acquire_initial_retry_token(None).unwrap();
        let token = strategy
            .refresh_retry_token_for_retry(&token, &transient_error())
            .unwrap();
        strategy.record_success(&token);
        assert_eq!(
            *strategy.retry_quota.available_capacity.lock(),
            INITIAL_RETRY_TOKENS
        );
    }
}
