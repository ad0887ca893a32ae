//! Retry strategies and exponential backoff.
//!
//! The call pipeline never decides on its own whether to retry. It asks a
//! [`RetryStrategy`] for a token before the first attempt, and for a refreshed
//! token after each retry-safe failure. The strategy either hands back a token
//! with the delay to sleep, or refuses, which ends the call with the last error.
//!
//! # Overview
//!
//! - [`RetryPolicy`]: backoff settings (max retries, base delay, multiplier, jitter)
//! - [`ExponentialBackoff`]: yields sleep durations with jitter
//! - [`StandardRetryStrategy`]: the default [`RetryStrategy`], driven by a `RetryPolicy`
//!
//! # Example
//!
//! ```
//! use smithy_client::{RetryPolicy, RetryStrategy, StandardRetryStrategy};
//! use std::time::Duration;
//!
//! let strategy = StandardRetryStrategy::new(
//!     RetryPolicy::new()
//!         .max_retries(5)
//!         .base_delay(Duration::from_millis(100)),
//! );
//! assert_eq!(strategy.max_attempts(), 6);
//! ```

use std::any::Any;
use std::fmt;
use std::time::Duration;

use crate::error::ClientError;

/// Backoff defaults, following gRPC's connection backoff
/// (<https://github.com/grpc/grpc/blob/master/doc/connection-backoff.md>).
pub mod defaults {
    use std::time::Duration;

    pub const BASE_DELAY: Duration = Duration::from_secs(1);
    pub const MULTIPLIER: f64 = 1.6;
    /// +/- 20% around the computed delay.
    pub const JITTER: f64 = 0.2;
    pub const MAX_DELAY: Duration = Duration::from_secs(120);
    /// Retries after the first attempt.
    pub const MAX_RETRIES: u32 = 3;
}

/// Backoff settings consumed by [`StandardRetryStrategy`].
///
/// The n-th retry (zero based) sleeps `base_delay * multiplier^n`, capped at
/// `max_delay`, scaled by a random factor in `1 +/- jitter`.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    pub base_delay: Duration,
    /// At least 1.0.
    pub multiplier: f64,
    /// In `0.0..=1.0`.
    pub jitter: f64,
    pub max_delay: Duration,
    /// Not counting the initial attempt.
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: defaults::BASE_DELAY,
            multiplier: defaults::MULTIPLIER,
            jitter: defaults::JITTER,
            max_delay: defaults::MAX_DELAY,
            max_retries: defaults::MAX_RETRIES,
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single attempt, no retries.
    pub fn no_retry() -> Self {
        Self::default().max_retries(0)
    }

    /// 50ms base, 1s cap, 5 retries. For interactive calls.
    pub fn aggressive() -> Self {
        Self::default()
            .base_delay(Duration::from_millis(50))
            .max_delay(Duration::from_secs(1))
            .max_retries(5)
    }

    /// 2s base, 5min cap, 10 retries. For background jobs.
    pub fn patient() -> Self {
        Self::default()
            .base_delay(Duration::from_secs(2))
            .max_delay(Duration::from_secs(300))
            .max_retries(10)
    }

    pub fn max_retries(self, max_retries: u32) -> Self {
        Self {
            max_retries,
            ..self
        }
    }

    pub fn base_delay(self, base_delay: Duration) -> Self {
        Self { base_delay, ..self }
    }

    pub fn max_delay(self, max_delay: Duration) -> Self {
        Self { max_delay, ..self }
    }

    /// # Panics
    ///
    /// If `multiplier` is below 1.0.
    pub fn multiplier(self, multiplier: f64) -> Self {
        assert!(multiplier >= 1.0, "multiplier must be >= 1.0");
        Self { multiplier, ..self }
    }

    /// # Panics
    ///
    /// If `jitter` is outside `0.0..=1.0`.
    pub fn jitter(self, jitter: f64) -> Self {
        assert!(
            (0.0..=1.0).contains(&jitter),
            "jitter must be between 0.0 and 1.0"
        );
        Self { jitter, ..self }
    }

    /// Check the invariants the setters enforce, for policies built as
    /// struct literals.
    pub fn validate(&self) -> Result<(), &'static str> {
        match self {
            p if p.base_delay > p.max_delay => Err("base_delay must not exceed max_delay"),
            p if p.multiplier < 1.0 => Err("multiplier must be >= 1.0"),
            p if !(0.0..=1.0).contains(&p.jitter) => Err("jitter must be between 0.0 and 1.0"),
            _ => Ok(()),
        }
    }

    pub fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff::new(self.clone())
    }

    /// Delay for the zero-based retry `n` before jitter.
    fn unjittered_delay(&self, n: u32) -> f64 {
        let cap = self.max_delay.as_secs_f64();
        let exponent = i32::try_from(n).unwrap_or(i32::MAX);
        (self.base_delay.as_secs_f64() * self.multiplier.powi(exponent)).min(cap)
    }
}

/// Iterator-like backoff state over a [`RetryPolicy`].
///
/// ```
/// use smithy_client::RetryPolicy;
///
/// let mut backoff = RetryPolicy::new().jitter(0.0).backoff();
/// assert_eq!(backoff.next_delay().as_millis(), 1000);
/// assert_eq!(backoff.next_delay().as_millis(), 1600);
/// ```
#[derive(Clone, Debug)]
pub struct ExponentialBackoff {
    policy: RetryPolicy,
    attempts: u32,
}

impl ExponentialBackoff {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            attempts: 0,
        }
    }

    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    /// Delays handed out so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn can_retry(&self) -> bool {
        self.attempts < self.policy.max_retries
    }

    /// The next sleep, with jitter. Advances the state.
    pub fn next_delay(&mut self) -> Duration {
        let base = self.policy.unjittered_delay(self.attempts);
        self.attempts = self.attempts.saturating_add(1);

        let jitter = self.policy.jitter;
        let factor = if jitter > 0.0 {
            1.0 + rand::random_range(-jitter..=jitter)
        } else {
            1.0
        };
        let secs = (base * factor).clamp(0.0, self.policy.max_delay.as_secs_f64());
        Duration::from_secs_f64(secs)
    }
}

/// Opaque retry state handed out by a [`RetryStrategy`].
///
/// Only the strategy that issued a token can interpret it.
pub struct RetryToken(Box<dyn Any + Send + Sync>);

impl RetryToken {
    pub fn new<T: Any + Send + Sync>(state: T) -> Self {
        Self(Box::new(state))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref()
    }

    pub fn downcast<T: Any>(self) -> Result<T, RetryToken> {
        match self.0.downcast::<T>() {
            Ok(state) => Ok(*state),
            Err(other) => Err(RetryToken(other)),
        }
    }
}

impl fmt::Debug for RetryToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryToken").finish_non_exhaustive()
    }
}

#[derive(Clone, Debug, Default)]
pub struct AcquireInitialRetryTokenRequest {
    /// Partition key for strategies that share state across calls.
    pub scope: Option<String>,
}

#[derive(Debug)]
pub struct AcquireInitialRetryTokenResponse {
    pub token: RetryToken,
    /// Delay before the first attempt.
    pub delay: Duration,
}

#[derive(Debug)]
pub struct RefreshRetryTokenRequest<'a> {
    pub token: RetryToken,
    pub error: &'a ClientError,
    /// Server-suggested delay, typically from `Retry-After`.
    pub suggested_delay: Option<Duration>,
}

#[derive(Debug)]
pub struct RefreshRetryTokenResponse {
    pub token: RetryToken,
    pub delay: Duration,
}

#[derive(Debug)]
pub struct RecordSuccessRequest {
    pub token: RetryToken,
}

/// The strategy refused to issue or refresh a token.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct TokenAcquisitionFailed(pub String);

/// Decides whether and when a failed call is attempted again.
pub trait RetryStrategy: Send + Sync + fmt::Debug {
    fn acquire_initial_token(
        &self,
        request: AcquireInitialRetryTokenRequest,
    ) -> Result<AcquireInitialRetryTokenResponse, TokenAcquisitionFailed>;

    fn refresh_retry_token(
        &self,
        request: RefreshRetryTokenRequest<'_>,
    ) -> Result<RefreshRetryTokenResponse, TokenAcquisitionFailed>;

    fn record_success(&self, request: RecordSuccessRequest);

    /// Upper bound on attempts, including the first.
    fn max_attempts(&self) -> u32;
}

#[derive(Debug)]
struct StandardTokenState {
    backoff: ExponentialBackoff,
    scope: Option<String>,
}

/// Exponential backoff over a [`RetryPolicy`], honoring server-suggested delays.
#[derive(Clone, Debug, Default)]
pub struct StandardRetryStrategy {
    policy: RetryPolicy,
}

impl StandardRetryStrategy {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

impl RetryStrategy for StandardRetryStrategy {
    fn acquire_initial_token(
        &self,
        request: AcquireInitialRetryTokenRequest,
    ) -> Result<AcquireInitialRetryTokenResponse, TokenAcquisitionFailed> {
        self.policy
            .validate()
            .map_err(|e| TokenAcquisitionFailed(e.to_string()))?;
        Ok(AcquireInitialRetryTokenResponse {
            token: RetryToken::new(StandardTokenState {
                backoff: self.policy.backoff(),
                scope: request.scope,
            }),
            delay: Duration::ZERO,
        })
    }

    fn refresh_retry_token(
        &self,
        request: RefreshRetryTokenRequest<'_>,
    ) -> Result<RefreshRetryTokenResponse, TokenAcquisitionFailed> {
        let mut state = request
            .token
            .downcast::<StandardTokenState>()
            .map_err(|_| TokenAcquisitionFailed("token was not issued by this strategy".into()))?;
        if !request.error.is_retry_safe() {
            return Err(TokenAcquisitionFailed("error is not retryable".into()));
        }
        if !state.backoff.can_retry() {
            return Err(TokenAcquisitionFailed(format!(
                "retry quota of {} exhausted",
                self.policy.max_retries
            )));
        }
        let computed = state.backoff.next_delay();
        let delay = request
            .suggested_delay
            .or(request.error.retry_after())
            .map(|suggested| suggested.min(self.policy.max_delay))
            .unwrap_or(computed);
        Ok(RefreshRetryTokenResponse {
            token: RetryToken::new(state),
            delay,
        })
    }

    fn record_success(&self, request: RecordSuccessRequest) {
        #[cfg(feature = "tracing")]
        if let Ok(state) = request.token.downcast::<StandardTokenState>() {
            tracing::trace!(
                scope = ?state.scope,
                retries = state.backoff.attempts(),
                "call succeeded"
            );
        }
        #[cfg(not(feature = "tracing"))]
        let _ = request;
    }

    fn max_attempts(&self) -> u32 {
        self.policy.max_retries.saturating_add(1)
    }
}
