use std::sync::{Mutex, MutexGuard};

use crate::config::Algorithm;
use crate::rate_limit::RateLimitCore;
use crate::recorder::{DecisionRecorder, Outcome};
use crate::{ConfigError, CoreError, RequestId, Uint};

/// Core implementation of the token bucket rate limiting algorithm.
///
/// The bucket holds up to `capacity` permits and starts full. Every
/// replenishment tick adds `refill_rate` permits, saturating at `capacity`.
/// Each request consumes one permit if any is left and is forwarded;
/// otherwise it is dropped. Unused permits accumulate, which lets a burst of
/// up to `capacity` requests through at once.
///
/// # Example
///
/// ```rust
/// use rate_guard_sim::cores::TokenBucketCore;
/// use rate_guard_sim::Outcome;
///
/// let bucket = TokenBucketCore::new(2, 1).unwrap();
///
/// assert_eq!(bucket.try_acquire(), Ok(Outcome::Forwarded));
/// assert_eq!(bucket.try_acquire(), Ok(Outcome::Forwarded));
/// assert_eq!(bucket.try_acquire(), Ok(Outcome::Dropped));
///
/// // One tick later a single permit is back
/// assert_eq!(bucket.refill(), Ok(1));
/// assert_eq!(bucket.try_acquire(), Ok(Outcome::Forwarded));
/// ```
#[derive(Debug)]
pub struct TokenBucketCore {
    /// Maximum number of tokens the bucket can hold
    capacity: Uint,
    /// Number of tokens added on each replenishment tick
    refill_rate: Uint,
    /// Internal state protected by mutex for thread safety
    state: Mutex<TokenBucketCoreState>,
}

/// Internal state of the token bucket
#[derive(Debug)]
struct TokenBucketCoreState {
    capacity: Uint,
    /// Current number of tokens available in the bucket
    tokens: Uint,
}

impl TokenBucketCoreState {
    fn refill(&mut self, amount: Uint) -> Uint {
        self.tokens = self.tokens.saturating_add(amount).min(self.capacity);
        self.check_invariant();
        self.tokens
    }

    fn acquire(&mut self) -> Outcome {
        let outcome = if self.tokens >= 1 {
            self.tokens -= 1;
            Outcome::Forwarded
        } else {
            Outcome::Dropped
        };
        self.check_invariant();
        outcome
    }

    /// Panics if the permit count left `[0, capacity]`.
    #[inline(always)]
    fn check_invariant(&self) {
        assert!(
            self.tokens <= self.capacity,
            "token bucket invariant violated: {} tokens held with capacity {}",
            self.tokens,
            self.capacity
        );
    }
}

impl TokenBucketCore {
    /// Creates a new, full token bucket.
    ///
    /// # Parameters
    ///
    /// * `capacity` - Maximum number of tokens the bucket can hold
    /// * `refill_rate` - Number of tokens added per replenishment tick. May exceed
    ///   `capacity`, in which case every refill simply tops the bucket up.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NonPositive`] if either parameter is zero.
    pub fn new(capacity: Uint, refill_rate: Uint) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::NonPositive("capacity"));
        }
        if refill_rate == 0 {
            return Err(ConfigError::NonPositive("refill_rate"));
        }

        Ok(TokenBucketCore {
            capacity,
            refill_rate,
            state: Mutex::new(TokenBucketCoreState {
                capacity,
                tokens: capacity, // Bucket starts full
            }),
        })
    }

    #[inline(always)]
    fn lock(&self) -> Result<MutexGuard<'_, TokenBucketCoreState>, CoreError> {
        self.state.lock().map_err(|_| CoreError::Poisoned)
    }

    /// Adds `refill_rate` tokens, clamped to `capacity`, and returns the new count.
    #[inline]
    pub fn refill(&self) -> Result<Uint, CoreError> {
        let mut state = self.lock()?;
        Ok(state.refill(self.refill_rate))
    }

    /// Takes one token if available.
    ///
    /// The check and the decrement happen in one critical section, so
    /// concurrent callers and a concurrent [`refill`](Self::refill) can never
    /// push the count out of `[0, capacity]`.
    ///
    /// # Returns
    /// * `Ok(Outcome::Forwarded)` - a token was consumed
    /// * `Ok(Outcome::Dropped)` - the bucket was empty
    /// * `Err(CoreError::Poisoned)` - the state lock is poisoned
    #[inline]
    pub fn try_acquire(&self) -> Result<Outcome, CoreError> {
        let mut state = self.lock()?;
        Ok(state.acquire())
    }

    /// Current number of tokens in the bucket.
    pub fn tokens(&self) -> Result<Uint, CoreError> {
        Ok(self.lock()?.tokens)
    }

    pub fn capacity(&self) -> Uint {
        self.capacity
    }

    pub fn refill_rate(&self) -> Uint {
        self.refill_rate
    }
}

impl RateLimitCore for TokenBucketCore {
    fn algorithm(&self) -> Algorithm {
        Algorithm::TokenBucket
    }

    fn admit(&self, request_id: RequestId, recorder: &DecisionRecorder) -> Result<(), CoreError> {
        let mut state = self.lock()?;
        let outcome = state.acquire();
        recorder.record(outcome, request_id);
        Ok(())
    }

    fn tick(&self, _recorder: &DecisionRecorder) -> Result<(), CoreError> {
        let tokens = self.refill()?;
        log::debug!("token bucket refilled to {}/{}", tokens, self.capacity);
        Ok(())
    }

    fn close(&self, _recorder: &DecisionRecorder) -> Result<(), CoreError> {
        Ok(())
    }
}

/// Configuration structure for creating a `TokenBucketCore`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenBucketCoreConfig {
    /// Maximum number of tokens the bucket can hold.
    pub capacity: Uint,
    /// Number of tokens added per replenishment tick.
    pub refill_rate: Uint,
}

impl TokenBucketCoreConfig {
    /// Creates a new configuration instance.
    pub fn new(capacity: Uint, refill_rate: Uint) -> Self {
        Self {
            capacity,
            refill_rate,
        }
    }
}

impl TryFrom<TokenBucketCoreConfig> for TokenBucketCore {
    type Error = ConfigError;

    /// Converts a `TokenBucketCoreConfig` into a `TokenBucketCore` instance.
    ///
    /// ```
    /// use rate_guard_sim::cores::{TokenBucketCore, TokenBucketCoreConfig};
    ///
    /// let limiter = TokenBucketCore::try_from(TokenBucketCoreConfig::new(100, 5)).unwrap();
    /// assert_eq!(limiter.capacity(), 100);
    ///
    /// assert!(TokenBucketCore::try_from(TokenBucketCoreConfig::new(0, 5)).is_err());
    /// ```
    #[inline(always)]
    fn try_from(config: TokenBucketCoreConfig) -> Result<Self, Self::Error> {
        TokenBucketCore::new(config.capacity, config.refill_rate)
    }
}
