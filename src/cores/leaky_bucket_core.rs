use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use crate::config::Algorithm;
use crate::rate_limit::RateLimitCore;
use crate::recorder::{DecisionRecorder, Outcome};
use crate::{ConfigError, CoreError, RequestId, Uint};

/// Result of offering a request to a [`LeakyBucketCore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The request is waiting in the queue. It is forwarded when a later
    /// drain tick reaches it.
    Queued,
    /// The queue was full; the request is rejected immediately.
    Dropped,
}

/// Core implementation of the leaky bucket rate limiting algorithm.
///
/// Requests are held in a bounded FIFO queue. Each drain tick forwards up to
/// `outflow_rate` requests from the head of the queue, oldest first. A request
/// that arrives while the queue holds `capacity` entries is dropped at once.
/// The admit/drop decision happens at arrival, but the forward decision is
/// made at drain time.
///
/// # Example
///
/// ```rust
/// use rate_guard_sim::cores::{Admission, LeakyBucketCore};
///
/// let bucket = LeakyBucketCore::new(2, 1).unwrap();
///
/// assert_eq!(bucket.enqueue(0), Ok(Admission::Queued));
/// assert_eq!(bucket.enqueue(1), Ok(Admission::Queued));
/// assert_eq!(bucket.enqueue(2), Ok(Admission::Dropped));
///
/// assert_eq!(bucket.drain_tick(), Ok(vec![0]));
/// assert_eq!(bucket.drain_tick(), Ok(vec![1]));
/// assert_eq!(bucket.drain_tick(), Ok(vec![]));
/// ```
#[derive(Debug)]
pub struct LeakyBucketCore {
    /// Maximum number of queued requests.
    capacity: Uint,
    /// Maximum number of requests forwarded per drain tick.
    outflow_rate: Uint,
    /// Internal state protected by mutex for thread safety.
    state: Mutex<LeakyBucketCoreState>,
}

/// Internal state of the leaky bucket.
#[derive(Debug)]
struct LeakyBucketCoreState {
    capacity: Uint,
    /// Waiting requests, oldest at the front.
    queue: VecDeque<RequestId>,
}

impl LeakyBucketCoreState {
    fn len(&self) -> Uint {
        self.queue.len() as Uint
    }

    fn enqueue(&mut self, request_id: RequestId) -> Admission {
        let admission = if self.len() < self.capacity {
            self.queue.push_back(request_id);
            Admission::Queued
        } else {
            Admission::Dropped
        };
        self.check_invariant();
        admission
    }

    /// Pops up to `outflow_rate` requests. Stops early once the queue is empty.
    fn drain(&mut self, outflow_rate: Uint) -> Vec<RequestId> {
        let count = outflow_rate.min(self.len()) as usize;
        let drained = self.queue.drain(..count).collect();
        self.check_invariant();
        drained
    }

    /// Panics if the queue grew beyond its capacity.
    #[inline(always)]
    fn check_invariant(&self) {
        assert!(
            self.len() <= self.capacity,
            "leaky bucket invariant violated: {} requests queued with capacity {}",
            self.len(),
            self.capacity
        );
    }
}

impl LeakyBucketCore {
    /// Creates a new, empty leaky bucket.
    ///
    /// # Parameters
    ///
    /// * `capacity` - Maximum number of requests the queue can hold.
    /// * `outflow_rate` - Maximum number of requests forwarded per drain tick.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NonPositive`] if either parameter is zero.
    pub fn new(capacity: Uint, outflow_rate: Uint) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::NonPositive("capacity"));
        }
        if outflow_rate == 0 {
            return Err(ConfigError::NonPositive("outflow_rate"));
        }

        Ok(LeakyBucketCore {
            capacity,
            outflow_rate,
            state: Mutex::new(LeakyBucketCoreState {
                capacity,
                queue: VecDeque::new(),
            }),
        })
    }

    #[inline(always)]
    fn lock(&self) -> Result<MutexGuard<'_, LeakyBucketCoreState>, CoreError> {
        self.state.lock().map_err(|_| CoreError::Poisoned)
    }

    /// Offers a request to the queue.
    ///
    /// # Returns
    /// * `Ok(Admission::Queued)` - there was room; the request waits for a drain tick
    /// * `Ok(Admission::Dropped)` - the queue was full
    /// * `Err(CoreError::Poisoned)` - the state lock is poisoned
    #[inline]
    pub fn enqueue(&self, request_id: RequestId) -> Result<Admission, CoreError> {
        let mut state = self.lock()?;
        Ok(state.enqueue(request_id))
    }

    /// Removes up to `outflow_rate` requests from the head of the queue, in FIFO order.
    #[inline]
    pub fn drain_tick(&self) -> Result<Vec<RequestId>, CoreError> {
        let mut state = self.lock()?;
        Ok(state.drain(self.outflow_rate))
    }

    /// Snapshot of the queued request ids, oldest first.
    pub fn queued(&self) -> Result<Vec<RequestId>, CoreError> {
        Ok(self.lock()?.queue.iter().copied().collect())
    }

    /// Number of queued requests.
    pub fn len(&self) -> Result<Uint, CoreError> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, CoreError> {
        Ok(self.lock()?.queue.is_empty())
    }

    pub fn capacity(&self) -> Uint {
        self.capacity
    }

    pub fn outflow_rate(&self) -> Uint {
        self.outflow_rate
    }
}

impl RateLimitCore for LeakyBucketCore {
    fn algorithm(&self) -> Algorithm {
        Algorithm::LeakyBucket
    }

    fn admit(&self, request_id: RequestId, recorder: &DecisionRecorder) -> Result<(), CoreError> {
        let mut state = self.lock()?;
        if state.enqueue(request_id) == Admission::Dropped {
            recorder.record(Outcome::Dropped, request_id);
        }
        Ok(())
    }

    fn tick(&self, recorder: &DecisionRecorder) -> Result<(), CoreError> {
        let mut state = self.lock()?;
        let drained = state.drain(self.outflow_rate);
        for request_id in &drained {
            recorder.record(Outcome::Forwarded, *request_id);
        }
        log::debug!(
            "leaky bucket drained {} request(s), {}/{} queued",
            drained.len(),
            state.len(),
            self.capacity
        );
        Ok(())
    }

    /// Drops whatever is still queued once the drain actor has stopped.
    fn close(&self, recorder: &DecisionRecorder) -> Result<(), CoreError> {
        let mut state = self.lock()?;
        let queued = state.len();
        let residual = state.drain(queued);
        if !residual.is_empty() {
            log::warn!(
                "{} request(s) still queued at shutdown, recording them as dropped",
                residual.len()
            );
        }
        for request_id in residual {
            recorder.record(Outcome::Dropped, request_id);
        }
        Ok(())
    }
}

/// Configuration structure for creating a `LeakyBucketCore`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeakyBucketCoreConfig {
    /// Maximum number of queued requests.
    pub capacity: Uint,
    /// Maximum number of requests forwarded per drain tick.
    pub outflow_rate: Uint,
}

impl LeakyBucketCoreConfig {
    /// Creates a new configuration instance.
    pub fn new(capacity: Uint, outflow_rate: Uint) -> Self {
        Self {
            capacity,
            outflow_rate,
        }
    }
}

impl TryFrom<LeakyBucketCoreConfig> for LeakyBucketCore {
    type Error = ConfigError;

    #[inline(always)]
    fn try_from(config: LeakyBucketCoreConfig) -> Result<Self, Self::Error> {
        LeakyBucketCore::new(config.capacity, config.outflow_rate)
    }
}
