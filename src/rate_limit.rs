//! Capability trait shared by the bucket algorithms.
//!
//! The simulation drives every algorithm through the same two operations:
//! `admit` for each arriving request and `tick` once per replenishment period.
//! Variants are chosen from [`Algorithm`] by [`build_core`] rather than through
//! a class hierarchy.

use crate::config::{Algorithm, SimulationConfig};
use crate::cores::{LeakyBucketCore, TokenBucketCore};
use crate::recorder::DecisionRecorder;
use crate::{ConfigError, CoreError, RequestId};

/// The core trait implemented by both bucket algorithms.
///
/// Implementations record decision events while still holding their state
/// lock, so the recorder's sequence order matches the order in which outcomes
/// were actually determined.
pub trait RateLimitCore: Send + Sync {
    /// The variant this core implements.
    fn algorithm(&self) -> Algorithm;

    /// Handles a newly arrived request.
    ///
    /// Records the terminal event if the outcome is known now. A leaky bucket
    /// records nothing for a queued request; its `Forwarded` event comes from a
    /// later [`tick`](RateLimitCore::tick).
    fn admit(&self, request_id: RequestId, recorder: &DecisionRecorder) -> Result<(), CoreError>;

    /// Runs one replenishment (token bucket) or drain (leaky bucket) step.
    fn tick(&self, recorder: &DecisionRecorder) -> Result<(), CoreError>;

    /// Settles requests that are still pending after both actors stopped.
    fn close(&self, recorder: &DecisionRecorder) -> Result<(), CoreError>;
}

/// Builds the core selected by `config.algorithm`.
///
/// # Errors
///
/// Returns [`ConfigError::NonPositive`] when capacity or rate is zero.
pub fn build_core(config: &SimulationConfig) -> Result<Box<dyn RateLimitCore>, ConfigError> {
    let core: Box<dyn RateLimitCore> = match config.algorithm {
        Algorithm::TokenBucket => Box::new(TokenBucketCore::new(config.capacity, config.rate)?),
        Algorithm::LeakyBucket => Box::new(LeakyBucketCore::new(config.capacity, config.rate)?),
    };
    Ok(core)
}
