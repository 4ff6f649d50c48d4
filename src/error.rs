//! error.rs
//! Error types for configuration, bucket state access, sinks and simulation runs.
//!
//! Dropped requests are never errors: they are the expected output of a rate
//! limiter under load and show up as [`Outcome::Dropped`](crate::Outcome::Dropped)
//! events instead.

use crate::types::Uint;
use thiserror::Error;

/// Invalid or missing configuration. Detected before any actor starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The algorithm selector is not one of the known variants.
    #[error("Unknown algorithm selector `{0}`, expected `token_bucket` or `leaky_bucket`")]
    UnknownAlgorithm(String),
    /// A required parameter was not provided.
    #[error("Missing parameter `{0}`")]
    MissingParameter(String),
    /// A parameter was provided but is not an unsigned integer.
    #[error("Parameter `{name}` is not a valid number: `{value}`")]
    NotNumeric { name: String, value: String },
    /// A parameter that must be positive was zero.
    #[error("Parameter `{0}` must be greater than 0")]
    NonPositive(&'static str),
}

/// Failure to access bucket state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// The state lock was poisoned by a panic in another actor.
    #[error("Bucket state is poisoned: a previous operation panicked while holding the lock")]
    Poisoned,
}

/// Failure of the external log sink.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Could not write decision records, reason: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors surfaced by [`RateLimiterSimulation`](crate::RateLimiterSimulation).
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("Invalid configuration, reason: {0}")]
    Config(#[from] ConfigError),
    #[error("Bucket state failure, reason: {0}")]
    Core(#[from] CoreError),
    #[error("Log sink failure, reason: {0}")]
    Sink(#[from] SinkError),
    /// `run` was called on a simulation that is not in the `Constructed` phase.
    #[error("Simulation has already run; construct a fresh instance to run again")]
    AlreadyRun,
    /// `emit` was called before the simulation completed.
    #[error("Simulation has not completed yet")]
    NotCompleted,
    /// Fewer events than requests were recorded. Indicates a bookkeeping bug.
    #[error("Recorded {recorded} decision(s) for {generated} generated request(s)")]
    LostDecisions { generated: Uint, recorded: Uint },
}
