//! Token bucket and leaky bucket admission control, plus a concurrent
//! simulation harness that records every forward/drop decision.
//!
//! # Quick Start
//!
//! ```rust
//! use rate_guard_sim::clock::VirtualClock;
//! use rate_guard_sim::sink::CsvSink;
//! use rate_guard_sim::{Algorithm, RateLimiterSimulation, SimulationConfig};
//! use std::sync::Arc;
//!
//! // Leaky bucket queueing up to 3 requests, forwarding 1 per tick
//! let config = SimulationConfig::new(Algorithm::LeakyBucket, 3, 1);
//! let mut simulation = RateLimiterSimulation::new(config, Arc::new(VirtualClock::new())).unwrap();
//!
//! let report = simulation.run().unwrap();
//! println!("{}", report.summary);
//!
//! let mut sink = CsvSink::new(Vec::new());
//! simulation.emit(&mut sink).unwrap();
//! ```
//!
//! # Available Algorithms
//!
//! ## [Token Bucket](cores::TokenBucketCore)
//! A pool of permits that starts full and is topped up every tick. Requests are
//! forwarded while permits last, so bursts up to capacity pass through:
//! ```rust
//! # use rate_guard_sim::cores::TokenBucketCore;
//! let bucket = TokenBucketCore::new(100, 5).unwrap(); // add 5 tokens per tick
//! ```
//!
//! ## [Leaky Bucket](cores::LeakyBucketCore)
//! A bounded FIFO queue drained at a fixed rate. Requests are forwarded when
//! drained, which smooths the output rate:
//! ```rust
//! # use rate_guard_sim::cores::LeakyBucketCore;
//! let bucket = LeakyBucketCore::new(100, 5).unwrap(); // drain 5 requests per tick
//! ```
//!
//! # Core Concepts
//!
//! ## Time Representation
//! Actors suspend through a [`Clock`](clock::Clock). [`SystemClock`](clock::SystemClock)
//! sleeps in real time; [`VirtualClock`](clock::VirtualClock) advances instantly and
//! schedules actors deterministically, so two runs with the same configuration
//! produce identical decision sequences.
//!
//! ## Error Handling
//! - **[`ConfigError`]** - invalid parameters, reported before any actor starts
//! - **[`CoreError`]** - bucket state poisoned by an earlier panic
//! - **[`SinkError`]** - the log sink could not be written; events stay in memory
//!
//! Bucket invariant violations are not errors: they panic, and the panic is
//! re-raised by [`RateLimiterSimulation::run`].
//!
//! ## Thread Safety
//! Each bucket guards its state with a mutex. A check and the update that
//! follows it always happen inside one critical section.

pub mod clock;
pub mod config;
pub mod cores;
pub mod error;
pub mod rate_limit;
pub mod recorder;
pub mod simulation;
pub mod sink;
pub mod types;

pub use config::{Algorithm, SimulationConfig};
pub use error::{ConfigError, CoreError, SimulationError, SinkError};
pub use rate_limit::RateLimitCore;
pub use recorder::{DecisionEvent, DecisionRecorder, Outcome, Summary};
pub use simulation::{CancelToken, Phase, RateLimiterSimulation, RunReport};
pub use types::{RequestId, Uint};
