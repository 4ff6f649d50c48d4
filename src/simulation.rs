//! Two-actor simulation harness around a [`RateLimitCore`].
//!
//! A run starts a replenishment actor and a request arrival actor on scoped
//! threads, both sharing one bucket. The caller blocks until both have
//! finished, then the finalized decision sequence can be handed to a
//! [`DecisionSink`].

use crate::clock::{Clock, Enrollment};
use crate::config::{Algorithm, SimulationConfig};
use crate::rate_limit::{build_core, RateLimitCore};
use crate::recorder::{DecisionEvent, DecisionRecorder, Summary};
use crate::sink::DecisionSink;
use crate::{CoreError, RequestId, SimulationError, Uint};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, ScopedJoinHandle};

/// Lifecycle of a [`RateLimiterSimulation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Parameters validated, nothing has run yet.
    Constructed,
    /// Actors are running, or a run failed part way. Either way the instance cannot run again.
    Running,
    /// Both actors joined and the decision sequence is final.
    Completed,
}

/// Cooperative stop signal, checked by both actors at every tick boundary.
///
/// A cancelled actor never stops inside a bucket critical section, so the
/// bucket invariants hold on early exit as well.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// What a completed run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    pub summary: Summary,
    /// Replenishment ticks executed.
    pub ticks: Uint,
    /// Requests generated by the arrival actor.
    pub requests: Uint,
    /// Whether the run stopped early because of its [`CancelToken`].
    pub cancelled: bool,
}

/// Builds a bucket from a [`SimulationConfig`] and drives it with the two actors.
///
/// Single use: once [`run`](Self::run) has been called, further runs fail with
/// [`SimulationError::AlreadyRun`].
///
/// # Example
///
/// ```rust
/// use rate_guard_sim::clock::VirtualClock;
/// use rate_guard_sim::{Algorithm, RateLimiterSimulation, SimulationConfig};
/// use std::sync::Arc;
///
/// let config = SimulationConfig::new(Algorithm::TokenBucket, 5, 1);
/// let mut simulation = RateLimiterSimulation::new(config, Arc::new(VirtualClock::new())).unwrap();
///
/// let report = simulation.run().unwrap();
/// assert_eq!(report.summary.total(), 50);
/// assert_eq!(simulation.events().len(), 50);
/// ```
pub struct RateLimiterSimulation {
    config: SimulationConfig,
    core: Box<dyn RateLimitCore>,
    clock: Arc<dyn Clock>,
    cancel: CancelToken,
    phase: Phase,
    events: Vec<DecisionEvent>,
    report: Option<RunReport>,
}

impl RateLimiterSimulation {
    /// Validates `config` and builds the selected bucket.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::Config`] if any count in `config` is zero.
    pub fn new(config: SimulationConfig, clock: Arc<dyn Clock>) -> Result<Self, SimulationError> {
        config.validate()?;
        let core = build_core(&config)?;

        Ok(RateLimiterSimulation {
            config,
            core,
            clock,
            cancel: CancelToken::new(),
            phase: Phase::Constructed,
            events: Vec::new(),
            report: None,
        })
    }

    pub fn algorithm(&self) -> Algorithm {
        self.core.algorithm()
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Token that stops both actors at their next tick boundary.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Runs both actors to completion and finalizes the decision sequence.
    ///
    /// Blocks until both actors have stopped. Nothing is observable through
    /// [`events`](Self::events) until this returns successfully.
    ///
    /// # Panics
    ///
    /// Re-raises the panic of an actor that hit a bucket invariant violation.
    pub fn run(&mut self) -> Result<RunReport, SimulationError> {
        if self.phase != Phase::Constructed {
            return Err(SimulationError::AlreadyRun);
        }
        self.phase = Phase::Running;
        log::info!(
            "starting {} simulation: capacity {}, rate {}, {} tick(s), {} request(s)",
            self.core.algorithm(),
            self.config.capacity,
            self.config.rate,
            self.config.ticks,
            self.config.requests
        );

        let recorder = DecisionRecorder::new(self.clock.clone());
        // Enrollment order fixes tie-breaking on a virtual clock: refills win.
        let replenisher = Enrollment::new(self.clock.clone());
        let arrivals = Enrollment::new(self.clock.clone());

        let core = self.core.as_ref();
        let config = &self.config;
        let cancel = &self.cancel;
        let recorder_ref = &recorder;

        let (ticks, requests) = thread::scope(|s| {
            let replenish_handle =
                s.spawn(move || replenish(core, recorder_ref, replenisher, config, cancel));
            let arrival_handle =
                s.spawn(move || generate_requests(core, recorder_ref, arrivals, config, cancel));

            let ticks = join_actor(replenish_handle);
            let requests = join_actor(arrival_handle);
            (ticks, requests)
        });
        let (ticks, requests) = (ticks?, requests?);

        self.core.close(&recorder)?;
        let events = recorder.finish();

        let recorded = events.len() as Uint;
        if recorded != requests {
            return Err(SimulationError::LostDecisions {
                generated: requests,
                recorded,
            });
        }

        let report = RunReport {
            summary: Summary::of(&events),
            ticks,
            requests,
            cancelled: self.cancel.is_cancelled(),
        };
        log::info!(
            "{} simulation completed after {} tick(s): {}",
            self.core.algorithm(),
            ticks,
            report.summary
        );

        self.events = events;
        self.report = Some(report);
        self.phase = Phase::Completed;
        Ok(report)
    }

    /// Decision events in the order they were determined. Empty until the run completes.
    pub fn events(&self) -> &[DecisionEvent] {
        &self.events
    }

    pub fn report(&self) -> Option<RunReport> {
        self.report
    }

    /// Forwarded/dropped counts of the completed run.
    pub fn summary(&self) -> Option<Summary> {
        self.report.map(|report| report.summary)
    }

    /// Hands the finalized events to `sink`.
    ///
    /// The events stay in memory, so a failed emit can be retried, possibly
    /// against a different sink.
    pub fn emit(&self, sink: &mut dyn DecisionSink) -> Result<(), SimulationError> {
        if self.phase != Phase::Completed {
            return Err(SimulationError::NotCompleted);
        }
        sink.accept(&self.events)?;
        log::debug!("emitted {} decision record(s)", self.events.len());
        Ok(())
    }
}

/// Joins an actor, re-raising its panic instead of turning it into an error.
fn join_actor<T>(handle: ScopedJoinHandle<'_, T>) -> T {
    match handle.join() {
        Ok(value) => value,
        Err(payload) => std::panic::resume_unwind(payload),
    }
}

/// Replenishment/drain actor: exactly one `tick` per period, `config.ticks` times.
///
/// The tick counter advances once per period regardless of how many requests
/// a drain step forwards.
fn replenish(
    core: &dyn RateLimitCore,
    recorder: &DecisionRecorder,
    enrollment: Enrollment,
    config: &SimulationConfig,
    cancel: &CancelToken,
) -> Result<Uint, CoreError> {
    let mut completed: Uint = 0;
    while completed < config.ticks {
        enrollment.sleep(config.tick_period);
        if cancel.is_cancelled() {
            log::warn!("replenishment cancelled after {} tick(s)", completed);
            break;
        }
        core.tick(recorder)?;
        completed += 1;
    }
    Ok(completed)
}

/// Request arrival actor: one request per period, ids `0..config.requests`.
///
/// Returns the number of requests generated.
fn generate_requests(
    core: &dyn RateLimitCore,
    recorder: &DecisionRecorder,
    enrollment: Enrollment,
    config: &SimulationConfig,
    cancel: &CancelToken,
) -> Result<Uint, CoreError> {
    let mut next_id: RequestId = 0;
    while next_id < config.requests {
        enrollment.sleep(config.arrival_period);
        if cancel.is_cancelled() {
            log::warn!("request arrivals cancelled after {} request(s)", next_id);
            break;
        }
        core.admit(next_id, recorder)?;
        next_id += 1;
    }
    Ok(next_id)
}
