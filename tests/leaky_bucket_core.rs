mod common;

use common::FailingClock;
use rate_guard_sim::clock::VirtualClock;
use rate_guard_sim::cores::{Admission, LeakyBucketCore, LeakyBucketCoreConfig};
use rate_guard_sim::rate_limit::RateLimitCore;
use rate_guard_sim::{ConfigError, CoreError, DecisionRecorder, Outcome, Uint};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

fn new_leaky_bucket(capacity: Uint, outflow_rate: Uint) -> LeakyBucketCore {
    LeakyBucketCore::new(capacity, outflow_rate).unwrap()
}

fn new_recorder() -> DecisionRecorder {
    DecisionRecorder::new(Arc::new(VirtualClock::new()))
}

#[test]
fn bucket_starts_empty() {
    let bucket = new_leaky_bucket(3, 1);
    assert_eq!(bucket.len(), Ok(0));
    assert_eq!(bucket.is_empty(), Ok(true));
    assert_eq!(bucket.drain_tick(), Ok(vec![]));
}

#[test]
fn zero_parameters_are_rejected() {
    assert_eq!(
        LeakyBucketCore::new(0, 1).unwrap_err(),
        ConfigError::NonPositive("capacity")
    );
    assert_eq!(
        LeakyBucketCore::new(3, 0).unwrap_err(),
        ConfigError::NonPositive("outflow_rate")
    );
    assert!(LeakyBucketCore::try_from(LeakyBucketCoreConfig::new(0, 0)).is_err());
}

#[test]
fn queue_saturation() {
    let bucket = new_leaky_bucket(3, 1);
    let admissions: Vec<Admission> = (0..5).map(|id| bucket.enqueue(id).unwrap()).collect();

    assert_eq!(
        admissions,
        vec![
            Admission::Queued,
            Admission::Queued,
            Admission::Queued,
            Admission::Dropped,
            Admission::Dropped,
        ]
    );
    assert_eq!(bucket.queued(), Ok(vec![0, 1, 2]));

    assert_eq!(bucket.drain_tick(), Ok(vec![0]));
    assert_eq!(bucket.drain_tick(), Ok(vec![1]));
    assert_eq!(bucket.drain_tick(), Ok(vec![2]));
    assert_eq!(bucket.drain_tick(), Ok(vec![]));
}

#[test]
fn drain_stops_early_when_queue_runs_out() {
    let bucket = new_leaky_bucket(10, 4);
    bucket.enqueue(7).unwrap();
    bucket.enqueue(8).unwrap();

    assert_eq!(bucket.drain_tick(), Ok(vec![7, 8]));
    assert_eq!(bucket.len(), Ok(0));
}

#[test]
fn drain_respects_outflow_rate() {
    let bucket = new_leaky_bucket(10, 3);
    for id in 0..8 {
        bucket.enqueue(id).unwrap();
    }
    assert_eq!(bucket.drain_tick(), Ok(vec![0, 1, 2]));
    assert_eq!(bucket.drain_tick(), Ok(vec![3, 4, 5]));
    assert_eq!(bucket.drain_tick(), Ok(vec![6, 7]));
}

#[test]
fn room_frees_up_after_drain() {
    let bucket = new_leaky_bucket(1, 1);
    assert_eq!(bucket.enqueue(0), Ok(Admission::Queued));
    assert_eq!(bucket.enqueue(1), Ok(Admission::Dropped));
    bucket.drain_tick().unwrap();
    assert_eq!(bucket.enqueue(2), Ok(Admission::Queued));
}

#[test]
fn forwarded_is_recorded_at_drain_not_enqueue() {
    let bucket = new_leaky_bucket(2, 1);
    let recorder = new_recorder();

    bucket.admit(0, &recorder).unwrap();
    bucket.admit(1, &recorder).unwrap();
    assert!(recorder.is_empty());

    bucket.admit(2, &recorder).unwrap();
    assert_eq!(recorder.len(), 1);

    bucket.tick(&recorder).unwrap();
    bucket.tick(&recorder).unwrap();

    let events = recorder.finish();
    let decisions: Vec<(Outcome, Uint)> = events.iter().map(|e| (e.outcome, e.request_id)).collect();
    assert_eq!(
        decisions,
        vec![
            (Outcome::Dropped, 2),
            (Outcome::Forwarded, 0),
            (Outcome::Forwarded, 1),
        ]
    );
}

#[test]
fn close_drops_residual_requests_in_queue_order() {
    let bucket = new_leaky_bucket(5, 1);
    let recorder = new_recorder();
    for id in 0..4 {
        bucket.admit(id, &recorder).unwrap();
    }
    bucket.tick(&recorder).unwrap();
    bucket.close(&recorder).unwrap();

    assert_eq!(bucket.len(), Ok(0));
    let events = recorder.finish();
    let decisions: Vec<(Outcome, Uint)> = events.iter().map(|e| (e.outcome, e.request_id)).collect();
    assert_eq!(
        decisions,
        vec![
            (Outcome::Forwarded, 0),
            (Outcome::Dropped, 1),
            (Outcome::Dropped, 2),
            (Outcome::Dropped, 3),
        ]
    );
}

#[test]
fn panic_while_draining_poisons_bucket_state() {
    let bucket = new_leaky_bucket(3, 2);
    let recorder = DecisionRecorder::new(Arc::new(FailingClock::new(1)));
    bucket.enqueue(0).unwrap();

    let result = panic::catch_unwind(AssertUnwindSafe(|| bucket.tick(&recorder)));
    assert!(result.is_err());

    assert_eq!(bucket.len(), Err(CoreError::Poisoned));
    assert_eq!(bucket.enqueue(1), Err(CoreError::Poisoned));
    assert_eq!(bucket.drain_tick(), Err(CoreError::Poisoned));
}
