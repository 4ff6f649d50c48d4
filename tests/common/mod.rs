use chrono::NaiveDateTime;
use rate_guard_sim::clock::{ActorId, Clock, VirtualClock};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Virtual clock whose `now()` panics on the `fail_on`th call (1-based).
///
/// Decisions are stamped while the bucket lock is held, so the panic poisons
/// the bucket state of whichever actor is recording at that moment.
pub struct FailingClock {
    inner: VirtualClock,
    calls: AtomicUsize,
    fail_on: usize,
}

impl FailingClock {
    pub fn new(fail_on: usize) -> Self {
        FailingClock {
            inner: VirtualClock::new(),
            calls: AtomicUsize::new(0),
            fail_on,
        }
    }
}

impl Clock for FailingClock {
    fn now(&self) -> NaiveDateTime {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call == self.fail_on {
            panic!("clock failure on call {}", call);
        }
        self.inner.now()
    }

    fn enroll(&self) -> ActorId {
        self.inner.enroll()
    }

    fn sleep(&self, actor: ActorId, period: Duration) {
        self.inner.sleep(actor, period)
    }

    fn retire(&self, actor: ActorId) {
        self.inner.retire(actor)
    }
}
