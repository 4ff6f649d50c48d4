//! Time sources for the simulation actors.
//!
//! Actors never call `std::thread::sleep` directly. They enroll with a
//! [`Clock`] and suspend through it, which lets the same harness run against
//! wall time ([`SystemClock`]) or against a deterministic, instantly advancing
//! schedule ([`VirtualClock`]).

use chrono::{Local, NaiveDateTime};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Identifier handed out by [`Clock::enroll`].
///
/// Ids are handed out in enrollment order. On a [`VirtualClock`], lower ids win
/// ties between actors that wake at the same instant; on a [`SystemClock`] the
/// OS scheduler decides.
pub type ActorId = usize;

/// Scheduler abstraction shared by the replenishment and arrival actors.
pub trait Clock: Send + Sync {
    /// Current point in time, used to timestamp decisions.
    fn now(&self) -> NaiveDateTime;

    /// Registers a new actor. Must be called before the actor starts.
    fn enroll(&self) -> ActorId;

    /// Suspends `actor` for `period`. This is the only blocking point of an actor.
    fn sleep(&self, actor: ActorId, period: Duration);

    /// Unregisters `actor`. The actor must not call [`sleep`](Clock::sleep) afterwards.
    fn retire(&self, actor: ActorId);
}

/// RAII handle for an enrolled actor.
///
/// Retires the actor when dropped, including while unwinding from a panic, so a
/// failing actor cannot leave a [`VirtualClock`] waiting for it forever.
pub struct Enrollment {
    clock: Arc<dyn Clock>,
    id: ActorId,
}

impl Enrollment {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let id = clock.enroll();
        Enrollment { clock, id }
    }

    pub fn sleep(&self, period: Duration) {
        self.clock.sleep(self.id, period);
    }
}

impl Drop for Enrollment {
    fn drop(&mut self) {
        self.clock.retire(self.id);
    }
}

/// Real-time clock: sleeps on the calling thread and reports local wall time.
#[derive(Debug, Default)]
pub struct SystemClock {
    next_id: AtomicUsize,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }

    fn enroll(&self) -> ActorId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    fn sleep(&self, _actor: ActorId, period: Duration) {
        if !period.is_zero() {
            std::thread::sleep(period);
        }
    }

    fn retire(&self, _actor: ActorId) {}
}

/// Deterministic clock for tests and instant replays.
///
/// Simulated time only moves forward once every enrolled actor is asleep. The
/// sleeper with the earliest deadline is then released alone (ties go to the
/// lowest [`ActorId`]), and it runs until it sleeps again or retires. Given the
/// same enrollment order and the same sleep periods, two runs therefore
/// interleave identically.
///
/// # Example
///
/// ```rust
/// use rate_guard_sim::clock::{Clock, VirtualClock};
/// use std::time::Duration;
///
/// let clock = VirtualClock::new();
/// let actor = clock.enroll();
/// clock.sleep(actor, Duration::from_secs(3));
/// assert_eq!(clock.elapsed(), Duration::from_secs(3));
/// clock.retire(actor);
/// ```
pub struct VirtualClock {
    origin: NaiveDateTime,
    schedule: Mutex<Schedule>,
    wakeup: Condvar,
}

#[derive(Default)]
struct Schedule {
    /// Simulated time since `origin`.
    elapsed: Duration,
    next_id: ActorId,
    /// Enrolled actors that are currently neither asleep nor retired.
    running: usize,
    /// Pending wake-ups ordered by (deadline, actor).
    sleepers: BTreeSet<(Duration, ActorId)>,
    /// Actor selected to resume, not yet picked up by its thread.
    released: Option<ActorId>,
}

impl VirtualClock {
    /// Creates a virtual clock starting at the Unix epoch.
    pub fn new() -> Self {
        Self::starting_at(NaiveDateTime::default())
    }

    /// Creates a virtual clock whose timestamps start at `origin`.
    pub fn starting_at(origin: NaiveDateTime) -> Self {
        VirtualClock {
            origin,
            schedule: Mutex::new(Schedule::default()),
            wakeup: Condvar::new(),
        }
    }

    /// Simulated time elapsed since the origin.
    pub fn elapsed(&self) -> Duration {
        self.lock().elapsed
    }

    fn lock(&self) -> MutexGuard<'_, Schedule> {
        // The schedule is only mutated in short sections that cannot panic.
        self.schedule.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Releases the next sleeper once nobody else is running.
    fn dispatch(&self, schedule: &mut Schedule) {
        if schedule.running > 0 || schedule.released.is_some() {
            return;
        }
        if let Some(next) = schedule.sleepers.pop_first() {
            let (deadline, actor) = next;
            schedule.elapsed = schedule.elapsed.max(deadline);
            schedule.released = Some(actor);
            schedule.running += 1;
            self.wakeup.notify_all();
        }
    }
}

impl Default for VirtualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for VirtualClock {
    fn now(&self) -> NaiveDateTime {
        let elapsed = self.elapsed();
        let millis = i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX);
        self.origin + chrono::Duration::milliseconds(millis)
    }

    fn enroll(&self) -> ActorId {
        let mut schedule = self.lock();
        let id = schedule.next_id;
        schedule.next_id += 1;
        schedule.running += 1;
        id
    }

    fn sleep(&self, actor: ActorId, period: Duration) {
        let mut schedule = self.lock();
        let deadline = schedule.elapsed + period;
        schedule.sleepers.insert((deadline, actor));
        schedule.running -= 1;
        self.dispatch(&mut schedule);

        while schedule.released != Some(actor) {
            schedule = self
                .wakeup
                .wait(schedule)
                .unwrap_or_else(PoisonError::into_inner);
        }
        schedule.released = None;
    }

    fn retire(&self, _actor: ActorId) {
        let mut schedule = self.lock();
        schedule.running = schedule.running.saturating_sub(1);
        self.dispatch(&mut schedule);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn system_clock_hands_out_ids_in_enrollment_order() {
        let clock = SystemClock::new();
        assert_eq!(clock.enroll(), 0);
        assert_eq!(clock.enroll(), 1);
        assert_eq!(clock.enroll(), 2);
    }

    #[test]
    fn single_actor_advances_by_its_own_sleeps() {
        let clock = VirtualClock::new();
        let actor = clock.enroll();
        clock.sleep(actor, Duration::from_millis(200));
        clock.sleep(actor, Duration::from_millis(300));
        assert_eq!(clock.elapsed(), Duration::from_millis(500));
        clock.retire(actor);
    }

    #[test]
    fn zero_sleep_does_not_advance_time() {
        let clock = VirtualClock::new();
        let actor = clock.enroll();
        clock.sleep(actor, Duration::ZERO);
        assert_eq!(clock.elapsed(), Duration::ZERO);
        clock.retire(actor);
    }

    #[test]
    fn now_is_origin_plus_elapsed() {
        let clock = VirtualClock::new();
        let actor = clock.enroll();
        clock.sleep(actor, Duration::from_secs(61));
        let expected = NaiveDateTime::default() + chrono::Duration::seconds(61);
        assert_eq!(clock.now(), expected);
        clock.retire(actor);
    }

    #[test]
    fn actors_wake_in_deadline_order_with_ties_to_lowest_id() {
        let clock: Arc<VirtualClock> = Arc::new(VirtualClock::new());
        let trace = Arc::new(Mutex::new(Vec::new()));

        let slow = Enrollment::new(clock.clone());
        let fast = Enrollment::new(clock.clone());

        thread::scope(|s| {
            let slow_trace = trace.clone();
            let slow_clock = clock.clone();
            s.spawn(move || {
                for _ in 0..2 {
                    slow.sleep(Duration::from_millis(1000));
                    slow_trace.lock().unwrap().push(("slow", slow_clock.elapsed()));
                }
            });
            let fast_trace = trace.clone();
            let fast_clock = clock.clone();
            s.spawn(move || {
                for _ in 0..4 {
                    fast.sleep(Duration::from_millis(500));
                    fast_trace.lock().unwrap().push(("fast", fast_clock.elapsed()));
                }
            });
        });

        let ms = Duration::from_millis;
        assert_eq!(
            *trace.lock().unwrap(),
            vec![
                ("fast", ms(500)),
                ("slow", ms(1000)),
                ("fast", ms(1000)),
                ("fast", ms(1500)),
                ("slow", ms(2000)),
                ("fast", ms(2000)),
            ]
        );
    }

    #[test]
    fn retiring_actor_lets_remaining_sleeper_proceed() {
        let clock: Arc<VirtualClock> = Arc::new(VirtualClock::new());
        let quitter = Enrollment::new(clock.clone());
        let sleeper = Enrollment::new(clock.clone());

        thread::scope(|s| {
            s.spawn(move || {
                sleeper.sleep(Duration::from_secs(5));
            });
            s.spawn(move || drop(quitter));
        });

        assert_eq!(clock.elapsed(), Duration::from_secs(5));
    }
}
