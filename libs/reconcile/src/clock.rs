//! Clock abstraction for timed loops.
//!
//! Workers never sleep directly; they ask a [`Clock`] for an alarm. In
//! production that is [`SystemClock`]. Tests use [`TestClock`], whose time
//! only moves when the test calls [`TestClock::advance`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use futures_util::future::BoxFuture;
use tokio::sync::{oneshot, Notify};

/// Source of the current time and of alarms.
pub trait Clock: Send + Sync + 'static {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;

    /// Returns a future that resolves once `duration` has elapsed on this clock.
    ///
    /// Dropping the future cancels the alarm.
    fn after(&self, duration: Duration) -> BoxFuture<'static, ()>;
}

// =============================================================================
// System Clock
// =============================================================================

/// Wall clock backed by tokio timers.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn after(&self, duration: Duration) -> BoxFuture<'static, ()> {
        Box::pin(tokio::time::sleep(duration))
    }
}

// =============================================================================
// Test Clock
// =============================================================================

/// A pending alarm registered through [`Clock::after`].
struct Alarm {
    deadline: DateTime<Utc>,
    fire: oneshot::Sender<()>,
}

struct TestClockState {
    now: DateTime<Utc>,
    alarms: Vec<Alarm>,
}

/// Virtual clock for tests.
///
/// Cloning shares the same timeline. Time never passes on its own: alarms
/// fire only from [`TestClock::advance`].
#[derive(Clone)]
pub struct TestClock {
    state: Arc<Mutex<TestClockState>>,
    alarm_added: Arc<Notify>,
}

impl TestClock {
    /// Create a test clock starting at `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            state: Arc::new(Mutex::new(TestClockState {
                now,
                alarms: Vec::new(),
            })),
            alarm_added: Arc::new(Notify::new()),
        }
    }

    /// Move time forward, firing every alarm whose deadline has been reached.
    pub fn advance(&self, duration: Duration) {
        let mut state = self.lock();
        state.now = add_duration(state.now, duration);

        let now = state.now;
        let (due, pending): (Vec<Alarm>, Vec<Alarm>) = state
            .alarms
            .drain(..)
            .filter(|alarm| !alarm.fire.is_closed())
            .partition(|alarm| alarm.deadline <= now);
        state.alarms = pending;
        drop(state);

        for alarm in due {
            let _ = alarm.fire.send(());
        }
    }

    /// Number of alarms still waiting to fire.
    ///
    /// Alarms whose futures were dropped are not counted.
    pub fn alarms(&self) -> usize {
        let mut state = self.lock();
        state.alarms.retain(|alarm| !alarm.fire.is_closed());
        state.alarms.len()
    }

    /// Wait until at least `count` alarms are pending.
    ///
    /// Lets a test advance the clock only after the code under test has
    /// started waiting on it.
    pub async fn wait_alarms(&self, count: usize) {
        loop {
            let added = self.alarm_added.notified();
            if self.alarms() >= count {
                return;
            }
            added.await;
        }
    }

    fn lock(&self) -> MutexGuard<'_, TestClockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Clock for TestClock {
    fn now(&self) -> DateTime<Utc> {
        self.lock().now
    }

    fn after(&self, duration: Duration) -> BoxFuture<'static, ()> {
        let (fire, fired) = oneshot::channel();

        {
            let mut state = self.lock();
            let deadline = add_duration(state.now, duration);
            if deadline <= state.now {
                let _ = fire.send(());
            } else {
                state.alarms.push(Alarm { deadline, fire });
            }
        }
        self.alarm_added.notify_waiters();

        Box::pin(async move {
            // A dropped clock never fires its alarms.
            if fired.await.is_err() {
                std::future::pending::<()>().await;
            }
        })
    }
}

impl std::fmt::Debug for TestClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("TestClock")
            .field("now", &state.now)
            .field("alarms", &state.alarms.len())
            .finish()
    }
}

fn add_duration(at: DateTime<Utc>, duration: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(duration)
        .ok()
        .and_then(|delta| at.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
