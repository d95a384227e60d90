//! Externally driven clock for deterministic playback

use super::TimeSource;
use crate::error::{Error, Result};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct Counters {
    /// Milliseconds handed out to waiters so far
    requested: u64,
    /// Milliseconds released by `advance`
    released: u64,
    aborted: bool,
}

#[derive(Debug, Default)]
struct Shared {
    counters: Mutex<Counters>,
    changed: Condvar,
}

/// A time source that only moves when [`advance`](Self::advance) is called.
///
/// Clones share the same counters, so a test keeps one handle and gives the
/// other to the scheduler. `wait_by(ms)` returns once the released total
/// covers everything requested so far plus `ms`.
#[derive(Debug, Clone, Default)]
pub struct VirtualClock {
    shared: Arc<Shared>,
}

impl VirtualClock {
    /// New clock at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Release `ms` more milliseconds and wake blocked waiters.
    pub fn advance(&self, ms: i64) -> Result<()> {
        let step = u64::try_from(ms).map_err(|_| Error::NegativeAdvance { ms })?;
        let mut counters = self.shared.counters.lock();
        counters.released = counters.released.saturating_add(step);
        self.shared.changed.notify_all();
        Ok(())
    }

    /// Release every current and future waiter permanently.
    pub fn abort(&self) {
        self.shared.counters.lock().aborted = true;
        self.shared.changed.notify_all();
    }

    /// Whether [`abort`](Self::abort) has been called
    pub fn is_aborted(&self) -> bool {
        self.shared.counters.lock().aborted
    }

    /// Total milliseconds requested by waiters
    pub fn requested_ms(&self) -> u64 {
        self.shared.counters.lock().requested
    }

    /// Total milliseconds released
    pub fn released_ms(&self) -> u64 {
        self.shared.counters.lock().released
    }

    /// Block until waiters have requested at least `target` milliseconds.
    ///
    /// Returns `false` on timeout. Lets a driver know the scheduler has
    /// reached a given point before advancing.
    pub fn wait_until_requested(&self, target: u64, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut counters = self.shared.counters.lock();
        while counters.requested < target {
            if self
                .shared
                .changed
                .wait_until(&mut counters, deadline)
                .timed_out()
            {
                return counters.requested >= target;
            }
        }
        true
    }
}

impl TimeSource for VirtualClock {
    fn wait_by(&mut self, ms: u64) -> Result<()> {
        let mut counters = self.shared.counters.lock();
        let target = counters.requested.saturating_add(ms);
        counters.requested = target;
        self.shared.changed.notify_all();
        while !counters.aborted && counters.released < target {
            self.shared.changed.wait(&mut counters);
        }
        Ok(())
    }
}
