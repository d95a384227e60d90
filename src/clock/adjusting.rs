//! Self-correcting wall-clock waiter

use super::TimeSource;
use crate::error::Result;
use std::thread;
use std::time::{Duration, Instant};

/// Sleeps for requested durations while keeping the running total aligned
/// with real elapsed time.
///
/// Each wait sleeps for the nominal duration minus however far the thread has
/// already fallen behind since the first wait. Late wake-ups therefore shorten
/// later sleeps instead of accumulating.
#[derive(Debug, Default)]
pub struct AdjustingClock {
    /// Instant of the first wait since creation or reset
    started: Option<Instant>,
    /// Sum of all requested durations since `started`
    nominal_total_ms: u64,
}

impl AdjustingClock {
    /// Create a clock; timing starts at the first wait.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total milliseconds requested since the last reset
    pub fn nominal_total_ms(&self) -> u64 {
        self.nominal_total_ms
    }

    /// How long the next wait of `ms` should actually sleep, given `elapsed`
    /// wall time since the first wait.
    fn corrected_sleep(&self, ms: u64, elapsed: Duration) -> Option<Duration> {
        let due = Duration::from_millis(self.nominal_total_ms.saturating_add(ms));
        let sleep = due.saturating_sub(elapsed);
        (!sleep.is_zero()).then_some(sleep)
    }

    /// Account for a request of `ms` and return how long to actually sleep.
    fn schedule(&mut self, ms: u64) -> Option<Duration> {
        let started = *self.started.get_or_insert_with(Instant::now);
        let sleep = self.corrected_sleep(ms, started.elapsed());
        self.nominal_total_ms = self.nominal_total_ms.saturating_add(ms);
        sleep
    }
}

impl TimeSource for AdjustingClock {
    fn wait_by(&mut self, ms: u64) -> Result<()> {
        if let Some(duration) = self.schedule(ms) {
            thread::sleep(duration);
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.started = None;
        self.nominal_total_ms = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_on_schedule_sleeps_full_amount() {
        let clock = AdjustingClock {
            started: Some(Instant::now()),
            nominal_total_ms: 100,
        };
        assert_eq!(
            clock.corrected_sleep(50, Duration::from_millis(100)),
            Some(Duration::from_millis(50))
        );
    }

    #[test]
    fn test_lag_shortens_sleep() {
        let clock = AdjustingClock {
            started: Some(Instant::now()),
            nominal_total_ms: 100,
        };
        assert_eq!(
            clock.corrected_sleep(50, Duration::from_millis(130)),
            Some(Duration::from_millis(20))
        );
        assert_eq!(clock.corrected_sleep(50, Duration::from_millis(180)), None);
    }

    #[test]
    fn test_early_wakeup_extends_sleep() {
        let clock = AdjustingClock {
            started: Some(Instant::now()),
            nominal_total_ms: 100,
        };
        assert_eq!(
            clock.corrected_sleep(50, Duration::from_millis(90)),
            Some(Duration::from_millis(60))
        );
    }

    #[test]
    fn test_total_time_tracks_nominal() {
        let mut clock = AdjustingClock::new();
        let start = Instant::now();
        for _ in 0..5 {
            clock.wait_by(10).unwrap();
        }
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(40), "elapsed {:?}", elapsed);
        assert_eq!(clock.nominal_total_ms(), 50);
    }

    #[test]
    fn test_reset_forgets_history() {
        let mut clock = AdjustingClock::new();
        clock.wait_by(5).unwrap();
        clock.reset();
        assert_eq!(clock.nominal_total_ms(), 0);
        assert!(clock.started.is_none());
    }

    #[test]
    fn test_nominal_total_saturates() {
        let mut clock = AdjustingClock {
            started: Some(Instant::now()),
            nominal_total_ms: u64::MAX - 10,
        };
        assert!(clock.schedule(100).is_some());
        assert_eq!(clock.nominal_total_ms(), u64::MAX);
    }

    #[test]
    fn test_zero_wait_does_not_sleep() {
        let mut clock = AdjustingClock::new();
        let start = Instant::now();
        clock.wait_by(0).unwrap();
        assert!(start.elapsed() < Duration::from_millis(50));
    }
}
