//! Time sources for the scheduler
//!
//! The scheduler never sleeps directly; it asks a [`TimeSource`] to wait for
//! the duration of each delta time. [`AdjustingClock`] follows the wall clock
//! and compensates for drift, [`VirtualClock`] only moves when a test
//! advances it.

pub mod adjusting;
pub mod virtual_clock;

pub use adjusting::AdjustingClock;
pub use virtual_clock::VirtualClock;

use crate::error::Result;

/// Blocking wait strategy consumed by the scheduler.
pub trait TimeSource {
    /// Block for approximately `ms` milliseconds.
    fn wait_by(&mut self, ms: u64) -> Result<()>;

    /// Forget accumulated timing state.
    ///
    /// Called when playback resumes after a pause or jumps to a new position,
    /// so the paused interval is not treated as lag.
    fn reset(&mut self) {}
}

impl<T: TimeSource + ?Sized> TimeSource for Box<T> {
    fn wait_by(&mut self, ms: u64) -> Result<()> {
        (**self).wait_by(ms)
    }

    fn reset(&mut self) {
        (**self).reset()
    }
}
