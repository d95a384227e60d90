//! Player configuration

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Default name of the playback thread
pub const DEFAULT_THREAD_NAME: &str = "smfseq-player";

/// Settings for [`MidiPlayer`](super::MidiPlayer).
///
/// Missing fields fall back to their defaults when deserialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Playback speed multiplier (1.0 = as written)
    pub tempo_ratio: f64,
    /// Send "reset all controllers" on every channel when playback starts
    pub reset_controllers_on_start: bool,
    /// Name given to the playback thread
    pub thread_name: String,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        PlayerConfig {
            tempo_ratio: 1.0,
            reset_controllers_on_start: true,
            thread_name: DEFAULT_THREAD_NAME.to_string(),
        }
    }
}

impl PlayerConfig {
    /// Configuration with a different speed
    pub fn with_tempo_ratio(mut self, ratio: f64) -> Self {
        self.tempo_ratio = ratio;
        self
    }

    /// Reject settings the scheduler cannot run with.
    pub fn validate(&self) -> Result<()> {
        validate_tempo_ratio(self.tempo_ratio)
    }
}

/// A tempo ratio must be finite and strictly positive.
pub fn validate_tempo_ratio(ratio: f64) -> Result<()> {
    if ratio.is_finite() && ratio > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidTempoRatio { ratio })
    }
}
