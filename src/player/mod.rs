//! Real-time playback
//!
//! [`EventLooper`] is the scheduler: it runs on a thread of the caller's
//! choosing and dispatches events to an [`EventSink`]. [`MidiPlayer`] wraps it
//! with a background thread and an [`Output`](crate::output::Output) port.

pub mod config;
pub mod looper;
pub mod midi_player;
pub mod seek;

pub use config::PlayerConfig;
pub use looper::{EventLooper, EventSink, LooperControl, PlaybackOutcome};
pub use midi_player::MidiPlayer;
pub use seek::{skip_notes_until, SeekAction, SeekFilter};

use serde::{Deserialize, Serialize};

/// Run state of the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlaybackState {
    /// Not running, or finished
    #[default]
    Stopped,
    /// Dispatching events
    Playing,
    /// Waiting on the gate; position is kept
    Paused,
}

/// Point-in-time view of a player for "now playing" displays.
///
/// Fields are read one at a time and may be mutually slightly out of date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackSnapshot {
    /// Run state
    pub state: PlaybackState,
    /// Tempo in microseconds per quarter note
    pub tempo: u32,
    /// Tempo in beats per minute
    pub bpm: f64,
    /// Raw time signature bytes (numerator, denominator power, clocks per
    /// click, 32nds per quarter); zero until one is seen
    pub time_signature: [u8; 4],
    /// Ticks played
    pub play_ticks: u64,
    /// Position in milliseconds
    pub position_ms: u64,
}
