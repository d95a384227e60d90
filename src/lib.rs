//! Standard MIDI File sequencer
//!
//! Reads Standard MIDI Files, flattens multi-track sequences into a single
//! time-ordered stream, and plays that stream in real time with
//! pause/resume/stop/seek and live tempo tracking.
//!
//! # Features
//! - Streaming SMF reader with running status and byte-exact error offsets
//! - Stable track merger that keeps same-tick events in file order
//! - Scheduler with a pluggable time source (wall clock or virtual clock)
//! - Duration and position queries that follow tempo changes
//! - Output port contracts plus a player façade that encodes events to bytes
//!
//! # Crate feature flags
//! - `midir` (opt-in): system MIDI outputs through the `midir` crate
//!
//! # Quick start
//! ## Parse and inspect
//! ```no_run
//! let sequence = smfseq::smf::load_file("song.mid").unwrap();
//! println!(
//!     "{} tracks, {} ticks, {} ms",
//!     sequence.tracks().len(),
//!     sequence.total_ticks(),
//!     sequence.total_play_time_ms().unwrap()
//! );
//! ```
//!
//! ## Drive the scheduler yourself
//! ```no_run
//! use smfseq::clock::AdjustingClock;
//! use smfseq::player::EventLooper;
//! use smfseq::Event;
//!
//! let sequence = smfseq::smf::load_file("song.mid").unwrap();
//! let looper = EventLooper::new(
//!     sequence.merged_messages(),
//!     Box::new(AdjustingClock::new()),
//!     sequence.division(),
//! )
//! .unwrap();
//! looper.control().play();
//! let mut print = |event: &Event| -> smfseq::Result<()> {
//!     println!("{}", event);
//!     Ok(())
//! };
//! looper.run(&mut print).unwrap();
//! ```

#![warn(missing_docs)]

pub mod clock; // Time Sources
pub mod error; // Error Types
pub mod event; // MIDI Event Model
pub mod output; // Output Port Contracts
pub mod player; // Scheduler & Player
pub mod smf; // File Reading & Merging

pub use error::{ConstructionError, Error, ParseError, Result};

// Public API exports
pub use clock::{AdjustingClock, TimeSource, VirtualClock};
pub use event::{Event, Message, MetaType};
pub use output::{ConnectionState, MidiAccess, Output, Port, PortInfo};
pub use player::{
    EventLooper, EventSink, LooperControl, MidiPlayer, PlaybackOutcome, PlaybackSnapshot,
    PlaybackState, PlayerConfig, SeekAction,
};
pub use smf::{load_file, merge, Sequence, Track};
