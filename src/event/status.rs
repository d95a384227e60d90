//! MIDI status byte table
//!
//! Channel messages carry their channel in the low nibble; the high nibble is
//! the message class. System messages (0xF0..=0xFF) use the whole byte.

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

/// Note Off
pub const NOTE_OFF: u8 = 0x80;
/// Note On
pub const NOTE_ON: u8 = 0x90;
/// Polyphonic (key) aftertouch
pub const POLY_AFTERTOUCH: u8 = 0xA0;
/// Control Change
pub const CONTROL_CHANGE: u8 = 0xB0;
/// Program Change
pub const PROGRAM_CHANGE: u8 = 0xC0;
/// Channel aftertouch
pub const CHANNEL_AFTERTOUCH: u8 = 0xD0;
/// Pitch bend
pub const PITCH_BEND: u8 = 0xE0;
/// System Exclusive, start form
pub const SYSEX1: u8 = 0xF0;
/// MIDI Time Code quarter frame
pub const MTC_QUARTER_FRAME: u8 = 0xF1;
/// Song Position Pointer
pub const SONG_POSITION_POINTER: u8 = 0xF2;
/// Song Select
pub const SONG_SELECT: u8 = 0xF3;
/// Tune Request
pub const TUNE_REQUEST: u8 = 0xF6;
/// System Exclusive, continuation / escape form
pub const SYSEX2: u8 = 0xF7;
/// End of exclusive marker (same byte as [`SYSEX2`])
pub const END_SYSEX: u8 = 0xF7;
/// Timing clock
pub const MIDI_CLOCK: u8 = 0xF8;
/// Tick
pub const MIDI_TICK: u8 = 0xF9;
/// Start
pub const MIDI_START: u8 = 0xFA;
/// Continue
pub const MIDI_CONTINUE: u8 = 0xFB;
/// Stop
pub const MIDI_STOP: u8 = 0xFC;
/// Active sensing
pub const ACTIVE_SENSE: u8 = 0xFE;
/// Meta event marker inside a file (system reset on the wire)
pub const META: u8 = 0xFF;

/// Controller number for "all sound off"
pub const CC_ALL_SOUND_OFF: u8 = 0x78;
/// Controller number for "reset all controllers"
pub const CC_RESET_ALL_CONTROLLERS: u8 = 0x79;

/// Channel message classes (high nibble of the status byte)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive)]
#[repr(u8)]
pub enum ChannelStatus {
    /// Note Off
    NoteOff = 0x80,
    /// Note On
    NoteOn = 0x90,
    /// Polyphonic aftertouch
    PolyAftertouch = 0xA0,
    /// Control Change
    ControlChange = 0xB0,
    /// Program Change
    ProgramChange = 0xC0,
    /// Channel aftertouch
    ChannelAftertouch = 0xD0,
    /// Pitch bend
    PitchBend = 0xE0,
}

impl ChannelStatus {
    /// Decode the class of a channel status byte; `None` for system bytes.
    pub fn from_status(status: u8) -> Option<Self> {
        if status >= SYSEX1 {
            return None;
        }
        Self::from_u8(status & 0xF0)
    }
}

/// Number of data bytes that follow `status` on the wire.
///
/// Program Change and Channel Aftertouch take one byte, every other channel
/// message takes two. System common messages follow a fixed lookup; System
/// Exclusive, Meta and real-time bytes report zero (variable or none).
pub fn fixed_data_size(status: u8) -> usize {
    match status & 0xF0 {
        0xF0 => match status {
            MTC_QUARTER_FRAME | SONG_SELECT => 1,
            SONG_POSITION_POINTER => 2,
            _ => 0,
        },
        PROGRAM_CHANGE | CHANNEL_AFTERTOUCH => 1,
        _ => 2,
    }
}

/// Collapse a status byte to its event class.
///
/// Channel messages lose their channel nibble; Meta and both SysEx forms keep
/// their full byte. Other system bytes collapse to 0xF0.
pub fn event_type(status: u8) -> u8 {
    match status {
        META | SYSEX1 | SYSEX2 => status,
        _ => status & 0xF0,
    }
}
