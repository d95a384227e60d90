//! Meta event types found in Standard MIDI Files

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

/// Tempo in microseconds per quarter note assumed until a tempo event is seen
pub const DEFAULT_TEMPO: u32 = 500_000;

/// Meta event type byte (the byte following 0xFF)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive)]
#[repr(u8)]
pub enum MetaType {
    /// Sequence number
    SequenceNumber = 0x00,
    /// Free text
    Text = 0x01,
    /// Copyright notice
    Copyright = 0x02,
    /// Sequence or track name
    TrackName = 0x03,
    /// Instrument name
    InstrumentName = 0x04,
    /// Lyric
    Lyric = 0x05,
    /// Marker
    Marker = 0x06,
    /// Cue point
    Cue = 0x07,
    /// MIDI channel prefix
    ChannelPrefix = 0x20,
    /// End of track
    EndOfTrack = 0x2F,
    /// Set tempo (3-byte microseconds per quarter note)
    Tempo = 0x51,
    /// SMPTE offset
    SmpteOffset = 0x54,
    /// Time signature (4 bytes)
    TimeSignature = 0x58,
    /// Key signature
    KeySignature = 0x59,
    /// Sequencer specific
    SequencerSpecific = 0x7F,
}

impl MetaType {
    /// Decode a meta type byte; `None` for types outside the standard table.
    pub fn from_byte(byte: u8) -> Option<Self> {
        Self::from_u8(byte)
    }

    /// Raw type byte
    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

/// Read a 3-byte big-endian tempo value.
///
/// Returns `None` when the payload is shorter than three bytes.
pub fn tempo_from_bytes(payload: &[u8]) -> Option<u32> {
    match payload {
        [a, b, c, ..] => Some((u32::from(*a) << 16) | (u32::from(*b) << 8) | u32::from(*c)),
        _ => None,
    }
}

/// Beats per minute for a tempo in microseconds per quarter note.
pub fn tempo_to_bpm(tempo: u32) -> f64 {
    if tempo == 0 {
        return 0.0;
    }
    60_000_000.0 / f64::from(tempo)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tempo_from_bytes() {
        assert_eq!(tempo_from_bytes(&[0x07, 0xA1, 0x20]), Some(500_000));
        assert_eq!(tempo_from_bytes(&[0x0F, 0x42, 0x40, 0xFF]), Some(1_000_000));
        assert_eq!(tempo_from_bytes(&[0x07, 0xA1]), None);
    }

    #[test]
    fn test_meta_type_lookup() {
        assert_eq!(MetaType::from_byte(0x51), Some(MetaType::Tempo));
        assert_eq!(MetaType::from_byte(0x58), Some(MetaType::TimeSignature));
        assert_eq!(MetaType::from_byte(0x2F), Some(MetaType::EndOfTrack));
        assert_eq!(MetaType::from_byte(0x60), None);
        assert_eq!(MetaType::Tempo.as_byte(), 0x51);
    }

    #[test]
    fn test_default_tempo_is_120_bpm() {
        assert!((tempo_to_bpm(DEFAULT_TEMPO) - 120.0).abs() < 1e-9);
    }
}
