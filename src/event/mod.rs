//! MIDI Event Model
//!
//! An [`Event`] is an immutable status byte plus up to two data bytes, with
//! an optional payload for System Exclusive and Meta events. A [`Message`]
//! tags an event with the ticks elapsed since the previous message.

pub mod decode;
pub mod meta;
pub mod status;

pub use decode::{decode_events, EventDecoder};
pub use meta::{tempo_from_bytes, tempo_to_bpm, MetaType, DEFAULT_TEMPO};
pub use status::{event_type, fixed_data_size, ChannelStatus};

use std::fmt;
use std::sync::Arc;

/// Variable-length payload of a SysEx or Meta event.
///
/// The payload is a window `[offset, offset + length)` into a shared buffer,
/// so events decoded from one block can reference it without copying.
#[derive(Clone)]
struct ExtraData {
    buffer: Arc<[u8]>,
    offset: usize,
    length: usize,
}

impl ExtraData {
    fn as_slice(&self) -> &[u8] {
        &self.buffer[self.offset..self.offset + self.length]
    }
}

/// A single MIDI event.
///
/// Invariant: the payload is present exactly when the status byte is 0xF0,
/// 0xF7 or 0xFF. For Meta events `data1` holds the meta type byte.
#[derive(Clone)]
pub struct Event {
    status: u8,
    data1: u8,
    data2: u8,
    extra: Option<ExtraData>,
}

impl Event {
    /// Build a short (non-payload) message.
    ///
    /// Data bytes beyond [`fixed_data_size`] of `status` are zeroed. SysEx and
    /// Meta statuses get an empty payload so the payload invariant holds.
    pub fn short(status: u8, data1: u8, data2: u8) -> Self {
        if is_variable_length(status) {
            return Self::with_extra(status, data1, Arc::from(Vec::new()), 0, 0);
        }
        let size = fixed_data_size(status);
        Event {
            status,
            data1: if size > 0 { data1 } else { 0 },
            data2: if size > 1 { data2 } else { 0 },
            extra: None,
        }
    }

    /// Build an event whose payload is a window into a shared buffer.
    ///
    /// A window reaching past the end of the buffer is clamped to it.
    pub fn with_extra(
        status: u8,
        data1: u8,
        buffer: Arc<[u8]>,
        offset: usize,
        length: usize,
    ) -> Self {
        let offset = offset.min(buffer.len());
        let length = length.min(buffer.len() - offset);
        Event {
            status,
            data1,
            data2: 0,
            extra: Some(ExtraData {
                buffer,
                offset,
                length,
            }),
        }
    }

    /// Meta event with the given type byte and payload.
    pub fn meta(meta_type: u8, payload: impl Into<Vec<u8>>) -> Self {
        let payload = payload.into();
        let length = payload.len();
        Self::with_extra(status::META, meta_type, Arc::from(payload), 0, length)
    }

    /// SysEx event (`status` is 0xF0 or 0xF7). The closing 0xF7 belongs in
    /// the payload.
    pub fn sysex(status: u8, payload: impl Into<Vec<u8>>) -> Self {
        let payload = payload.into();
        let length = payload.len();
        Self::with_extra(status, 0, Arc::from(payload), 0, length)
    }

    /// Tempo meta event
    pub fn tempo(microseconds_per_quarter: u32) -> Self {
        let [_, a, b, c] = microseconds_per_quarter.to_be_bytes();
        Self::meta(MetaType::Tempo.as_byte(), vec![a, b, c])
    }

    /// Note On on `channel` (0-15)
    pub fn note_on(channel: u8, key: u8, velocity: u8) -> Self {
        Self::short(status::NOTE_ON | (channel & 0x0F), key, velocity)
    }

    /// Note Off on `channel` (0-15)
    pub fn note_off(channel: u8, key: u8, velocity: u8) -> Self {
        Self::short(status::NOTE_OFF | (channel & 0x0F), key, velocity)
    }

    /// Control Change on `channel` (0-15)
    pub fn control_change(channel: u8, controller: u8, value: u8) -> Self {
        Self::short(status::CONTROL_CHANGE | (channel & 0x0F), controller, value)
    }

    /// Program Change on `channel` (0-15)
    pub fn program_change(channel: u8, program: u8) -> Self {
        Self::short(status::PROGRAM_CHANGE | (channel & 0x0F), program, 0)
    }

    /// Placeholder event with status byte 0.
    ///
    /// Sentinels are never sent to an output; the merger gives them a zero
    /// delta and does not measure later deltas from them.
    pub fn sentinel() -> Self {
        Event {
            status: 0,
            data1: 0,
            data2: 0,
            extra: None,
        }
    }

    /// True for the status-0 placeholder
    pub fn is_sentinel(&self) -> bool {
        self.status == 0
    }

    /// Raw status byte
    pub fn status_byte(&self) -> u8 {
        self.status
    }

    /// First data byte (meta type for Meta events)
    pub fn data1(&self) -> u8 {
        self.data1
    }

    /// Second data byte
    pub fn data2(&self) -> u8 {
        self.data2
    }

    /// Status collapsed to its class; see [`event_type`].
    pub fn event_type(&self) -> u8 {
        event_type(self.status)
    }

    /// Channel (0-15) for channel messages
    pub fn channel(&self) -> Option<u8> {
        if self.status < status::SYSEX1 {
            Some(self.status & 0x0F)
        } else {
            None
        }
    }

    /// Channel message class, if this is a channel message
    pub fn channel_status(&self) -> Option<ChannelStatus> {
        ChannelStatus::from_status(self.status)
    }

    /// True for Note On and Note Off, whatever the channel
    pub fn is_note(&self) -> bool {
        matches!(self.event_type(), status::NOTE_ON | status::NOTE_OFF)
    }

    /// True for Meta events
    pub fn is_meta(&self) -> bool {
        self.status == status::META
    }

    /// True for either SysEx form
    pub fn is_sysex(&self) -> bool {
        matches!(self.status, status::SYSEX1 | status::SYSEX2)
    }

    /// Meta type byte, for Meta events
    pub fn meta_type(&self) -> Option<u8> {
        self.is_meta().then_some(self.data1)
    }

    /// True when this is a Meta event of the given type
    pub fn is_meta_of(&self, meta_type: MetaType) -> bool {
        self.meta_type() == Some(meta_type.as_byte())
    }

    /// Payload bytes (empty for short messages)
    pub fn extra_data(&self) -> &[u8] {
        match &self.extra {
            Some(extra) => extra.as_slice(),
            None => &[],
        }
    }

    /// Whether a payload is attached
    pub fn has_extra_data(&self) -> bool {
        self.extra.is_some()
    }

    /// Offset of the payload window inside its shared buffer
    pub fn extra_data_offset(&self) -> usize {
        self.extra.as_ref().map_or(0, |e| e.offset)
    }

    /// Length of the payload window
    pub fn extra_data_len(&self) -> usize {
        self.extra.as_ref().map_or(0, |e| e.length)
    }

    /// Tempo carried by a Set Tempo meta event
    pub fn tempo_value(&self) -> Option<u32> {
        if self.is_meta_of(MetaType::Tempo) {
            tempo_from_bytes(self.extra_data())
        } else {
            None
        }
    }

    /// The four raw bytes of a Time Signature meta event
    pub fn time_signature(&self) -> Option<[u8; 4]> {
        if !self.is_meta_of(MetaType::TimeSignature) {
            return None;
        }
        self.extra_data().try_into().ok()
    }

    /// Write the on-the-wire bytes for this event into `out`.
    ///
    /// `out` is cleared first. Meta events exist only inside files and
    /// produce no bytes, in which case `false` is returned. SysEx events are
    /// written as their status byte followed by the payload.
    pub fn write_wire_bytes(&self, out: &mut Vec<u8>) -> bool {
        out.clear();
        match self.status {
            status::META => false,
            status::SYSEX1 | status::SYSEX2 => {
                out.push(self.status);
                out.extend_from_slice(self.extra_data());
                true
            }
            _ => {
                let size = fixed_data_size(self.status);
                out.push(self.status);
                if size > 0 {
                    out.push(self.data1);
                }
                if size > 1 {
                    out.push(self.data2);
                }
                true
            }
        }
    }
}

fn is_variable_length(status: u8) -> bool {
    matches!(status, status::SYSEX1 | status::SYSEX2 | status::META)
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.status == other.status
            && self.data1 == other.data1
            && self.data2 == other.data2
            && self.has_extra_data() == other.has_extra_data()
            && self.extra_data() == other.extra_data()
    }
}

impl Eq for Event {}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Event");
        s.field("status", &format_args!("{:#04X}", self.status))
            .field("data1", &self.data1)
            .field("data2", &self.data2);
        if self.extra.is_some() {
            s.field("extra_data", &self.extra_data());
        }
        s.finish()
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            status::META => write!(
                f,
                "Meta {:02X} ({} bytes)",
                self.data1,
                self.extra_data_len()
            ),
            status::SYSEX1 | status::SYSEX2 => {
                write!(f, "SysEx {:02X} ({} bytes)", self.status, self.extra_data_len())
            }
            _ => write!(
                f,
                "{:02X} {:02X} {:02X}",
                self.status, self.data1, self.data2
            ),
        }
    }
}

/// An event tagged with the ticks elapsed since the previous message of the
/// same stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Ticks since the previous message
    pub delta_time: u32,
    /// The event
    pub event: Event,
}

impl Message {
    /// Create a new message
    pub fn new(delta_time: u32, event: Event) -> Self {
        Message { delta_time, event }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[dt{}]{}", self.delta_time, self.event)
    }
}
