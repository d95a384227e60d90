//! Decoding of flat MIDI byte blocks
//!
//! Output ports receive already-expanded byte blocks (no running status).
//! [`EventDecoder`] splits such a block back into individual events so a port
//! can forward short messages and SysEx blocks separately. This is not used
//! for file parsing.

use super::{fixed_data_size, status, Event};
use crate::error::{Error, Result};
use std::sync::Arc;

/// Lazy, single-pass decoder over a flat byte block.
///
/// Yields one `Result<Event>` per message. After the first error the decoder
/// is exhausted.
pub struct EventDecoder {
    buffer: Arc<[u8]>,
    position: usize,
    failed: bool,
}

/// Decode `bytes` into a lazy sequence of events.
pub fn decode_events(bytes: &[u8]) -> EventDecoder {
    EventDecoder::new(Arc::from(bytes))
}

impl EventDecoder {
    /// Decode from a shared buffer; SysEx payloads borrow from it.
    pub fn new(buffer: Arc<[u8]>) -> Self {
        EventDecoder {
            buffer,
            position: 0,
            failed: false,
        }
    }

    fn decode_sysex(&mut self, start: usize) -> Event {
        // Payload runs up to and including the closing 0xF7, or to the end of
        // the block when the terminator is missing.
        let payload_start = start + 1;
        let end = self.buffer[payload_start..]
            .iter()
            .position(|&b| b == status::END_SYSEX)
            .map_or(self.buffer.len(), |i| payload_start + i + 1);
        self.position = end;
        Event::with_extra(
            self.buffer[start],
            0,
            Arc::clone(&self.buffer),
            payload_start,
            end - payload_start,
        )
    }
}

impl Iterator for EventDecoder {
    type Item = Result<Event>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.position >= self.buffer.len() {
            return None;
        }

        let start = self.position;
        let status_byte = self.buffer[start];

        if status_byte < 0x80 {
            self.failed = true;
            return Some(Err(Error::UnexpectedDataByte {
                byte: status_byte,
                offset: start,
            }));
        }

        if status_byte == status::SYSEX1 || status_byte == status::SYSEX2 {
            return Some(Ok(self.decode_sysex(start)));
        }

        let size = fixed_data_size(status_byte);
        if start + size >= self.buffer.len() && size > 0 {
            self.failed = true;
            return Some(Err(Error::IncompleteMessage {
                status: status_byte,
                offset: start,
            }));
        }

        let data1 = if size > 0 { self.buffer[start + 1] } else { 0 };
        let data2 = if size > 1 { self.buffer[start + 2] } else { 0 };
        self.position = start + size + 1;
        Some(Ok(Event::short(status_byte, data1, data2)))
    }
}

impl std::iter::FusedIterator for EventDecoder {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_short_messages() {
        let events: Vec<Event> = decode_events(&[0x90, 60, 100, 0xC1, 7, 0xF8, 0x80, 60, 0])
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(
            events,
            vec![
                Event::note_on(0, 60, 100),
                Event::program_change(1, 7),
                Event::short(0xF8, 0, 0),
                Event::note_off(0, 60, 0),
            ]
        );
    }

    #[test]
    fn test_decode_sysex_then_short() {
        let bytes = [0xF0, 0x41, 0x10, 0xF7, 0xB0, 0x07, 0x64];
        let mut decoder = decode_events(&bytes);

        let sysex = decoder.next().unwrap().unwrap();
        assert_eq!(sysex.status_byte(), 0xF0);
        assert_eq!(sysex.extra_data(), &[0x41, 0x10, 0xF7]);

        let cc = decoder.next().unwrap().unwrap();
        assert_eq!(cc, Event::control_change(0, 7, 100));
        assert!(decoder.next().is_none());
    }

    #[test]
    fn test_decode_incomplete_message() {
        let mut decoder = decode_events(&[0x90, 60]);
        assert!(matches!(
            decoder.next(),
            Some(Err(Error::IncompleteMessage {
                status: 0x90,
                offset: 0
            }))
        ));
        assert!(decoder.next().is_none());
    }

    #[test]
    fn test_decode_rejects_running_status() {
        let mut decoder = decode_events(&[0x90, 60, 100, 62, 100]);
        assert!(decoder.next().unwrap().is_ok());
        assert!(matches!(
            decoder.next(),
            Some(Err(Error::UnexpectedDataByte { byte: 62, offset: 3 }))
        ));
    }

    #[test]
    fn test_wire_bytes_decode_back() {
        let sysex = Event::sysex(0xF0, vec![0x7E, 0x00, 0xF7]);
        let mut wire = Vec::new();
        sysex.write_wire_bytes(&mut wire);
        let decoded = decode_events(&wire).next().unwrap().unwrap();
        assert_eq!(decoded, sysex);
    }

    #[test]
    fn test_escaped_sysex_block_decodes_back() {
        let escaped = Event::sysex(0xF7, vec![0x43, 0x10, 0xF7]);
        let mut wire = Vec::new();
        escaped.write_wire_bytes(&mut wire);
        assert_eq!(wire, vec![0xF7, 0x43, 0x10, 0xF7]);

        let mut bytes = wire.clone();
        bytes.extend_from_slice(&[0x90, 60, 100]);
        let events: Vec<Event> = decode_events(&bytes).collect::<Result<_>>().unwrap();
        assert_eq!(events, vec![escaped, Event::note_on(0, 60, 100)]);
    }
}
