//! Streaming Standard MIDI File reader
//!
//! Single forward pass over any [`Read`] source with at most one byte of
//! look-ahead (needed to detect running status). Every error reports the
//! absolute stream offset at which it was raised.

use super::{vlq, Sequence, Track};
use crate::error::ParseError;
use crate::event::{fixed_data_size, status, Event, Message};
use std::io::{ErrorKind, Read};
use std::sync::Arc;

type Result<T> = std::result::Result<T, ParseError>;

const HEADER_MAGIC: &[u8; 4] = b"MThd";
const TRACK_MAGIC: &[u8; 4] = b"MTrk";
const HEADER_LENGTH: u32 = 6;

/// Reads a [`Sequence`] from a byte stream.
///
/// Reading is byte-at-a-time; wrap files in a `BufReader`.
pub struct SmfReader<R> {
    inner: R,
    peeked: Option<u8>,
    /// Bytes consumed from the start of the stream
    position: u64,
    /// Bytes consumed inside the current track body
    track_consumed: u64,
    running_status: Option<u8>,
}

impl<R: Read> SmfReader<R> {
    /// Create a reader over `inner`
    pub fn new(inner: R) -> Self {
        SmfReader {
            inner,
            peeked: None,
            position: 0,
            track_consumed: 0,
            running_status: None,
        }
    }

    /// Parse the whole stream into a sequence
    pub fn read_sequence(mut self) -> Result<Sequence> {
        self.expect_magic(HEADER_MAGIC, "MThd")?;

        let length = self.read_u32()?;
        if length != HEADER_LENGTH {
            return Err(ParseError::InvalidHeaderLength {
                length,
                offset: self.position,
            });
        }

        let format = self.read_u16()?;
        let track_count = self.read_u16()?;
        let division = self.read_u16()? as i16;

        let mut sequence = Sequence::new(format, division);
        for _ in 0..track_count {
            let track = self.read_track()?;
            sequence.push_track(track);
        }

        log::debug!(
            "parsed SMF: format {}, {} tracks, division {}, {} bytes",
            format,
            track_count,
            division,
            self.position
        );
        Ok(sequence)
    }

    fn read_track(&mut self) -> Result<Track> {
        self.expect_magic(TRACK_MAGIC, "MTrk")?;
        let declared = self.read_u32()?;

        self.track_consumed = 0;
        self.running_status = None;

        let mut track = Track::new();
        while self.track_consumed < u64::from(declared) {
            let delta_time = self.read_vlq()?;
            let event = self.read_event()?;
            track.push(Message::new(delta_time, event));
        }

        if self.track_consumed != u64::from(declared) {
            return Err(ParseError::SizeMismatch {
                declared,
                actual: self.track_consumed,
                offset: self.position,
            });
        }

        log::trace!("track: {} messages, {} bytes", track.len(), declared);
        Ok(track)
    }

    fn read_event(&mut self) -> Result<Event> {
        let first = self.peek_byte()?;
        let status_byte = if first >= 0x80 {
            self.read_byte()?;
            self.running_status = Some(first);
            first
        } else {
            self.running_status
                .ok_or(ParseError::MissingRunningStatus {
                    offset: self.position,
                })?
        };

        match status_byte {
            status::SYSEX1 | status::SYSEX2 | status::META => {
                let meta_type = if status_byte == status::META {
                    self.read_byte()?
                } else {
                    0
                };
                let length = self.read_vlq()? as usize;
                let payload = self.read_payload(length)?;
                Ok(Event::with_extra(
                    status_byte,
                    meta_type,
                    Arc::from(payload),
                    0,
                    length,
                ))
            }
            _ => {
                let size = fixed_data_size(status_byte);
                let data1 = if size > 0 { self.read_byte()? } else { 0 };
                let data2 = if size > 1 { self.read_byte()? } else { 0 };
                Ok(Event::short(status_byte, data1, data2))
            }
        }
    }

    fn expect_magic(&mut self, magic: &[u8; 4], name: &'static str) -> Result<()> {
        let offset = self.position;
        for &expected in magic {
            if self.read_byte()? != expected {
                return Err(ParseError::MissingMagic {
                    expected: name,
                    offset,
                });
            }
        }
        Ok(())
    }

    fn read_vlq(&mut self) -> Result<u32> {
        vlq::read_with(|| self.read_byte())?.ok_or(ParseError::MalformedDeltaTime {
            offset: self.position,
        })
    }

    fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes([self.read_byte()?, self.read_byte()?]))
    }

    fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes([
            self.read_byte()?,
            self.read_byte()?,
            self.read_byte()?,
            self.read_byte()?,
        ]))
    }

    fn peek_byte(&mut self) -> Result<u8> {
        if let Some(byte) = self.peeked {
            return Ok(byte);
        }
        let byte = self.pull_byte()?;
        self.peeked = Some(byte);
        Ok(byte)
    }

    fn read_byte(&mut self) -> Result<u8> {
        let byte = match self.peeked.take() {
            Some(byte) => byte,
            None => self.pull_byte()?,
        };
        self.position += 1;
        self.track_consumed += 1;
        Ok(byte)
    }

    /// Read one byte from the source without accounting for it.
    fn pull_byte(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        loop {
            match self.inner.read(&mut buf) {
                Ok(0) => {
                    return Err(ParseError::UnexpectedEof {
                        offset: self.position,
                    })
                }
                Ok(_) => return Ok(buf[0]),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(source) => {
                    return Err(ParseError::Io {
                        offset: self.position,
                        source,
                    })
                }
            }
        }
    }

    fn read_payload(&mut self, length: usize) -> Result<Vec<u8>> {
        // Capacity grows with the data actually present so a corrupt length
        // cannot force a huge allocation.
        let mut payload = Vec::with_capacity(length.min(4096));
        if length > 0 {
            if let Some(byte) = self.peeked.take() {
                payload.push(byte);
            }
        }

        let wanted = (length - payload.len()) as u64;
        (&mut self.inner)
            .take(wanted)
            .read_to_end(&mut payload)
            .map_err(|source| ParseError::Io {
                offset: self.position,
                source,
            })?;

        self.position += payload.len() as u64;
        self.track_consumed += payload.len() as u64;

        if payload.len() < length {
            return Err(ParseError::UnexpectedEof {
                offset: self.position,
            });
        }
        Ok(payload)
    }
}
