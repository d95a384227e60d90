//! Standard MIDI File model and reader
//!
//! A [`Sequence`] holds the header fields of a file plus its [`Track`]s.
//! Sequences are built once by [`SmfReader`] and read-only afterwards; the
//! merger produces a new sequence rather than editing one in place.

pub mod merge;
pub mod reader;
pub mod timing;
pub mod vlq;

pub use merge::{merge, merge_ref};
pub use reader::SmfReader;

use crate::error::{ConstructionError, ParseError, Result};
use crate::event::{Message, MetaType};
use std::borrow::Cow;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Ordered, append-only list of messages
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Track {
    messages: Vec<Message>,
}

impl Track {
    /// Empty track
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty track with room for `capacity` messages
    pub fn with_capacity(capacity: usize) -> Self {
        Track {
            messages: Vec::with_capacity(capacity),
        }
    }

    /// Append a message
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Messages in file order
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of messages
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// True when the track holds no messages
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Duration in ticks
    pub fn total_ticks(&self) -> u64 {
        timing::total_ticks(&self.messages)
    }
}

impl From<Vec<Message>> for Track {
    fn from(messages: Vec<Message>) -> Self {
        Track { messages }
    }
}

/// A parsed MIDI file.
///
/// `format` 0 means one already-merged track, 1 means simultaneous tracks and
/// 2 means independent tracks. A non-negative `division` is ticks per quarter
/// note; negative values encode SMPTE timing, which parses fine but cannot be
/// played or timed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    format: u16,
    division: i16,
    tracks: Vec<Track>,
}

impl Sequence {
    /// Empty sequence with the given header fields
    pub fn new(format: u16, division: i16) -> Self {
        Sequence {
            format,
            division,
            tracks: Vec::new(),
        }
    }

    /// Append a track
    pub fn push_track(&mut self, track: Track) {
        self.tracks.push(track);
    }

    /// File format (0, 1 or 2)
    pub fn format(&self) -> u16 {
        self.format
    }

    /// Raw time division
    pub fn division(&self) -> i16 {
        self.division
    }

    /// Tracks in file order
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// This sequence as a single stream: borrowed when already format 0,
    /// merged otherwise.
    pub fn merged(&self) -> Cow<'_, Sequence> {
        if self.format == 0 {
            Cow::Borrowed(self)
        } else {
            Cow::Owned(merge_ref(self))
        }
    }

    /// The flattened message stream (the first track after merging).
    pub fn merged_messages(&self) -> Vec<Message> {
        self.merged()
            .tracks
            .first()
            .map(|track| track.messages.clone())
            .unwrap_or_default()
    }

    /// Duration in ticks
    pub fn total_ticks(&self) -> u64 {
        self.with_stream(timing::total_ticks)
    }

    /// Duration in milliseconds, following tempo changes
    pub fn total_play_time_ms(&self) -> std::result::Result<u64, ConstructionError> {
        let division = self.division;
        self.with_stream(|messages| timing::total_play_time_ms(messages, division))
    }

    /// Wall-clock position of an absolute tick, in milliseconds
    pub fn play_time_ms_at_tick(&self, ticks: u64) -> std::result::Result<u64, ConstructionError> {
        let division = self.division;
        self.with_stream(|messages| timing::play_time_ms_at_tick(messages, division, ticks))
    }

    /// Meta events of one type with their absolute ticks
    pub fn meta_events_of_type(&self, meta_type: MetaType) -> Vec<(u64, Message)> {
        self.with_stream(|messages| timing::meta_events_of_type(messages, meta_type))
    }

    fn with_stream<T>(&self, f: impl FnOnce(&[Message]) -> T) -> T {
        let merged = self.merged();
        let messages = merged
            .tracks
            .first()
            .map(|track| track.messages())
            .unwrap_or(&[]);
        f(messages)
    }
}

/// Parse a sequence from an in-memory file image.
pub fn parse(bytes: &[u8]) -> std::result::Result<Sequence, ParseError> {
    SmfReader::new(bytes).read_sequence()
}

/// Parse a sequence from any byte stream.
pub fn read<R: Read>(reader: R) -> std::result::Result<Sequence, ParseError> {
    SmfReader::new(reader).read_sequence()
}

/// Load and parse a `.mid` file.
pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Sequence> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let sequence = read(BufReader::new(file))?;
    log::debug!("loaded {}", path.display());
    Ok(sequence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;

    #[test]
    fn test_track_append_and_duration() {
        let mut track = Track::new();
        assert!(track.is_empty());
        track.push(Message::new(10, Event::note_on(0, 60, 1)));
        track.push(Message::new(20, Event::note_off(0, 60, 0)));
        assert_eq!(track.len(), 2);
        assert_eq!(track.total_ticks(), 30);
    }

    #[test]
    fn test_queries_merge_multitrack_input() {
        let mut seq = Sequence::new(1, 480);
        seq.push_track(Track::from(vec![Message::new(960, Event::tempo(250_000))]));
        seq.push_track(Track::from(vec![Message::new(480, Event::tempo(1_000_000))]));
        assert_eq!(seq.total_ticks(), 960);
        // 480 ticks at 500000, then 480 at 1000000.
        assert_eq!(seq.total_play_time_ms().unwrap(), 1500);
        assert_eq!(seq.meta_events_of_type(MetaType::Tempo).len(), 2);
    }

    #[test]
    fn test_merged_borrows_format_zero() {
        let mut seq = Sequence::new(0, 96);
        seq.push_track(Track::from(vec![Message::new(1, Event::note_on(0, 60, 1))]));
        assert!(matches!(seq.merged(), Cow::Borrowed(_)));
        assert_eq!(seq.merged_messages().len(), 1);
    }

    #[test]
    fn test_empty_sequence_queries() {
        let seq = Sequence::new(1, 96);
        assert_eq!(seq.total_ticks(), 0);
        assert_eq!(seq.total_play_time_ms().unwrap(), 0);
        assert!(seq.merged_messages().is_empty());
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_file("/nonexistent/definitely/missing.mid").unwrap_err();
        assert!(matches!(err, crate::Error::Io(_)));
    }
}
