//! Error types for MIDI file parsing and playback

/// Result type for sequencer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while reading a Standard MIDI File.
///
/// Every variant carries the byte offset (from the start of the stream) at
/// which the problem was detected. A parse never recovers from any of these.
#[derive(thiserror::Error, Debug)]
pub enum ParseError {
    /// A chunk did not start with the expected four-byte tag.
    #[error("{expected} is expected (at {offset})")]
    MissingMagic {
        /// The chunk tag that was expected (`MThd` or `MTrk`).
        expected: &'static str,
        /// Offset of the first byte of the tag.
        offset: u64,
    },

    /// The header chunk declared a length other than 6.
    #[error("unexpected header size {length}, should be 6 (at {offset})")]
    InvalidHeaderLength {
        /// Declared header length.
        length: u32,
        /// Offset just after the length field.
        offset: u64,
    },

    /// The stream ended in the middle of a structure.
    #[error("insufficient stream, failed to read a byte (at {offset})")]
    UnexpectedEof {
        /// Offset at which the missing byte was expected.
        offset: u64,
    },

    /// A track body did not consume exactly the declared chunk length.
    #[error("track size mismatch: declared {declared} bytes, consumed {actual} (at {offset})")]
    SizeMismatch {
        /// Length declared in the `MTrk` chunk header.
        declared: u32,
        /// Bytes actually consumed by the track's messages.
        actual: u64,
        /// Offset at the end of the last message of the track.
        offset: u64,
    },

    /// A variable-length quantity used more than four bytes.
    #[error("variable-length quantity exceeds the 4-byte limitation (at {offset})")]
    MalformedDeltaTime {
        /// Offset just after the fourth byte of the quantity.
        offset: u64,
    },

    /// A data byte appeared before any channel status byte was seen.
    #[error("data byte without running status (at {offset})")]
    MissingRunningStatus {
        /// Offset of the orphan data byte.
        offset: u64,
    },

    /// The underlying reader failed for a reason other than end of stream.
    #[error("I/O error at {offset}: {source}")]
    Io {
        /// Offset at which the read was attempted.
        offset: u64,
        /// The reader's error.
        #[source]
        source: std::io::Error,
    },
}

impl ParseError {
    /// Byte offset at which the error was raised.
    pub fn offset(&self) -> u64 {
        match self {
            ParseError::MissingMagic { offset, .. }
            | ParseError::InvalidHeaderLength { offset, .. }
            | ParseError::UnexpectedEof { offset }
            | ParseError::SizeMismatch { offset, .. }
            | ParseError::MalformedDeltaTime { offset }
            | ParseError::MissingRunningStatus { offset }
            | ParseError::Io { offset, .. } => *offset,
        }
    }
}

/// Errors raised when a sequence cannot be scheduled at all.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstructionError {
    /// SMPTE (negative) divisions are not supported for playback or timing.
    #[error("SMPTE-based delta time (division {division}) is not supported")]
    UnsupportedTimeFormat {
        /// The raw division value from the file header.
        division: i16,
    },
}

/// Error type for sequencer operations
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Error while parsing the file format
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// The sequence cannot be scheduled
    #[error("Construction error: {0}")]
    Construction(#[from] ConstructionError),

    /// Tempo ratio must be a finite, strictly positive multiplier
    #[error("invalid tempo ratio {ratio}")]
    InvalidTempoRatio {
        /// The rejected ratio.
        ratio: f64,
    },

    /// A virtual clock can only be advanced forward
    #[error("cannot advance a virtual clock by {ms} ms")]
    NegativeAdvance {
        /// The rejected amount.
        ms: i64,
    },

    /// A flat byte buffer ended before a message's data bytes
    #[error("incomplete MIDI message for status {status:#04X} at offset {offset}")]
    IncompleteMessage {
        /// Status byte of the truncated message.
        status: u8,
        /// Offset of the status byte inside the buffer.
        offset: usize,
    },

    /// A flat byte buffer contained a data byte where a status byte belongs
    #[error("unexpected data byte {byte:#04X} at offset {offset}")]
    UnexpectedDataByte {
        /// The offending byte.
        byte: u8,
        /// Its offset inside the buffer.
        offset: usize,
    },

    /// The run-loop was started while another run was in progress
    #[error("the event loop is already running")]
    AlreadyRunning,

    /// The background playback thread panicked
    #[error("the playback thread panicked")]
    PlaybackThreadPanicked,

    /// Output port failure
    #[error("Output error: {0}")]
    Output(String),

    /// IO error from the filesystem
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
