//! Seek filters
//!
//! A seek rewinds the scheduler to the start of the stream and replays it
//! without waiting, asking a filter about every message until the filter
//! terminates. Whatever the filter passes is delivered; blocked messages are
//! skipped.

use crate::event::Message;

/// Decision of a seek filter for one message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekAction {
    /// Deliver the message and keep filtering
    Pass,
    /// Drop the message and keep filtering
    Block,
    /// Deliver the message and resume normal playback
    PassAndTerminate,
    /// Drop the message and resume normal playback
    BlockAndTerminate,
}

impl SeekAction {
    /// Whether the message is delivered
    pub fn passes(self) -> bool {
        matches!(self, SeekAction::Pass | SeekAction::PassAndTerminate)
    }

    /// Whether filtering ends with this message
    pub fn terminates(self) -> bool {
        matches!(
            self,
            SeekAction::PassAndTerminate | SeekAction::BlockAndTerminate
        )
    }
}

/// Stateful filter consulted for every message while a seek is in progress
pub type SeekFilter = Box<dyn FnMut(&Message) -> SeekAction + Send>;

/// Default seek filter.
///
/// Drops Note On/Off messages that lie before `target_ticks` and passes
/// everything else, so programs and controllers are restored without
/// sounding past notes. The first message at or beyond the target is passed
/// and ends the seek.
pub fn skip_notes_until(target_ticks: u64) -> SeekFilter {
    let mut position = 0u64;
    Box::new(move |message: &Message| {
        position += u64::from(message.delta_time);
        if position >= target_ticks {
            SeekAction::PassAndTerminate
        } else if message.event.is_note() {
            SeekAction::Block
        } else {
            SeekAction::Pass
        }
    })
}
