//! Track merging
//!
//! Flattens a multi-track sequence into a single delta-timed stream.

use super::{Sequence, Track};
use crate::event::Message;
use std::ops::Range;

/// Merge every track of `sequence` into one format-0 track.
///
/// Format-0 input is returned unchanged.
pub fn merge(sequence: Sequence) -> Sequence {
    if sequence.format() == 0 {
        return sequence;
    }
    merge_ref(&sequence)
}

/// Borrowing form of [`merge`]. Format-0 input is cloned.
pub fn merge_ref(sequence: &Sequence) -> Sequence {
    if sequence.format() == 0 {
        return sequence.clone();
    }

    let timed = absolute_messages(sequence);
    if timed.is_empty() {
        return Sequence::new(0, sequence.division());
    }

    let mut runs = tick_runs(&timed);
    // Stable: runs sharing a tick keep their first-seen order.
    runs.sort_by_key(|run| timed[run.start].0);

    let mut track = Track::with_capacity(timed.len());
    let mut previous_tick = 0u64;
    for run in runs {
        for (tick, message) in &timed[run] {
            let event = message.event.clone();
            if event.is_sentinel() {
                track.push(Message::new(0, event));
                continue;
            }
            let delta = saturate(tick - previous_tick);
            previous_tick = *tick;
            track.push(Message::new(delta, event));
        }
    }

    log::debug!(
        "merged {} tracks into {} messages",
        sequence.tracks().len(),
        track.len()
    );

    let mut merged = Sequence::new(0, sequence.division());
    merged.push_track(track);
    merged
}

/// Every message of every track tagged with its track-local absolute tick,
/// tracks concatenated in order.
fn absolute_messages(sequence: &Sequence) -> Vec<(u64, &Message)> {
    let mut timed = Vec::new();
    for track in sequence.tracks() {
        let mut tick = 0u64;
        for message in track.messages() {
            tick += u64::from(message.delta_time);
            timed.push((tick, message));
        }
    }
    timed
}

/// Split into maximal contiguous runs of equal tick.
fn tick_runs(timed: &[(u64, &Message)]) -> Vec<Range<usize>> {
    let mut runs = Vec::new();
    let mut start = 0;
    for i in 1..=timed.len() {
        if i == timed.len() || timed[i].0 != timed[start].0 {
            runs.push(start..i);
            start = i;
        }
    }
    runs
}

fn saturate(delta: u64) -> u32 {
    u32::try_from(delta).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;

    fn track(messages: Vec<Message>) -> Track {
        Track::from(messages)
    }

    fn two_track(a: Vec<Message>, b: Vec<Message>) -> Sequence {
        let mut seq = Sequence::new(1, 480);
        seq.push_track(track(a));
        seq.push_track(track(b));
        seq
    }

    fn merged_messages(seq: &Sequence) -> Vec<Message> {
        seq.tracks()[0].messages().to_vec()
    }

    #[test]
    fn test_format_zero_is_untouched() {
        let mut seq = Sequence::new(0, 96);
        seq.push_track(track(vec![Message::new(5, Event::note_on(0, 60, 1))]));
        seq.push_track(track(vec![Message::new(7, Event::note_on(0, 61, 1))]));
        assert_eq!(merge(seq.clone()), seq);
    }

    #[test]
    fn test_interleaves_by_absolute_tick() {
        let seq = two_track(
            vec![
                Message::new(0, Event::note_on(0, 60, 100)),
                Message::new(720, Event::note_off(0, 60, 0)),
            ],
            vec![
                Message::new(240, Event::note_on(1, 64, 100)),
                Message::new(240, Event::note_off(1, 64, 0)),
            ],
        );
        let merged = merge(seq);
        assert_eq!(merged.format(), 0);
        assert_eq!(merged.division(), 480);
        assert_eq!(
            merged_messages(&merged),
            vec![
                Message::new(0, Event::note_on(0, 60, 100)),
                Message::new(240, Event::note_on(1, 64, 100)),
                Message::new(240, Event::note_off(1, 64, 0)),
                Message::new(240, Event::note_off(0, 60, 0)),
            ]
        );
        assert_eq!(merged.total_ticks(), 720);
    }

    #[test]
    fn test_coincident_events_keep_track_order() {
        let seq = two_track(
            vec![
                Message::new(0, Event::note_on(0, 60, 100)),
                Message::new(0, Event::note_on(0, 64, 100)),
            ],
            vec![Message::new(0, Event::note_on(0, 67, 100))],
        );
        let keys: Vec<u8> = merged_messages(&merge(seq))
            .iter()
            .map(|m| m.event.data1())
            .collect();
        assert_eq!(keys, vec![60, 64, 67]);
    }

    #[test]
    fn test_same_tick_later_track_follows_earlier_track() {
        let seq = two_track(
            vec![
                Message::new(100, Event::program_change(0, 1)),
                Message::new(0, Event::note_on(0, 60, 1)),
            ],
            vec![
                Message::new(50, Event::program_change(1, 2)),
                Message::new(50, Event::note_on(1, 62, 1)),
            ],
        );
        let merged = merged_messages(&merge(seq));
        assert_eq!(
            merged,
            vec![
                Message::new(50, Event::program_change(1, 2)),
                Message::new(50, Event::program_change(0, 1)),
                Message::new(0, Event::note_on(0, 60, 1)),
                Message::new(0, Event::note_on(1, 62, 1)),
            ]
        );
    }

    #[test]
    fn test_merge_is_idempotent() {
        let seq = two_track(
            vec![
                Message::new(10, Event::note_on(0, 60, 1)),
                Message::new(30, Event::note_off(0, 60, 0)),
            ],
            vec![Message::new(20, Event::tempo(400_000))],
        );
        let once = merge(seq);
        let twice = merge(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_empty_input() {
        let merged = merge(Sequence::new(1, 240));
        assert_eq!(merged.format(), 0);
        assert_eq!(merged.division(), 240);
        assert!(merged.tracks().is_empty());

        let mut empty_tracks = Sequence::new(1, 240);
        empty_tracks.push_track(Track::new());
        assert!(merge(empty_tracks).tracks().is_empty());
    }

    #[test]
    fn test_sentinel_does_not_reset_delta_origin() {
        let seq = two_track(
            vec![
                Message::new(10, Event::note_on(0, 60, 1)),
                Message::new(30, Event::note_off(0, 60, 0)),
            ],
            vec![Message::new(20, Event::sentinel())],
        );
        let merged = merged_messages(&merge(seq));
        assert_eq!(merged[1], Message::new(0, Event::sentinel()));
        assert_eq!(merged[2].delta_time, 30);
    }

    #[test]
    fn test_preserves_total_duration() {
        let seq = two_track(
            vec![Message::new(960, Event::note_on(0, 60, 1))],
            vec![
                Message::new(100, Event::note_on(1, 60, 1)),
                Message::new(1000, Event::note_off(1, 60, 0)),
            ],
        );
        assert_eq!(merge(seq).total_ticks(), 1100);
    }
}
