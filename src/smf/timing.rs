//! Tick and wall-clock conversions
//!
//! All math is done in `f64`; values are truncated to whole milliseconds
//! only at the public boundary.

use crate::error::ConstructionError;
use crate::event::{Message, MetaType, DEFAULT_TEMPO};

/// Ticks per quarter note for a header division.
///
/// Negative (SMPTE) and zero divisions cannot be scheduled.
pub fn ticks_per_quarter(division: i16) -> Result<u16, ConstructionError> {
    if division <= 0 {
        return Err(ConstructionError::UnsupportedTimeFormat { division });
    }
    Ok(division as u16)
}

/// Milliseconds spanned by `delta` ticks at `tempo` microseconds per quarter
/// note, scaled by a playback speed `ratio`.
pub fn ticks_to_ms(tempo: u32, delta: u64, ticks_per_quarter: u16, ratio: f64) -> f64 {
    f64::from(tempo) / 1000.0 * delta as f64 / f64::from(ticks_per_quarter) / ratio
}

/// Sum of delta times.
pub fn total_ticks(messages: &[Message]) -> u64 {
    messages.iter().map(|m| u64::from(m.delta_time)).sum()
}

/// Wall-clock position of `ticks` in a single delta-timed stream, following
/// every tempo change on the way.
pub fn play_time_ms_at_tick(
    messages: &[Message],
    division: i16,
    ticks: u64,
) -> Result<u64, ConstructionError> {
    let tpq = ticks_per_quarter(division)?;
    let mut tempo = DEFAULT_TEMPO;
    let mut elapsed_ticks = 0u64;
    let mut ms = 0.0;

    for message in messages {
        let delta = u64::from(message.delta_time);
        if elapsed_ticks + delta >= ticks {
            ms += ticks_to_ms(tempo, ticks.saturating_sub(elapsed_ticks), tpq, 1.0);
            return Ok(ms as u64);
        }
        ms += ticks_to_ms(tempo, delta, tpq, 1.0);
        elapsed_ticks += delta;
        if let Some(value) = message.event.tempo_value() {
            tempo = value;
        }
    }

    // Past the end: the remainder runs at the last tempo.
    ms += ticks_to_ms(tempo, ticks - elapsed_ticks, tpq, 1.0);
    Ok(ms as u64)
}

/// Length of a single delta-timed stream in milliseconds.
pub fn total_play_time_ms(messages: &[Message], division: i16) -> Result<u64, ConstructionError> {
    play_time_ms_at_tick(messages, division, total_ticks(messages))
}

/// Meta events of one type, each tagged with its absolute tick.
pub fn meta_events_of_type(messages: &[Message], meta_type: MetaType) -> Vec<(u64, Message)> {
    let mut tick = 0u64;
    let mut found = Vec::new();
    for message in messages {
        tick += u64::from(message.delta_time);
        if message.event.is_meta_of(meta_type) {
            found.push((tick, message.clone()));
        }
    }
    found
}
