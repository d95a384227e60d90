//! Integration tests for reading Standard MIDI Files
//!
//! Files are assembled byte by byte so every chunk length and offset is
//! known to the test.

use smfseq::event::MetaType;
use smfseq::smf::{self, vlq};
use smfseq::{Event, Message, ParseError, Sequence};
use std::io::Write;

/// Assemble a file from a header and raw track bodies
fn smf_bytes(format: u16, division: i16, tracks: &[Vec<u8>]) -> Vec<u8> {
    let mut bytes = b"MThd".to_vec();
    bytes.extend_from_slice(&6u32.to_be_bytes());
    bytes.extend_from_slice(&format.to_be_bytes());
    bytes.extend_from_slice(&(tracks.len() as u16).to_be_bytes());
    bytes.extend_from_slice(&division.to_be_bytes());
    for body in tracks {
        bytes.extend_from_slice(b"MTrk");
        bytes.extend_from_slice(&(body.len() as u32).to_be_bytes());
        bytes.extend_from_slice(body);
    }
    bytes
}

/// Encode `(delta, wire bytes)` pairs as a track body
fn track_body(events: &[(u32, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (delta, bytes) in events {
        body.extend(vlq::encode(*delta).unwrap());
        body.extend_from_slice(bytes);
    }
    body
}

fn merged(sequence: &Sequence) -> Vec<Message> {
    sequence.merged_messages()
}

#[test]
fn test_two_track_file_end_to_end() {
    let data = smf_bytes(
        1,
        480,
        &[
            track_body(&[(0, &[0x90, 60, 100]), (720, &[0x80, 60, 0])]),
            track_body(&[(240, &[0x91, 64, 100]), (240, &[0x81, 64, 0])]),
        ],
    );
    let sequence = smf::parse(&data).unwrap();
    assert_eq!(sequence.format(), 1);
    assert_eq!(sequence.tracks().len(), 2);

    let flat = smf::merge(sequence.clone());
    assert_eq!(flat.format(), 0);
    assert_eq!(flat.division(), 480);
    assert_eq!(
        merged(&flat),
        vec![
            Message::new(0, Event::note_on(0, 60, 100)),
            Message::new(240, Event::note_on(1, 64, 100)),
            Message::new(240, Event::note_off(1, 64, 0)),
            Message::new(240, Event::note_off(0, 60, 0)),
        ]
    );
    assert_eq!(flat.total_ticks(), 720);
    assert_eq!(sequence.total_ticks(), 720);
    assert_eq!(sequence.total_play_time_ms().unwrap(), 750);
}

#[test]
fn test_coincident_note_offs_keep_track_order() {
    let data = smf_bytes(
        1,
        480,
        &[
            track_body(&[(0, &[0x90, 60, 100]), (480, &[0x80, 60, 0])]),
            track_body(&[(240, &[0x91, 64, 100]), (240, &[0x81, 64, 0])]),
        ],
    );
    let sequence = smf::parse(&data).unwrap();
    assert_eq!(
        merged(&sequence),
        vec![
            Message::new(0, Event::note_on(0, 60, 100)),
            Message::new(240, Event::note_on(1, 64, 100)),
            Message::new(240, Event::note_off(0, 60, 0)),
            Message::new(0, Event::note_off(1, 64, 0)),
        ]
    );
    assert_eq!(sequence.total_ticks(), 480);
}

#[test]
fn test_running_status_and_long_deltas() {
    let data = smf_bytes(
        0,
        96,
        &[track_body(&[
            (0, &[0xB0, 7, 100]),
            (0x3FFF, &[10, 64]),
            (0x20_0000, &[0xFF, 0x2F, 0x00]),
        ])],
    );
    let sequence = smf::parse(&data).unwrap();
    let messages = sequence.tracks()[0].messages();
    assert_eq!(messages[1], Message::new(0x3FFF, Event::control_change(0, 10, 64)));
    assert_eq!(messages[2].delta_time, 0x20_0000);
    assert!(messages[2].event.is_meta_of(MetaType::EndOfTrack));
    assert_eq!(sequence.total_ticks(), 0x3FFF + 0x20_0000);
}

#[test]
fn test_tempo_map_queries() {
    let data = smf_bytes(
        1,
        480,
        &[
            track_body(&[
                (0, &[0xFF, 0x51, 0x03, 0x07, 0xA1, 0x20]),
                (960, &[0xFF, 0x51, 0x03, 0x03, 0xD0, 0x90]),
            ]),
            track_body(&[(1920, &[0x90, 60, 1])]),
        ],
    );
    let sequence = smf::parse(&data).unwrap();
    // 960 ticks at 500000 = 1000 ms, then 960 ticks at 250000 = 500 ms.
    assert_eq!(sequence.total_play_time_ms().unwrap(), 1500);
    assert_eq!(sequence.play_time_ms_at_tick(480).unwrap(), 500);
    assert_eq!(sequence.play_time_ms_at_tick(1440).unwrap(), 1250);

    let tempos = sequence.meta_events_of_type(MetaType::Tempo);
    let ticks: Vec<u64> = tempos.iter().map(|(tick, _)| *tick).collect();
    assert_eq!(ticks, vec![0, 960]);
    assert_eq!(tempos[1].1.event.tempo_value(), Some(250_000));
}

#[test]
fn test_smpte_division_parses_but_cannot_be_timed() {
    let data = smf_bytes(0, -7688, &[track_body(&[(10, &[0x90, 60, 1])])]);
    let sequence = smf::parse(&data).unwrap();
    assert_eq!(sequence.division(), -7688);
    assert!(sequence.total_play_time_ms().is_err());
    assert_eq!(sequence.total_ticks(), 10);
}

#[test]
fn test_error_offsets() {
    let mut data = smf_bytes(0, 96, &[track_body(&[(0, &[0x90, 60, 1])])]);
    data.truncate(data.len() - 1);
    let err = smf::parse(&data).unwrap_err();
    assert!(matches!(err, ParseError::UnexpectedEof { .. }));
    assert_eq!(err.offset(), data.len() as u64);

    let err = smf::parse(b"MThx").unwrap_err();
    assert_eq!(err.offset(), 0);
    assert!(err.to_string().contains("MThd"));
}

#[test]
fn test_load_from_file() {
    let data = smf_bytes(
        0,
        120,
        &[track_body(&[(0, &[0xC0, 12]), (120, &[0x90, 64, 90])])],
    );
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&data).unwrap();
    file.flush().unwrap();

    let sequence = smf::load_file(file.path()).unwrap();
    assert_eq!(sequence.division(), 120);
    assert_eq!(
        sequence.tracks()[0].messages()[0].event,
        Event::program_change(0, 12)
    );
    assert_eq!(sequence.total_play_time_ms().unwrap(), 500);
}

#[test]
fn test_read_from_generic_reader() {
    let data = smf_bytes(0, 96, &[track_body(&[(0, &[0xF8])])]);
    let sequence = smf::read(std::io::Cursor::new(data)).unwrap();
    assert_eq!(sequence.tracks()[0].messages()[0].event.status_byte(), 0xF8);
}
