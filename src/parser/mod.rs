//! Binary sequence decoding.
//!
//! A sequence is a fixed header followed by a MIDI-style event stream
//! (delta-time VLQ, status byte, payload) terminated by an end-of-track meta
//! event. Only note on/off, program change and end of track are kept; every
//! other event is consumed to stay aligned and then dropped.

mod header;
pub(crate) mod reader;

pub use header::SequenceHeader;
pub use reader::ByteReader;

use crate::events::{Channel, Event, EventKind, EventList};
use crate::timing::Sequence;
use crate::{Error, Result};

const META: u8 = 0xFF;
const META_END_OF_TRACK: u8 = 0x2F;
const META_TEMPO: u8 = 0x51;

const NOTE_OFF: u8 = 0x8;
const NOTE_ON: u8 = 0x9;
const POLY_PRESSURE: u8 = 0xA;
const CONTROLLER: u8 = 0xB;
const PROGRAM_CHANGE: u8 = 0xC;
const CHANNEL_PRESSURE: u8 = 0xD;
const PITCH_BEND: u8 = 0xE;
const SYSEX: u8 = 0xF;

/// Decode a complete sequence.
pub fn parse_sequence(data: &[u8]) -> Result<Sequence> {
    let mut reader = ByteReader::new(data);
    let header = SequenceHeader::read(&mut reader)?;
    let events = parse_events(&mut reader)?;

    tracing::debug!(
        events = events.len(),
        tempo = header.tempo,
        bars = header.time_signature_bars,
        "parsed sequence"
    );

    Ok(Sequence::new(header, events))
}

/// Decode the event stream up to and including end of track.
pub fn parse_events(reader: &mut ByteReader<'_>) -> Result<EventList> {
    let mut events = EventList::new();
    let mut running_status: Option<u8> = None;
    let mut time: u32 = 0;

    loop {
        time = time.wrapping_add(reader.read_var_len()?);

        let byte = reader.read_u8()?;
        let status = if byte < 0x80 {
            let status = running_status.ok_or(Error::MissingRunningStatus {
                byte,
                offset: reader.position() - 1,
            })?;
            reader.rewind_one();
            status
        } else {
            running_status = Some(byte);
            byte
        };

        if status == META {
            let command = reader.read_u8()?;
            let length = reader.read_u8()?;
            match command {
                META_END_OF_TRACK => {
                    events.push(Event::new(time, EventKind::EndOfTrack));
                    return Ok(events);
                }
                META_TEMPO => {
                    // Playback always runs at the header tempo.
                    let tempo = reader.read_bytes::<3>()?;
                    tracing::debug!(?tempo, time, "ignoring tempo change");
                }
                _ => {
                    tracing::trace!(command, length, "skipping meta event");
                    reader.skip(length as usize)?;
                }
            }
            continue;
        }

        let channel = Channel::from_status(status);
        match status >> 4 {
            NOTE_ON => {
                let note = reader.read_u8()?;
                let velocity = reader.read_u8()?;
                let kind = if velocity == 0 {
                    EventKind::NoteOff {
                        channel,
                        note,
                        velocity,
                    }
                } else {
                    EventKind::NoteOn {
                        channel,
                        note,
                        velocity,
                    }
                };
                events.push(Event::new(time, kind));
            }
            NOTE_OFF => {
                let note = reader.read_u8()?;
                let velocity = reader.read_u8()?;
                let kind = EventKind::NoteOff {
                    channel,
                    note,
                    velocity,
                };
                events.push(Event::new(time, kind));
            }
            PROGRAM_CHANGE => {
                let program = reader.read_u8()?;
                let kind = EventKind::ProgramChange { channel, program };
                events.push(Event::new(time, kind));
            }
            POLY_PRESSURE | CONTROLLER | PITCH_BEND => reader.skip(2)?,
            CHANNEL_PRESSURE => reader.skip(1)?,
            SYSEX => {
                let length = reader.read_var_len()?;
                reader.skip(length as usize)?;
            }
            _ => {
                return Err(Error::UnrecognizedCommand {
                    status,
                    offset: reader.position() - 1,
                });
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Header with the given tempo and bar count, 480 ticks per quarter.
    pub(crate) fn header_bytes(tempo: u32, bars: u8) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(SequenceHeader::SIZE);
        bytes.extend_from_slice(b"SEQp");
        bytes.extend_from_slice(&1u32.to_be_bytes());
        bytes.extend_from_slice(&480u16.to_be_bytes());
        bytes.extend_from_slice(&tempo.to_be_bytes()[1..]);
        bytes.push(bars);
        bytes.push(4);
        bytes
    }

    pub(crate) fn sequence_bytes(tempo: u32, bars: u8, stream: &[u8]) -> Vec<u8> {
        let mut bytes = header_bytes(tempo, bars);
        bytes.extend_from_slice(stream);
        bytes
    }

    fn note_on(channel: u8, note: u8, velocity: u8) -> EventKind {
        EventKind::NoteOn {
            channel: Channel::new(channel).unwrap(),
            note,
            velocity,
        }
    }

    fn note_off(channel: u8, note: u8, velocity: u8) -> EventKind {
        EventKind::NoteOff {
            channel: Channel::new(channel).unwrap(),
            note,
            velocity,
        }
    }

    fn program_change(channel: u8, program: u8) -> EventKind {
        EventKind::ProgramChange {
            channel: Channel::new(channel).unwrap(),
            program,
        }
    }

    #[test]
    fn test_single_note_sequence() {
        // delta 0 note on, delta 480 (0x83 0x60) end of track
        let data = sequence_bytes(
            500_000,
            4,
            &[0x00, 0x90, 60, 100, 0x83, 0x60, 0xFF, 0x2F, 0x00],
        );
        let sequence = parse_sequence(&data).unwrap();

        assert_eq!(sequence.tempo_ratio(), 120.0);
        assert_eq!(
            sequence.events(),
            &[
                Event::new(0, note_on(0, 60, 100)),
                Event::new(480, EventKind::EndOfTrack),
            ]
        );
    }

    #[test]
    fn test_running_status_repeats_note_on() {
        let data = sequence_bytes(
            500_000,
            4,
            &[0x00, 0x93, 60, 100, 0x10, 64, 90, 0x00, 0xFF, 0x2F, 0x00],
        );
        let sequence = parse_sequence(&data).unwrap();

        assert_eq!(sequence.events()[1], Event::new(16, note_on(3, 64, 90)));
    }

    #[test]
    fn test_zero_velocity_note_on_is_note_off() {
        let data = sequence_bytes(500_000, 4, &[0x00, 0x95, 72, 0, 0x00, 0xFF, 0x2F, 0x00]);
        let sequence = parse_sequence(&data).unwrap();

        assert_eq!(sequence.events()[0].kind, note_off(5, 72, 0));
    }

    #[test]
    fn test_program_change_and_note_off() {
        let data = sequence_bytes(
            500_000,
            4,
            &[0x00, 0xC2, 17, 0x0A, 0x82, 40, 64, 0x00, 0xFF, 0x2F, 0x00],
        );
        let sequence = parse_sequence(&data).unwrap();

        assert_eq!(
            sequence.events(),
            &[
                Event::new(0, program_change(2, 17)),
                Event::new(10, note_off(2, 40, 64)),
                Event::new(10, EventKind::EndOfTrack),
            ]
        );
    }

    #[test]
    fn test_ignored_events_keep_stream_aligned() {
        let stream = [
            0x00, 0xA0, 60, 30, // poly pressure
            0x00, 0xB0, 7, 100, // controller
            0x00, 0xD0, 20, // channel pressure
            0x00, 0xE0, 0x00, 0x40, // pitch bend
            0x00, 0xF0, 0x03, 0x7E, 0x7F, 0xF7, // sysex
            0x00, 0xFF, 0x51, 0x03, 0x07, 0xA1, 0x20, // tempo change
            0x00, 0xFF, 0x03, 0x04, b'l', b'e', b'a', b'd', // track name
            0x05, 0x91, 48, 80, //
            0x00, 0xFF, 0x2F, 0x00,
        ];
        let sequence = parse_sequence(&sequence_bytes(500_000, 4, &stream)).unwrap();

        assert_eq!(
            sequence.events(),
            &[
                Event::new(5, note_on(1, 48, 80)),
                Event::new(5, EventKind::EndOfTrack),
            ]
        );
    }

    #[test]
    fn test_top_level_0x50_fails() {
        // 0x50 is below 0x80, so with nothing to run on it cannot start an event
        let data = sequence_bytes(500_000, 4, &[0x00, 0x50, 0x00, 0x00, 0xFF, 0x2F, 0x00]);
        assert!(matches!(
            parse_sequence(&data),
            Err(Error::MissingRunningStatus {
                byte: 0x50,
                offset: 16,
            })
        ));
    }

    #[test]
    fn test_data_byte_without_running_status_fails() {
        let data = sequence_bytes(500_000, 4, &[0x00, 0x3C, 0x40]);
        assert!(matches!(
            parse_sequence(&data),
            Err(Error::MissingRunningStatus {
                byte: 0x3C,
                offset: 16,
            })
        ));
    }

    #[test]
    fn test_truncated_stream_fails() {
        let data = sequence_bytes(500_000, 4, &[0x00, 0x90, 60]);
        assert!(matches!(parse_sequence(&data), Err(Error::UnexpectedEof { .. })));
    }

    #[test]
    fn test_times_accumulate() {
        let data = sequence_bytes(
            500_000,
            4,
            &[
                0x00, 0x90, 60, 100, 0x60, 0x80, 60, 0, 0x60, 0x90, 62, 100, 0x81, 0x00, 0xFF,
                0x2F, 0x00,
            ],
        );
        let times: Vec<u32> = parse_sequence(&data)
            .unwrap()
            .events()
            .iter()
            .map(|e| e.time)
            .collect();
        assert_eq!(times, vec![0, 96, 192, 320]);
    }
}
