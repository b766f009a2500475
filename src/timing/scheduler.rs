use super::Sequence;
use crate::audio::{AudioEngine, NoteLock, NoteTrigger, TrackId};
use crate::events::{Channel, EventKind};

/// Absolute engine samples a scheduled pass starts and ends at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledSpan {
    /// Sample of the first note on, or of the pass itself if there is none.
    pub begin: u64,
    /// Sample of the end-of-track event.
    pub finish: u64,
}

/// Hand every event of `sequence` to `engine` in one pass.
///
/// Each note carries its offset from `now` in samples; the engine does the
/// timing. The engine's note table stays locked for the whole pass. Events
/// after end of track are not looked at.
pub fn schedule_sequence_events<E: AudioEngine + ?Sized>(
    sequence: &Sequence,
    engine: &E,
    track: TrackId,
    now: u64,
) -> ScheduledSpan {
    let sample_rate = engine.sample_rate();
    let mut programs = [0u8; Channel::COUNT];
    let mut begin = None;
    let mut finish = now;

    let _lock = NoteLock::acquire(engine);

    for event in sequence.events() {
        let offset = sequence.ticks_to_samples(event.time, sample_rate);
        match event.kind {
            EventKind::NoteOn {
                channel,
                note,
                velocity,
            } => {
                engine.note_on(NoteTrigger {
                    channel,
                    program: programs[channel.index()],
                    note,
                    velocity,
                    track,
                    offset,
                });
                begin.get_or_insert(now + offset);
            }
            EventKind::NoteOff {
                channel,
                note,
                velocity,
            } => {
                engine.note_off_delayed(NoteTrigger {
                    channel,
                    program: programs[channel.index()],
                    note,
                    velocity,
                    track,
                    offset,
                });
            }
            EventKind::ProgramChange { channel, program } => {
                programs[channel.index()] = program;
            }
            EventKind::EndOfTrack => {
                finish = now + offset;
                break;
            }
        }
    }

    let span = ScheduledSpan {
        begin: begin.unwrap_or(now),
        finish,
    };
    tracing::debug!(
        track = track.0,
        begin = span.begin,
        finish = span.finish,
        "scheduled sequence"
    );
    span
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{TriggerKind, VirtualEngine};
    use crate::parser::tests::sequence_bytes;

    fn scheduled(stream: &[u8], now: u64) -> (VirtualEngine, ScheduledSpan) {
        let sequence = Sequence::parse(&sequence_bytes(500_000, 4, stream)).unwrap();
        let engine = VirtualEngine::new(44_100);
        engine.set_sample(now);
        let span = schedule_sequence_events(&sequence, &engine, TrackId(7), now);
        (engine, span)
    }

    #[test]
    fn test_offsets_and_span() {
        let (engine, span) = scheduled(
            &[
                0x00, 0x90, 60, 100, 0x83, 0x60, 0x80, 60, 0, 0x00, 0xFF, 0x2F, 0x00,
            ],
            1000,
        );

        assert_eq!(
            span,
            ScheduledSpan {
                begin: 1000,
                finish: 1000 + 21_168,
            }
        );

        let voices = engine.voices(TrackId(7));
        assert_eq!(voices.len(), 2);
        assert_eq!(voices[0].kind, TriggerKind::NoteOn);
        assert_eq!(voices[0].trigger.offset, 0);
        assert_eq!(voices[1].kind, TriggerKind::NoteOffDelayed);
        assert_eq!(voices[1].trigger.offset, 21_168);
        assert!(voices.iter().all(|v| v.under_lock));
        assert!(!engine.is_notes_locked());
    }

    #[test]
    fn test_begin_follows_first_note_on() {
        // program change at 0, first note on at 96 ticks
        let (engine, span) = scheduled(
            &[0x00, 0xC1, 33, 0x60, 0x91, 64, 90, 0x60, 0xFF, 0x2F, 0x00],
            0,
        );

        assert_eq!(span.begin, 4233);
        assert_eq!(span.finish, 8467);
        assert_eq!(engine.voices(TrackId(7))[0].trigger.program, 33);
    }

    #[test]
    fn test_program_is_per_channel() {
        let (engine, _) = scheduled(
            &[
                0x00, 0xC0, 5, 0x00, 0xC1, 9, 0x00, 0x90, 60, 100, 0x00, 0x91, 62, 100, 0x00,
                0x92, 64, 100, 0x00, 0xFF, 0x2F, 0x00,
            ],
            0,
        );

        let programs: Vec<u8> = engine
            .voices(TrackId(7))
            .iter()
            .map(|v| v.trigger.program)
            .collect();
        assert_eq!(programs, vec![5, 9, 0]);
    }

    #[test]
    fn test_no_notes_begins_at_pass() {
        let (engine, span) = scheduled(&[0x00, 0xFF, 0x2F, 0x00], 500);
        assert_eq!(
            span,
            ScheduledSpan {
                begin: 500,
                finish: 500,
            }
        );
        assert_eq!(engine.voice_count(TrackId(7)), 0);
        assert_eq!(engine.lock_count(), 1);
    }
}
