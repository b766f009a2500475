use crate::Result;
use crate::events::{Event, EventKind};
use crate::parser::{self, SequenceHeader};
use std::io::Read;

/// A decoded sequence: its header and the events kept for playback.
#[derive(Debug, Clone, PartialEq)]
pub struct Sequence {
    header: SequenceHeader,
    events: Vec<Event>,
    tempo_ratio: f64,
}

impl Sequence {
    pub(crate) fn new(header: SequenceHeader, events: Vec<Event>) -> Self {
        Self {
            tempo_ratio: header.tempo_ratio(),
            header,
            events,
        }
    }

    pub fn parse(data: &[u8]) -> Result<Self> {
        parser::parse_sequence(data)
    }

    pub fn from_reader(mut reader: impl Read) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::parse(&data)
    }

    pub fn header(&self) -> &SequenceHeader {
        &self.header
    }

    /// Events in non-decreasing time order, ending with end of track.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn tempo_ratio(&self) -> f64 {
        self.tempo_ratio
    }

    pub fn bars(&self) -> u8 {
        self.header.time_signature_bars
    }

    pub fn ticks_to_samples(&self, ticks: u32, sample_rate: u32) -> u64 {
        super::ticks_to_samples(ticks, self.tempo_ratio, sample_rate)
    }

    /// Time of the end-of-track event.
    pub fn duration_ticks(&self) -> u32 {
        self.events
            .iter()
            .rev()
            .find(|e| e.kind == EventKind::EndOfTrack)
            .map_or(0, |e| e.time)
    }

    pub fn duration_samples(&self, sample_rate: u32) -> u64 {
        self.ticks_to_samples(self.duration_ticks(), sample_rate)
    }

    pub fn note_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e.kind, EventKind::NoteOn { .. }))
            .count()
    }
}
