use super::reader::ByteReader;
use crate::{Error, Result};

/// Fixed-layout header at the start of every sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceHeader {
    pub magic: u32,
    pub version: u32,
    pub ticks_per_quarter_note: u16,
    /// Microseconds per quarter note.
    pub tempo: u32,
    /// Number of beat boundaries the song span is divided into.
    pub time_signature_bars: u8,
    pub time_signature_beats: u8,
}

impl SequenceHeader {
    pub const SIZE: usize = 15;

    pub(crate) fn read(reader: &mut ByteReader<'_>) -> Result<Self> {
        let magic = reader.read_u32()?;
        let version = reader.read_u32()?;
        let ticks_per_quarter_note = reader.read_u16()?;
        let tempo_bytes = reader.read_bytes::<3>()?;
        let time_signature_bars = reader.read_u8()?;
        let time_signature_beats = reader.read_u8()?;

        let tempo = tempo_bytes
            .iter()
            .fold(0u32, |acc, &byte| (acc << 8) | u32::from(byte));
        if tempo == 0 {
            return Err(Error::ZeroTempo);
        }

        Ok(Self {
            magic,
            version,
            ticks_per_quarter_note,
            tempo,
            time_signature_bars,
            time_signature_beats,
        })
    }

    /// Quarter notes per minute derived from the header tempo.
    pub fn tempo_ratio(&self) -> f64 {
        60_000_000.0 / f64::from(self.tempo)
    }
}
