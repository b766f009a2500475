mod scheduler;
mod sequence;
mod state_machine;

pub use scheduler::{ScheduledSpan, schedule_sequence_events};
pub use sequence::Sequence;
pub use state_machine::{PlaybackState, Transport};

/// Convert sequence ticks to engine samples.
///
/// This is the conversion existing content was authored against, so it is
/// kept as is: `((60 * ticks) / tempo_ratio) * (sample_rate / 500)`,
/// truncated toward zero.
pub fn ticks_to_samples(ticks: u32, tempo_ratio: f64, sample_rate: u32) -> u64 {
    let samples = ((60.0 * f64::from(ticks)) / tempo_ratio) * (f64::from(sample_rate) / 500.0);
    samples as u64
}

/// Index of the beat boundary most recently crossed at `now`.
///
/// The song span `begin..finish` is cut into `bars` equal beats. Returns
/// `None` when no beat can be computed: zero bars, a span shorter than
/// `bars` samples, or a clock still before the first note.
pub fn beat_index(begin: u64, finish: u64, bars: u8, now: u64) -> Option<u64> {
    if bars == 0 || now < begin {
        return None;
    }
    let beat_length = finish.saturating_sub(begin) / u64::from(bars);
    if beat_length == 0 {
        return None;
    }
    Some((now - begin) / beat_length)
}
