use super::{AudioEngine, NoteTrigger, TrackId};
use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerKind {
    NoteOn,
    NoteOffDelayed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerRecord {
    pub kind: TriggerKind,
    pub trigger: NoteTrigger,
    /// Global sample at which the trigger was received.
    pub received_at: u64,
    pub under_lock: bool,
}

impl TriggerRecord {
    /// Absolute sample the engine would act on this trigger.
    pub fn due_sample(&self) -> u64 {
        self.received_at + self.trigger.offset
    }
}

/// In-process engine with a manually driven sample clock.
///
/// Nothing is rendered. Triggers are recorded per track so callers can see
/// what a player scheduled, and the clock only moves when `advance` or
/// `set_sample` is called (by a test or by a simulated render thread).
///
/// Records stay until their track is cleared or `prune_due` drops the ones
/// the clock has reached; a long-running render loop should call the latter
/// once per block.
pub struct VirtualEngine {
    sample_rate: u32,
    sample_counter: AtomicU64,
    notes_locked: Mutex<bool>,
    notes_unlocked: Condvar,
    lock_count: AtomicUsize,
    voices: Mutex<HashMap<TrackId, Vec<TriggerRecord>>>,
}

impl VirtualEngine {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            sample_counter: AtomicU64::new(0),
            notes_locked: Mutex::new(false),
            notes_unlocked: Condvar::new(),
            lock_count: AtomicUsize::new(0),
            voices: Mutex::new(HashMap::new()),
        }
    }

    /// Move the clock forward, returning the new sample index.
    pub fn advance(&self, samples: u64) -> u64 {
        self.sample_counter.fetch_add(samples, Ordering::AcqRel) + samples
    }

    /// Jump the clock. Values behind the current sample are ignored.
    pub fn set_sample(&self, sample: u64) {
        self.sample_counter.fetch_max(sample, Ordering::AcqRel);
    }

    pub fn voices(&self, track: TrackId) -> Vec<TriggerRecord> {
        self.voices.lock().get(&track).cloned().unwrap_or_default()
    }

    pub fn voice_count(&self, track: TrackId) -> usize {
        self.voices.lock().get(&track).map_or(0, Vec::len)
    }

    pub fn is_notes_locked(&self) -> bool {
        *self.notes_locked.lock()
    }

    /// How many times the note table has been locked.
    pub fn lock_count(&self) -> usize {
        self.lock_count.load(Ordering::Acquire)
    }

    /// Drop the triggers whose due sample is at or before `now`, as an
    /// engine does once it has acted on them. Returns how many were dropped.
    pub fn prune_due(&self, now: u64) -> usize {
        let mut pruned = 0;
        self.voices.lock().retain(|_, records| {
            let before = records.len();
            records.retain(|record| record.due_sample() > now);
            pruned += before - records.len();
            !records.is_empty()
        });
        pruned
    }

    fn record(&self, kind: TriggerKind, trigger: NoteTrigger) {
        let record = TriggerRecord {
            kind,
            trigger,
            received_at: self.current_sample(),
            under_lock: self.is_notes_locked(),
        };
        self.voices
            .lock()
            .entry(trigger.track)
            .or_default()
            .push(record);
    }
}

impl AudioEngine for VirtualEngine {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn current_sample(&self) -> u64 {
        self.sample_counter.load(Ordering::Acquire)
    }

    fn lock_notes(&self) {
        let mut locked = self.notes_locked.lock();
        while *locked {
            self.notes_unlocked.wait(&mut locked);
        }
        *locked = true;
        self.lock_count.fetch_add(1, Ordering::AcqRel);
    }

    fn unlock_notes(&self) {
        *self.notes_locked.lock() = false;
        self.notes_unlocked.notify_one();
    }

    fn note_on(&self, trigger: NoteTrigger) {
        self.record(TriggerKind::NoteOn, trigger);
    }

    fn note_off_delayed(&self, trigger: NoteTrigger) {
        self.record(TriggerKind::NoteOffDelayed, trigger);
    }

    fn clear_track_voices(&self, track: TrackId) {
        if let Some(voices) = self.voices.lock().remove(&track) {
            tracing::trace!(track = track.0, cleared = voices.len(), "cleared voices");
        }
    }
}
