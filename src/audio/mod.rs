//! Seam to the external mixing engine.
//!
//! The player never renders audio. It reads the engine's global sample
//! counter and hands note triggers over with a sample offset, leaving
//! per-note timing to the engine's own render thread.

mod virtual_engine;

pub use virtual_engine::{TriggerKind, TriggerRecord, VirtualEngine};

use crate::events::Channel;
use serde::{Deserialize, Serialize};

/// Handle scoping a player's voices inside the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TrackId(pub u32);

/// A note handed to the engine, to start or stop `offset` samples from now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteTrigger {
    pub channel: Channel,
    /// Program last assigned to `channel` in this pass.
    pub program: u8,
    pub note: u8,
    pub velocity: u8,
    pub track: TrackId,
    pub offset: u64,
}

/// Operations the player consumes from the mixing engine.
///
/// `current_sample` must be monotonic; it is advanced by the engine's render
/// thread and is only ever read here.
pub trait AudioEngine: Send + Sync + 'static {
    fn sample_rate(&self) -> u32;

    fn current_sample(&self) -> u64;

    /// Take the engine's global note-table lock. Paired with `unlock_notes`.
    fn lock_notes(&self);

    fn unlock_notes(&self);

    fn note_on(&self, trigger: NoteTrigger);

    fn note_off_delayed(&self, trigger: NoteTrigger);

    /// Drop every voice tagged with `track`.
    fn clear_track_voices(&self, track: TrackId);
}

/// Holds the engine's note lock until dropped.
pub(crate) struct NoteLock<'a, E: AudioEngine + ?Sized> {
    engine: &'a E,
}

impl<'a, E: AudioEngine + ?Sized> NoteLock<'a, E> {
    pub(crate) fn acquire(engine: &'a E) -> Self {
        engine.lock_notes();
        Self { engine }
    }
}

impl<E: AudioEngine + ?Sized> Drop for NoteLock<'_, E> {
    fn drop(&mut self) {
        self.engine.unlock_notes();
    }
}
