#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Stopped,
    /// Waiting for the driver to hand every event to the engine.
    InitVoices,
    Playing,
    Finished,
}

/// Playback state plus the last beat boundary reported.
///
/// Lives behind the player's state mutex; every transition goes through
/// here so the rules are in one place.
#[derive(Debug, Clone, Default)]
pub struct Transport {
    state: PlaybackState,
    prev_beat: u64,
}

impl Transport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn prev_beat(&self) -> u64 {
        self.prev_beat
    }

    /// Stopped or Finished move to InitVoices. Returns whether it did.
    pub fn play(&mut self) -> bool {
        match self.state {
            PlaybackState::Stopped | PlaybackState::Finished => {
                self.prev_beat = 0;
                self.state = PlaybackState::InitVoices;
                true
            }
            PlaybackState::InitVoices | PlaybackState::Playing => false,
        }
    }

    /// Valid from any state.
    pub fn stop(&mut self) {
        self.state = PlaybackState::Stopped;
        self.prev_beat = 0;
    }

    /// InitVoices moves to Playing once every event has been handed over.
    pub fn voices_started(&mut self) -> bool {
        if self.state != PlaybackState::InitVoices {
            return false;
        }
        self.state = PlaybackState::Playing;
        true
    }

    /// Playing moves to Finished once the clock passes the song end.
    pub fn finish(&mut self) -> bool {
        if self.state != PlaybackState::Playing {
            return false;
        }
        self.state = PlaybackState::Finished;
        true
    }

    /// Record `beat` while Playing. True when it differs from the last one,
    /// meaning a boundary was crossed and the beat callback is due.
    pub fn cross_beat(&mut self, beat: u64) -> bool {
        if self.state != PlaybackState::Playing || beat == self.prev_beat {
            return false;
        }
        self.prev_beat = beat;
        true
    }
}
