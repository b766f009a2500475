use crate::Result;
use crate::audio::{AudioEngine, TrackId};
use crate::config::{PlayerConfig, PollMode};
use crate::timing::{self, PlaybackState, Sequence, Transport};
use arc_swap::ArcSwapOption;
use crossbeam::utils::Backoff;
use parking_lot::Mutex;
use std::io::Read;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

pub type BeatCallback = Box<dyn Fn() + Send + Sync>;

/// State shared between the caller-facing player and its driver thread.
struct Shared<E: AudioEngine> {
    engine: Arc<E>,
    track: TrackId,
    transport: Mutex<Transport>,
    sequence: ArcSwapOption<Sequence>,
    song_begin: AtomicU64,
    song_finish: AtomicU64,
    song_bars: AtomicU8,
    beat_callback: ArcSwapOption<BeatCallback>,
    kill: AtomicBool,
}

impl<E: AudioEngine> Shared<E> {
    fn new(engine: Arc<E>, track: TrackId) -> Self {
        Self {
            engine,
            track,
            transport: Mutex::new(Transport::new()),
            sequence: ArcSwapOption::empty(),
            song_begin: AtomicU64::new(0),
            song_finish: AtomicU64::new(0),
            song_bars: AtomicU8::new(0),
            beat_callback: ArcSwapOption::empty(),
            kill: AtomicBool::new(false),
        }
    }

    fn play(&self) {
        // Checked with the state lock held, as `unload` clears it under the same lock.
        let mut transport = self.transport.lock();
        if self.sequence.load().is_none() {
            tracing::warn!(
                track = self.track.0,
                "play requested with no sequence loaded"
            );
            return;
        }
        if transport.play() {
            tracing::debug!(track = self.track.0, "playback requested");
        }
    }

    fn stop(&self) {
        let mut transport = self.transport.lock();
        self.engine.clear_track_voices(self.track);
        transport.stop();
    }

    /// Stop and drop the loaded sequence as one step.
    fn unload(&self) {
        let mut transport = self.transport.lock();
        self.engine.clear_track_voices(self.track);
        transport.stop();
        self.sequence.store(None);
    }

    /// One iteration of the driver loop. Returns whether anything happened.
    fn poll(&self) -> bool {
        let started = self.start_voices();

        let now = self.engine.current_sample();
        let beat = {
            let mut transport = self.transport.lock();
            if transport.state() != PlaybackState::Playing {
                false
            } else {
                let begin = self.song_begin.load(Ordering::Acquire);
                let finish = self.song_finish.load(Ordering::Acquire);
                if now > finish {
                    transport.finish();
                    tracing::info!(track = self.track.0, sample = now, "sequence finished");
                    // Final beat even for songs shorter than one beat.
                    true
                } else {
                    let bars = self.song_bars.load(Ordering::Acquire);
                    timing::beat_index(begin, finish, bars, now)
                        .is_some_and(|beat| transport.cross_beat(beat))
                }
            }
        };

        if beat {
            self.fire_beat();
        }
        started || beat
    }

    fn start_voices(&self) -> bool {
        let mut transport = self.transport.lock();
        if transport.state() != PlaybackState::InitVoices {
            return false;
        }

        let Some(sequence) = self.sequence.load_full() else {
            tracing::warn!(
                track = self.track.0,
                "sequence unloaded before playback started"
            );
            transport.stop();
            return true;
        };

        let now = self.engine.current_sample();
        let span = timing::schedule_sequence_events(&sequence, &*self.engine, self.track, now);
        self.song_begin.store(span.begin, Ordering::Release);
        self.song_finish.store(span.finish, Ordering::Release);
        self.song_bars.store(sequence.bars(), Ordering::Release);
        transport.voices_started();

        tracing::info!(
            track = self.track.0,
            begin = span.begin,
            finish = span.finish,
            "sequence playing"
        );
        true
    }

    fn fire_beat(&self) {
        if let Some(callback) = self.beat_callback.load_full() {
            (**callback)();
        }
    }

    fn playback_position(&self) -> i64 {
        let now = self.engine.current_sample() as i64;
        now - self.song_begin.load(Ordering::Acquire) as i64
    }
}

/// Paces the driver loop between polls that did no work.
struct Pacer {
    mode: PollMode,
    backoff: Backoff,
}

impl Pacer {
    fn new(mode: PollMode) -> Self {
        Self {
            mode,
            backoff: Backoff::new(),
        }
    }

    fn idle(&self) {
        match self.mode {
            PollMode::Spin => std::hint::spin_loop(),
            PollMode::Yield => std::thread::yield_now(),
            PollMode::Backoff => self.backoff.snooze(),
            PollMode::Sleep { micros } => std::thread::sleep(Duration::from_micros(micros)),
        }
    }

    fn reset(&self) {
        self.backoff.reset();
    }
}

fn driver_thread<E: AudioEngine>(shared: Arc<Shared<E>>, pacer: Pacer) {
    tracing::debug!(
        track = shared.track.0,
        mode = ?pacer.mode,
        "driver thread started"
    );

    while !shared.kill.load(Ordering::Acquire) {
        if shared.poll() {
            pacer.reset();
        } else {
            pacer.idle();
        }
    }

    tracing::debug!(track = shared.track.0, "driver stopped");
}

/// Plays one loaded sequence into an [`AudioEngine`].
///
/// A background thread is spawned on construction and runs until the player
/// is dropped. It polls the engine clock continuously: when playback is
/// requested it hands the whole sequence to the engine in one pass, then
/// watches the clock for beat boundaries and the end of the song.
///
/// The beat callback runs on that background thread.
pub struct SequencePlayer<E: AudioEngine> {
    shared: Arc<Shared<E>>,
    driver: Option<JoinHandle<()>>,
}

impl<E: AudioEngine> SequencePlayer<E> {
    pub fn new(engine: Arc<E>, config: PlayerConfig) -> Result<Self> {
        let shared = Arc::new(Shared::new(engine, config.track_id));
        let pacer = Pacer::new(config.poll_mode);

        let driver_shared = shared.clone();
        let driver = std::thread::Builder::new()
            .name(config.thread_name)
            .spawn(move || driver_thread(driver_shared, pacer))?;

        Ok(Self {
            shared,
            driver: Some(driver),
        })
    }

    /// Replace the loaded sequence with `data`.
    ///
    /// Playback is stopped first. On error nothing stays loaded.
    pub fn load(&self, data: &[u8]) -> Result<()> {
        self.replace_sequence(|| Sequence::parse(data))
    }

    pub fn load_from_reader(&self, reader: impl Read) -> Result<()> {
        self.replace_sequence(|| Sequence::from_reader(reader))
    }

    fn replace_sequence(&self, parse: impl FnOnce() -> Result<Sequence>) -> Result<()> {
        self.shared.unload();

        let sequence = parse().inspect_err(|e| {
            tracing::warn!(
                track = self.shared.track.0,
                error = %e,
                "failed to load sequence"
            );
        })?;

        tracing::info!(
            track = self.shared.track.0,
            events = sequence.events().len(),
            tempo_ratio = sequence.tempo_ratio(),
            "sequence loaded"
        );
        self.shared.sequence.store(Some(Arc::new(sequence)));
        Ok(())
    }

    /// Start playback from Stopped or Finished. No effect otherwise.
    pub fn play(&self) {
        self.shared.play();
    }

    /// Stop playback and drop this track's voices. Valid in any state.
    pub fn stop(&self) {
        self.shared.stop();
    }

    pub fn state(&self) -> PlaybackState {
        self.shared.transport.lock().state()
    }

    /// Samples since the first note. Only meaningful once playing.
    pub fn playback_position(&self) -> i64 {
        self.shared.playback_position()
    }

    pub fn song_begin_sample(&self) -> u64 {
        self.shared.song_begin.load(Ordering::Acquire)
    }

    pub fn song_finish_sample(&self) -> u64 {
        self.shared.song_finish.load(Ordering::Acquire)
    }

    pub fn set_beat_callback(&self, callback: impl Fn() + Send + Sync + 'static) {
        let callback: BeatCallback = Box::new(callback);
        self.shared.beat_callback.store(Some(Arc::new(callback)));
    }

    pub fn clear_beat_callback(&self) {
        self.shared.beat_callback.store(None);
    }

    pub fn sequence(&self) -> Option<Arc<Sequence>> {
        self.shared.sequence.load_full()
    }

    pub fn track_id(&self) -> TrackId {
        self.shared.track
    }

    pub fn engine(&self) -> &Arc<E> {
        &self.shared.engine
    }
}

impl<E: AudioEngine> Drop for SequencePlayer<E> {
    fn drop(&mut self) {
        self.shared.kill.store(true, Ordering::Release);
        if let Some(driver) = self.driver.take() {
            if driver.join().is_err() {
                tracing::error!(track = self.shared.track.0, "driver thread panicked");
            }
        }
    }
}
