use seqdrive::{Event, PlaybackState, PlayerConfig, SequencePlayer, VirtualEngine};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const SAMPLE_RATE: u32 = 44_100;
const BLOCK_SIZE: u64 = 512;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut args = std::env::args().skip(1);
    let Some(sequence_path) = args.next() else {
        eprintln!("usage: seqdrive <sequence file> [player config .ron]");
        std::process::exit(2);
    };
    let config = match args.next() {
        Some(path) => PlayerConfig::load(Path::new(&path))?,
        None => PlayerConfig::default(),
    };

    let engine = Arc::new(VirtualEngine::new(SAMPLE_RATE));
    let player = SequencePlayer::new(engine.clone(), config)?;
    player.load(&std::fs::read(&sequence_path)?)?;

    if let Some(sequence) = player.sequence() {
        let channels: HashSet<u8> = sequence
            .events()
            .iter()
            .filter_map(Event::channel)
            .map(u8::from)
            .collect();
        tracing::info!(
            path = %sequence_path,
            notes = sequence.note_count(),
            channels = channels.len(),
            length = sequence.duration_samples(SAMPLE_RATE),
            "playing"
        );
    }

    // Stands in for the mixer's render thread advancing the global clock.
    let rendering = Arc::new(AtomicBool::new(true));
    let render_thread = {
        let engine = engine.clone();
        let rendering = rendering.clone();
        let block = Duration::from_secs_f64(BLOCK_SIZE as f64 / f64::from(SAMPLE_RATE));
        std::thread::spawn(move || {
            while rendering.load(Ordering::Relaxed) {
                std::thread::sleep(block);
                let now = engine.advance(BLOCK_SIZE);
                engine.prune_due(now);
            }
        })
    };

    let (beat_tx, beat_rx) = crossbeam::channel::unbounded();
    player.set_beat_callback(move || {
        let _ = beat_tx.send(());
    });
    player.play();

    let mut beats = 0usize;
    while player.state() != PlaybackState::Finished {
        if beat_rx.recv_timeout(Duration::from_millis(50)).is_ok() {
            beats += 1;
            tracing::info!(beat = beats, position = player.playback_position(), "beat");
        }
    }
    // Drain the final beat sent on finishing.
    beats += beat_rx.try_iter().count();

    rendering.store(false, Ordering::Relaxed);
    let _ = render_thread.join();

    tracing::info!(
        beats,
        pending = engine.voice_count(player.track_id()),
        "playback complete"
    );
    Ok(())
}
