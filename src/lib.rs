//! Sequenced music playback synchronized to an external mixing engine.
//!
//! Sequences are a small MIDI-derived binary format: a fixed header carrying
//! tempo and time signature, followed by a single track of delta-timed
//! events. [`SequencePlayer`] decodes one, hands every note to an
//! [`AudioEngine`] with a sample offset in a single pass, and then follows
//! the engine's global sample clock to report beat boundaries and the end of
//! the song.
//!
//! ```no_run
//! use seqdrive::{PlayerConfig, SequencePlayer, VirtualEngine};
//! use std::sync::Arc;
//!
//! let engine = Arc::new(VirtualEngine::new(44_100));
//! let player = SequencePlayer::new(engine, PlayerConfig::default()).unwrap();
//! player.load(&std::fs::read("theme.seq").unwrap()).unwrap();
//! player.set_beat_callback(|| println!("beat"));
//! player.play();
//! ```

pub mod audio;
pub mod config;
pub mod engine;
pub mod events;
pub mod parser;
pub mod timing;

pub use audio::{AudioEngine, NoteTrigger, TrackId, VirtualEngine};
pub use config::{PlayerConfig, PollMode};
pub use engine::{BeatCallback, SequencePlayer};
pub use events::{Channel, Event, EventKind, EventList};
pub use parser::SequenceHeader;
pub use timing::{PlaybackState, Sequence};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("unexpected end of sequence data at offset {offset}")]
    UnexpectedEof { offset: usize },

    #[error("unrecognized command 0x{status:02X} at offset {offset}")]
    UnrecognizedCommand { status: u8, offset: usize },

    #[error("data byte 0x{byte:02X} at offset {offset} with no running status")]
    MissingRunningStatus { byte: u8, offset: usize },

    #[error("sequence tempo is zero")]
    ZeroTempo,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
