use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::{Error, Result, audio::TrackId};

/// How the driver thread waits between polls of the engine clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PollMode {
    /// Busy-spin with no scheduling delay.
    #[default]
    Spin,
    Yield,
    /// Spin, then yield, then keep yielding while nothing changes.
    Backoff,
    Sleep { micros: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub track_id: TrackId,
    pub poll_mode: PollMode,
    pub thread_name: String,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            track_id: TrackId::default(),
            poll_mode: PollMode::default(),
            thread_name: "seq-driver".to_string(),
        }
    }
}

impl PlayerConfig {
    pub fn from_ron_str(source: &str) -> Result<Self> {
        ron::from_str(source).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn to_ron_string(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| Error::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path)?;
        Self::from_ron_str(&source)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_ron_string()?)?;
        Ok(())
    }
}
