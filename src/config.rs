use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;

fn default_music_fade_ms() -> u64 {
    2000
}

fn default_pool_capacity() -> usize {
    16
}

/// Engine tuning values supplied by the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Fixed crossfade duration for music track changes, in milliseconds.
    #[serde(default = "default_music_fade_ms")]
    pub music_fade_ms: u64,

    /// Idle emitters the pool keeps for reuse. Acquisitions beyond this are
    /// never refused; the surplus just is not cached on release.
    #[serde(default = "default_pool_capacity")]
    pub pool_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            music_fade_ms: default_music_fade_ms(),
            pool_capacity: default_pool_capacity(),
        }
    }
}

impl EngineConfig {
    /// Music crossfade duration (for the orchestrator)
    pub fn music_fade(&self) -> Duration {
        Duration::from_millis(self.music_fade_ms)
    }

    /// Load configuration from a JSON file. Missing file yields defaults.
    pub fn load(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            tracing::debug!("No engine config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
        let config: EngineConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse configuration at {}", path.display()))?;

        tracing::info!("Loaded engine config from {}", path.display());
        Ok(config)
    }

    /// Save configuration to disk
    pub fn save(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory {}", parent.display())
            })?;
        }

        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
            .with_context(|| format!("Failed to save configuration to {}", path.display()))?;

        Ok(())
    }
}
