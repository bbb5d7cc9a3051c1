//! Configuration for Tunebox

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Construction-time options for [`AudioEngine`](crate::AudioEngine).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of pooled voices for overlapping sound effects
    pub pool_size: usize,
    /// Crossfade and fade-out length used when a request does not supply one
    pub default_fade_seconds: f32,
    /// Write volume changes through to the persistence store
    pub persist_enabled: bool,
    /// Mixer parameter names; an empty name disables pushing that parameter
    pub master_param: String,
    pub music_param: String,
    pub sfx_param: String,
    /// In-memory volume levels used until (or unless) persisted values load
    pub master_volume: f32,
    pub music_volume: f32,
    pub sfx_volume: f32,
    /// Seed for pitch randomization; `None` seeds from entropy
    pub rng_seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pool_size: 8,
            default_fade_seconds: 1.0,
            persist_enabled: true,
            master_param: "MasterVolume".to_string(),
            music_param: "MusicVolume".to_string(),
            sfx_param: "SFXVolume".to_string(),
            master_volume: 1.0,
            music_volume: 1.0,
            sfx_volume: 1.0,
            rng_seed: None,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pool_size(mut self, size: usize) -> Self {
        self.pool_size = size;
        self
    }

    pub fn default_fade(mut self, fade: Duration) -> Self {
        self.default_fade_seconds = fade.as_secs_f32();
        self
    }

    pub fn persist_enabled(mut self, enabled: bool) -> Self {
        self.persist_enabled = enabled;
        self
    }

    pub fn mixer_params(
        mut self,
        master: impl Into<String>,
        music: impl Into<String>,
        sfx: impl Into<String>,
    ) -> Self {
        self.master_param = master.into();
        self.music_param = music.into();
        self.sfx_param = sfx.into();
        self
    }

    pub fn initial_volumes(mut self, master: f32, music: f32, sfx: f32) -> Self {
        self.master_volume = master;
        self.music_volume = music;
        self.sfx_volume = sfx;
        self
    }

    pub fn rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    /// Default fade as a `Duration`. Negative or non-finite values become zero.
    pub fn default_fade_duration(&self) -> Duration {
        Duration::try_from_secs_f32(self.default_fade_seconds).unwrap_or(Duration::ZERO)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a JSON config file. Missing keys fall back to their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }
}

/// Output device options for the cpal backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Fixed callback buffer size in frames (`None` lets the host decide)
    pub buffer_size: Option<u32>,
    /// Voice table capacity reserved up front on the audio thread
    pub max_voices: usize,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            buffer_size: None,
            max_voices: 64,
        }
    }
}

impl DeviceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buffer_size(mut self, frames: u32) -> Self {
        self.buffer_size = Some(frames);
        self
    }

    pub fn max_voices(mut self, max: usize) -> Self {
        self.max_voices = max;
        self
    }
}
