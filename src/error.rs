//! Error types for Tunebox
//!
//! Only construction-time APIs (opening devices, loading clips, opening stores,
//! parsing config) return these. Gameplay-facing engine operations never fail;
//! they log and degrade to silence instead.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TuneboxError {
    #[error("Audio device error: {0}")]
    AudioDevice(String),

    #[error("Audio format error: {0}")]
    AudioFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Audio loading error: {0}")]
    AudioLoading(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("No playback source available: {0}")]
    SourceUnavailable(String),

    #[error("Engine error: {0}")]
    Engine(String),
}

pub type Result<T> = std::result::Result<T, TuneboxError>;
