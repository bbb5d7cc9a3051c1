//! Tunebox: runtime audio for games and other interactive hosts.
//!
//! Background music with crossfades, a round-robin pool of effect voices,
//! fire-and-forget positional effects and persisted volume levels mapped onto
//! a decibel mixer. The engine is driven cooperatively: the host calls
//! [`AudioEngine::advance`] once per frame.
//!
//! ```no_run
//! use std::time::Duration;
//! use tunebox::{AudioClip, AudioEngine, EngineConfig, FrameTime, HeadlessBackend, MusicParams};
//!
//! let mut engine = AudioEngine::builder(EngineConfig::default(), HeadlessBackend::new()).build();
//! let theme = AudioClip::silence("theme", Duration::from_secs(30), 48_000);
//! engine.play_music(Some(&theme), MusicParams::new().fade(Duration::from_secs(2)));
//! engine.advance(FrameTime::new(Duration::from_millis(16)));
//! ```

pub mod audio_data;
pub mod backend;
pub mod config;
pub mod crossfader;
pub mod engine;
pub mod error;
pub mod math;
pub mod persistence;
pub mod spatial;
pub mod timing;
pub mod voice_pool;
pub mod volume;

pub use audio_data::{AudioClip, Downmix, LoadOptions};
pub use backend::{
    AudioBackend, CpalBackend, CpalMixer, HeadlessBackend, HeadlessMixer, Mixer, PlaybackSource,
    SourceRole,
};
pub use config::{DeviceConfig, EngineConfig};
pub use crossfader::{CrossfadeState, MusicCrossfader, MusicParams};
pub use engine::{AudioEngine, EngineBuilder, EngineSlot};
pub use error::{Result, TuneboxError};
pub use math::{Pose, Quat, Vec3};
pub use persistence::{JsonFileStore, MemoryStore, VolumeStore};
pub use spatial::{EmitterFactory, SpatialParams, TEARDOWN_GRACE};
pub use timing::FrameTime;
pub use voice_pool::{SfxParams, VoicePool};
pub use volume::{VolumeChannel, VolumeSettings, to_attenuation};
