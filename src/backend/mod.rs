//! Playback backend seam.
//!
//! The engine never decodes or mixes samples itself. It drives abstract
//! [`PlaybackSource`]s created by an [`AudioBackend`] and pushes bus levels to
//! a [`Mixer`]. Two backends ship with the crate:
//!
//! - [`headless`]: records state without producing sound (tests, servers, no device)
//! - [`device`]: renders to the default output device on a dedicated audio thread

pub mod device;
pub mod headless;

use crate::audio_data::AudioClip;
use crate::error::Result;
use crate::math::Vec3;
use std::time::Duration;

pub use device::{CpalBackend, CpalMixer, CpalSource};
pub use headless::{HeadlessBackend, HeadlessMixer, HeadlessSource, OneShot};

/// Mixer bus a source is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceRole {
    Music,
    Effect,
}

/// One channel that plays one clip at a time, plus fire-and-forget one-shots.
///
/// Implementations must keep `volume` and `spatial_blend` clamped to [0, 1] and
/// must stop the previous clip when `play` starts a new one.
pub trait PlaybackSource {
    fn set_clip(&mut self, clip: Option<AudioClip>);
    fn clip(&self) -> Option<&AudioClip>;
    fn set_looping(&mut self, looping: bool);
    fn is_looping(&self) -> bool;
    fn set_volume(&mut self, volume: f32);
    fn volume(&self) -> f32;
    fn set_pitch(&mut self, pitch: f32);
    fn pitch(&self) -> f32;
    fn set_spatial_blend(&mut self, blend: f32);
    fn spatial_blend(&self) -> f32;
    fn set_position(&mut self, position: Vec3);
    fn position(&self) -> Vec3;
    /// Starts the assigned clip from the beginning.
    fn play(&mut self);
    /// Plays `clip` once at `volume` without touching the assigned clip,
    /// loop flag or base volume.
    fn play_one_shot(&mut self, clip: &AudioClip, volume: f32);
    fn stop(&mut self);
    fn is_playing(&self) -> bool;
}

/// Factory for playback sources.
pub trait AudioBackend {
    type Source: PlaybackSource;

    fn create_source(&mut self, role: SourceRole, label: &str) -> Result<Self::Source>;

    /// Releases a source and everything anchored to it.
    fn destroy_source(&mut self, source: Self::Source);

    /// Real (unscaled) time passed since the previous engine tick. Backends
    /// with their own clock, like an output stream, ignore it.
    fn advance(&mut self, _delta: Duration) {}
}

/// Named decibel parameters on the output mixer.
pub trait Mixer {
    fn set_parameter(&mut self, name: &str, value_db: f32) -> Result<()>;
}
