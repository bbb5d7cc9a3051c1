//! Backend that tracks playback state without producing sound.
//!
//! Used when no output device is available (the engine then runs in total
//! silence) and to observe engine behavior in tests.
//!
//! Playback time comes from [`AudioBackend::advance`]: every source shares the
//! backend's clock, so a non-looping clip stops reporting `is_playing` once
//! its duration has elapsed.

use super::{AudioBackend, Mixer, PlaybackSource, SourceRole};
use crate::audio_data::AudioClip;
use crate::error::{Result, TuneboxError};
use crate::math::Vec3;
use crate::volume::clamp01;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One-shot records kept per source; older ones are discarded.
pub const ONE_SHOT_HISTORY: usize = 32;

/// A one-shot recorded by a [`HeadlessSource`].
#[derive(Debug, Clone, PartialEq)]
pub struct OneShot {
    pub clip: AudioClip,
    pub volume: f32,
    pub pitch: f32,
}

#[derive(Debug, Clone)]
pub struct HeadlessSource {
    id: u64,
    label: String,
    role: SourceRole,
    clip: Option<AudioClip>,
    looping: bool,
    volume: f32,
    pitch: f32,
    spatial_blend: f32,
    position: Vec3,
    playing: bool,
    play_count: usize,
    one_shots: Vec<OneShot>,
    one_shots_played: usize,
    clock: Arc<AtomicU64>,
    started_at: u64,
}

impl HeadlessSource {
    fn new(id: u64, role: SourceRole, label: &str, clock: Arc<AtomicU64>) -> Self {
        Self {
            id,
            label: label.to_string(),
            role,
            clip: None,
            looping: false,
            volume: 1.0,
            pitch: 1.0,
            spatial_blend: 0.0,
            position: Vec3::ZERO,
            playing: false,
            play_count: 0,
            one_shots: Vec::new(),
            one_shots_played: 0,
            clock,
            started_at: 0,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn role(&self) -> SourceRole {
        self.role
    }

    /// Number of times `play` was called
    pub fn play_count(&self) -> usize {
        self.play_count
    }

    /// The most recent one-shots issued on this source (at most
    /// [`ONE_SHOT_HISTORY`]), oldest first
    pub fn one_shots(&self) -> &[OneShot] {
        &self.one_shots
    }

    /// Every one-shot ever issued, including discarded records
    pub fn one_shots_played(&self) -> usize {
        self.one_shots_played
    }

    fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.clock.load(Ordering::Relaxed).saturating_sub(self.started_at))
    }
}

impl PlaybackSource for HeadlessSource {
    fn set_clip(&mut self, clip: Option<AudioClip>) {
        self.clip = clip;
    }

    fn clip(&self) -> Option<&AudioClip> {
        self.clip.as_ref()
    }

    fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    fn is_looping(&self) -> bool {
        self.looping
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = clamp01(volume);
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn set_pitch(&mut self, pitch: f32) {
        self.pitch = pitch;
    }

    fn pitch(&self) -> f32 {
        self.pitch
    }

    fn set_spatial_blend(&mut self, blend: f32) {
        self.spatial_blend = clamp01(blend);
    }

    fn spatial_blend(&self) -> f32 {
        self.spatial_blend
    }

    fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    fn position(&self) -> Vec3 {
        self.position
    }

    fn play(&mut self) {
        if self.clip.is_some() {
            self.playing = true;
            self.play_count += 1;
            self.started_at = self.clock.load(Ordering::Relaxed);
        }
    }

    fn play_one_shot(&mut self, clip: &AudioClip, volume: f32) {
        if self.one_shots.len() == ONE_SHOT_HISTORY {
            self.one_shots.remove(0);
        }
        self.one_shots.push(OneShot {
            clip: clip.clone(),
            volume: clamp01(volume),
            pitch: self.pitch,
        });
        self.one_shots_played += 1;
    }

    fn stop(&mut self) {
        self.playing = false;
    }

    fn is_playing(&self) -> bool {
        match &self.clip {
            Some(clip) if self.playing => self.looping || self.elapsed() < clip.duration(),
            _ => false,
        }
    }
}

/// Counts sources it hands out and can refuse creation past a limit.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    next_id: u64,
    source_limit: Option<usize>,
    live: usize,
    destroyed: usize,
    clock: Arc<AtomicU64>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse to create more than `limit` live sources.
    pub fn with_source_limit(limit: usize) -> Self {
        Self {
            source_limit: Some(limit),
            ..Self::default()
        }
    }

    pub fn live_sources(&self) -> usize {
        self.live
    }

    pub fn destroyed_sources(&self) -> usize {
        self.destroyed
    }

    /// Playback time accumulated through [`AudioBackend::advance`]
    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.clock.load(Ordering::Relaxed))
    }
}

impl AudioBackend for HeadlessBackend {
    type Source = HeadlessSource;

    fn create_source(&mut self, role: SourceRole, label: &str) -> Result<HeadlessSource> {
        if self.source_limit.is_some_and(|limit| self.live >= limit) {
            return Err(TuneboxError::SourceUnavailable(format!(
                "source limit reached while creating '{}'",
                label
            )));
        }

        let source = HeadlessSource::new(self.next_id, role, label, self.clock.clone());
        self.next_id += 1;
        self.live += 1;
        Ok(source)
    }

    fn destroy_source(&mut self, source: HeadlessSource) {
        log::debug!("Headless source {} ({}) destroyed", source.id, source.label);
        self.live = self.live.saturating_sub(1);
        self.destroyed += 1;
    }

    fn advance(&mut self, delta: Duration) {
        let nanos = u64::try_from(delta.as_nanos()).unwrap_or(u64::MAX);
        let _ = self
            .clock
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |now| {
                Some(now.saturating_add(nanos))
            });
    }
}

/// Mixer that remembers the last value of every parameter.
///
/// Clones share the same parameter table, so a test can keep one handle and
/// give another to the engine.
#[derive(Debug, Clone, Default)]
pub struct HeadlessMixer {
    parameters: Arc<Mutex<HashMap<String, f32>>>,
    writes: Arc<Mutex<usize>>,
}

impl HeadlessMixer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parameter(&self, name: &str) -> Option<f32> {
        self.parameters
            .lock()
            .ok()
            .and_then(|params| params.get(name).copied())
    }

    /// Total number of `set_parameter` calls
    pub fn writes(&self) -> usize {
        self.writes.lock().map(|w| *w).unwrap_or(0)
    }
}

impl Mixer for HeadlessMixer {
    fn set_parameter(&mut self, name: &str, value_db: f32) -> Result<()> {
        self.parameters
            .lock()
            .map_err(|_| TuneboxError::Engine("mixer parameter table poisoned".to_string()))?
            .insert(name.to_string(), value_db);
        if let Ok(mut writes) = self.writes.lock() {
            *writes += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_source_clamps_and_records() {
        let mut backend = HeadlessBackend::new();
        let mut source = backend.create_source(SourceRole::Effect, "voice").unwrap();
        source.set_volume(3.0);
        assert_eq!(source.volume(), 1.0);
        source.set_spatial_blend(-1.0);
        assert_eq!(source.spatial_blend(), 0.0);

        let clip = AudioClip::silence("hit", Duration::from_millis(100), 1000);
        source.set_pitch(1.2);
        source.play_one_shot(&clip, 0.4);
        assert_eq!(source.one_shots().len(), 1);
        assert_eq!(source.one_shots()[0].pitch, 1.2);
        assert!(!source.is_playing());
        assert!(source.clip().is_none());
    }

    #[test]
    fn test_play_requires_clip() {
        let mut backend = HeadlessBackend::new();
        let mut source = backend.create_source(SourceRole::Music, "music").unwrap();
        source.play();
        assert!(!source.is_playing());

        source.set_clip(Some(AudioClip::silence("t", Duration::from_secs(1), 1000)));
        source.play();
        assert!(source.is_playing());
        source.stop();
        assert!(!source.is_playing());
        assert_eq!(source.play_count(), 1);
    }

    #[test]
    fn test_non_looping_clip_ends_with_backend_time() {
        let mut backend = HeadlessBackend::new();
        let mut once = backend.create_source(SourceRole::Music, "once").unwrap();
        let mut looped = backend.create_source(SourceRole::Music, "looped").unwrap();
        let clip = AudioClip::silence("t", Duration::from_secs(1), 1000);

        once.set_clip(Some(clip.clone()));
        looped.set_clip(Some(clip));
        looped.set_looping(true);
        once.play();
        looped.play();

        backend.advance(Duration::from_millis(999));
        assert!(once.is_playing());

        backend.advance(Duration::from_millis(1));
        assert!(!once.is_playing());
        assert!(looped.is_playing());

        once.play();
        assert!(once.is_playing());
        assert_eq!(backend.elapsed(), Duration::from_secs(1));
    }

    #[test]
    fn test_one_shot_history_is_bounded() {
        let mut backend = HeadlessBackend::new();
        let mut source = backend.create_source(SourceRole::Effect, "voice").unwrap();
        let clip = AudioClip::silence("hit", Duration::from_millis(10), 1000);
        for i in 0..ONE_SHOT_HISTORY + 10 {
            source.play_one_shot(&clip, i as f32 / 100.0);
        }
        assert_eq!(source.one_shots().len(), ONE_SHOT_HISTORY);
        assert_eq!(source.one_shots_played(), ONE_SHOT_HISTORY + 10);
        assert!((source.one_shots()[0].volume - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_source_limit() {
        let mut backend = HeadlessBackend::with_source_limit(1);
        let first = backend.create_source(SourceRole::Music, "a").unwrap();
        assert!(backend.create_source(SourceRole::Music, "b").is_err());
        backend.destroy_source(first);
        assert_eq!(backend.live_sources(), 0);
        assert_eq!(backend.destroyed_sources(), 1);
        assert!(backend.create_source(SourceRole::Music, "c").is_ok());
    }

    #[test]
    fn test_mixer_clones_share_parameters() {
        let observed = HeadlessMixer::new();
        let mut mixer = observed.clone();
        mixer.set_parameter("MusicVolume", -6.0).unwrap();
        assert_eq!(observed.parameter("MusicVolume"), Some(-6.0));
        assert_eq!(observed.writes(), 1);
        assert_eq!(observed.parameter("Missing"), None);
    }
}
