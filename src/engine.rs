//! The audio engine facade.
//!
//! [`AudioEngine`] owns every long-lived source (the music pair, the pooled
//! effect voices, the overflow source) plus the transient spatial emitters,
//! and exposes the gameplay-facing operations. None of those operations
//! return errors: missing clips, missing sources and failing mixer or store
//! writes are logged and otherwise ignored.
//!
//! The host calls [`AudioEngine::advance`] once per frame to drive fades and
//! emitter teardown.

use crate::audio_data::AudioClip;
use crate::backend::{AudioBackend, Mixer, PlaybackSource, SourceRole};
use crate::config::EngineConfig;
use crate::crossfader::{MusicCrossfader, MusicParams};
use crate::math::Vec3;
use crate::persistence::VolumeStore;
use crate::spatial::{EmitterFactory, SpatialParams};
use crate::timing::FrameTime;
use crate::voice_pool::{SfxParams, VoicePool};
use crate::volume::{VolumeChannel, VolumeSettings};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::time::Duration;

/// Collects the optional collaborators of an [`AudioEngine`].
pub struct EngineBuilder<B: AudioBackend> {
    config: EngineConfig,
    backend: B,
    mixer: Option<Box<dyn Mixer>>,
    store: Option<Box<dyn VolumeStore>>,
}

impl<B: AudioBackend> EngineBuilder<B> {
    /// Mixer receiving decibel values. Without one, volume changes only
    /// affect engine state and source gains.
    pub fn mixer(mut self, mixer: impl Mixer + 'static) -> Self {
        self.mixer = Some(Box::new(mixer));
        self
    }

    /// Store for volume levels. Ignored when persistence is disabled.
    pub fn store(mut self, store: impl VolumeStore + 'static) -> Self {
        self.store = Some(Box::new(store));
        self
    }

    /// Creates the sources, loads persisted volumes and pushes them to the mixer.
    pub fn build(self) -> AudioEngine<B> {
        let EngineBuilder {
            config,
            mut backend,
            mixer,
            store,
        } = self;

        let music = MusicCrossfader::new(create_music_pair(&mut backend));

        let overflow = match backend.create_source(SourceRole::Effect, "SFXSource") {
            Ok(mut source) => {
                source.set_spatial_blend(0.0);
                Some(source)
            }
            Err(e) => {
                log::warn!("No overflow effect source: {}", e);
                None
            }
        };

        let mut voices = Vec::with_capacity(config.pool_size);
        for i in 0..config.pool_size {
            match backend.create_source(SourceRole::Effect, &format!("SFXVoice_{}", i)) {
                Ok(mut source) => {
                    source.set_spatial_blend(0.0);
                    voices.push(source);
                }
                Err(e) => {
                    log::warn!(
                        "Voice pool stopped at {} of {} voices: {}",
                        i,
                        config.pool_size,
                        e
                    );
                    break;
                }
            }
        }

        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let volumes = VolumeSettings::new(
            config.master_volume,
            config.music_volume,
            config.sfx_volume,
        );

        let mut engine = AudioEngine {
            voices: VoicePool::new(voices, overflow, rng),
            music,
            emitters: EmitterFactory::new(),
            volumes,
            config,
            backend,
            mixer,
            store,
        };

        if engine.config.persist_enabled {
            engine.load_persisted();
        }
        for channel in VolumeChannel::ALL {
            engine.push_to_mixer(channel);
        }

        log::info!(
            "Audio engine ready: {} voices, music {}, volumes {:.2}/{:.2}/{:.2}",
            engine.voices.len(),
            if engine.music.is_available() {
                "enabled"
            } else {
                "disabled"
            },
            engine.volumes.master(),
            engine.volumes.music(),
            engine.volumes.sfx()
        );
        engine
    }
}

fn create_music_pair<B: AudioBackend>(backend: &mut B) -> Option<[B::Source; 2]> {
    let a = match backend.create_source(SourceRole::Music, "MusicSource_A") {
        Ok(source) => source,
        Err(e) => {
            log::error!("Music source A unavailable, music disabled: {}", e);
            return None;
        }
    };
    match backend.create_source(SourceRole::Music, "MusicSource_B") {
        Ok(b) => Some([a, b]),
        Err(e) => {
            log::error!("Music source B unavailable, music disabled: {}", e);
            backend.destroy_source(a);
            None
        }
    }
}

pub struct AudioEngine<B: AudioBackend> {
    config: EngineConfig,
    backend: B,
    mixer: Option<Box<dyn Mixer>>,
    store: Option<Box<dyn VolumeStore>>,
    volumes: VolumeSettings,
    music: MusicCrossfader<B::Source>,
    voices: VoicePool<B::Source>,
    emitters: EmitterFactory<B::Source>,
}

impl<B: AudioBackend> AudioEngine<B> {
    pub fn builder(config: EngineConfig, backend: B) -> EngineBuilder<B> {
        EngineBuilder {
            config,
            backend,
            mixer: None,
            store: None,
        }
    }

    /// Crossfades to `clip`. `None` is ignored with a warning.
    pub fn play_music(&mut self, clip: Option<&AudioClip>, params: MusicParams) {
        let Some(clip) = clip else {
            log::warn!("play_music called without a clip");
            return;
        };
        let fade = self.resolve_fade(params.fade);
        self.music.play(clip, fade, params.looping, self.volumes.music());
    }

    /// Fades out the current track. No-op when nothing is playing.
    pub fn stop_music(&mut self, fade: Option<Duration>) {
        let fade = self.resolve_fade(fade);
        if !self.music.stop(fade) {
            log::debug!("stop_music ignored, no music playing");
        }
    }

    pub fn play_sfx(&mut self, clip: Option<&AudioClip>, params: &SfxParams) {
        self.voices.play_effect(clip, self.volumes.sfx(), params);
    }

    pub fn play_sfx_at_position(
        &mut self,
        clip: Option<&AudioClip>,
        position: Vec3,
        params: &SpatialParams,
    ) {
        self.emitters.play_at_position(
            &mut self.backend,
            clip,
            position,
            self.volumes.sfx(),
            params,
        );
    }

    pub fn set_master_volume(&mut self, volume: f32) {
        self.set_volume(VolumeChannel::Master, volume);
    }

    /// Also applies the level to the currently active music source.
    pub fn set_music_volume(&mut self, volume: f32) {
        self.set_volume(VolumeChannel::Music, volume);
    }

    pub fn set_sfx_volume(&mut self, volume: f32) {
        self.set_volume(VolumeChannel::Sfx, volume);
    }

    /// Advances the backend clock and fades by the unscaled delta, emitter
    /// teardown by the scaled one.
    pub fn advance(&mut self, frame: FrameTime) {
        self.backend.advance(frame.unscaled_delta);
        self.music.tick(frame.unscaled_delta, self.volumes.music());
        self.emitters.advance(&mut self.backend, frame.scaled_delta());
    }

    pub fn master_volume(&self) -> f32 {
        self.volumes.master()
    }

    pub fn music_volume(&self) -> f32 {
        self.volumes.music()
    }

    pub fn sfx_volume(&self) -> f32 {
        self.volumes.sfx()
    }

    pub fn volumes(&self) -> &VolumeSettings {
        &self.volumes
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn music(&self) -> &MusicCrossfader<B::Source> {
        &self.music
    }

    pub fn voices(&self) -> &VoicePool<B::Source> {
        &self.voices
    }

    pub fn emitters(&self) -> &EmitterFactory<B::Source> {
        &self.emitters
    }

    /// Stops and destroys every source the engine owns and hands the backend back.
    pub fn shutdown(self) -> B {
        let AudioEngine {
            mut backend,
            music,
            voices,
            mut emitters,
            ..
        } = self;

        emitters.clear(&mut backend);
        let mut released = 0;
        for mut source in music.into_sources().into_iter().chain(voices.into_sources()) {
            source.stop();
            backend.destroy_source(source);
            released += 1;
        }

        log::info!("Audio engine shut down, {} sources released", released);
        backend
    }

    fn resolve_fade(&self, fade: Option<Duration>) -> Duration {
        fade.unwrap_or_else(|| self.config.default_fade_duration())
    }

    fn set_volume(&mut self, channel: VolumeChannel, volume: f32) {
        let volume = self.volumes.set(channel, volume);
        self.push_to_mixer(channel);
        if channel == VolumeChannel::Music {
            self.music.set_active_volume(volume);
        }
        self.persist(channel, volume);
        log::debug!("{} volume set to {:.3}", channel, volume);
    }

    fn push_to_mixer(&mut self, channel: VolumeChannel) {
        let value_db = self.volumes.attenuation(channel);
        let name = match channel {
            VolumeChannel::Master => self.config.master_param.as_str(),
            VolumeChannel::Music => self.config.music_param.as_str(),
            VolumeChannel::Sfx => self.config.sfx_param.as_str(),
        };
        if name.is_empty() {
            return;
        }
        let Some(mixer) = self.mixer.as_mut() else {
            return;
        };
        if let Err(e) = mixer.set_parameter(name, value_db) {
            log::warn!("Mixer rejected {} = {:.1} dB: {}", name, value_db, e);
        }
    }

    fn persist(&mut self, channel: VolumeChannel, volume: f32) {
        if !self.config.persist_enabled {
            return;
        }
        let Some(store) = self.store.as_mut() else {
            return;
        };
        if let Err(e) = store.save(channel.storage_key(), volume) {
            log::warn!("Could not persist {} volume: {}", channel, e);
        }
    }

    /// Stored levels replace the configured ones, clamped. Nothing is written back.
    fn load_persisted(&mut self) {
        let Some(store) = self.store.as_ref() else {
            log::debug!("Persistence enabled but no store attached");
            return;
        };
        for channel in VolumeChannel::ALL {
            if let Some(value) = store.load(channel.storage_key()) {
                let value = self.volumes.set(channel, value);
                log::debug!("Loaded {} volume {:.3}", channel, value);
            }
        }
    }
}

/// Process-scoped home for the one engine instance.
///
/// The first installed engine wins; later ones are shut down on arrival.
pub struct EngineSlot<B: AudioBackend> {
    engine: Option<AudioEngine<B>>,
}

impl<B: AudioBackend> Default for EngineSlot<B> {
    fn default() -> Self {
        Self { engine: None }
    }
}

impl<B: AudioBackend> EngineSlot<B> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false (and shuts `engine` down) if an engine is already installed.
    pub fn install(&mut self, engine: AudioEngine<B>) -> bool {
        if self.engine.is_some() {
            log::warn!("Audio engine already installed, discarding duplicate");
            engine.shutdown();
            return false;
        }
        self.engine = Some(engine);
        true
    }

    pub fn is_installed(&self) -> bool {
        self.engine.is_some()
    }

    pub fn get(&self) -> Option<&AudioEngine<B>> {
        self.engine.as_ref()
    }

    pub fn get_mut(&mut self) -> Option<&mut AudioEngine<B>> {
        self.engine.as_mut()
    }

    /// Shuts the installed engine down, returning its backend.
    pub fn teardown(&mut self) -> Option<B> {
        self.engine.take().map(AudioEngine::shutdown)
    }
}
