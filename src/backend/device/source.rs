use super::renderer::{RenderCommand, VoiceId};
use crate::audio_data::AudioClip;
use crate::backend::{PlaybackSource, SourceRole};
use crate::math::Vec3;
use crate::volume::clamp01;
use crossbeam_channel::Sender;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Game-thread handle to a voice rendered on the audio thread.
///
/// Keeps a mirror of the voice state so getters never wait on the audio
/// thread. Dropping the handle removes the voice.
pub struct CpalSource {
    id: VoiceId,
    label: String,
    role: SourceRole,
    sender: Sender<RenderCommand>,
    finished: Arc<AtomicBool>,
    clip: Option<AudioClip>,
    looping: bool,
    volume: f32,
    pitch: f32,
    spatial_blend: f32,
    position: Vec3,
    playing: bool,
}

impl CpalSource {
    pub(crate) fn new(
        id: VoiceId,
        role: SourceRole,
        label: &str,
        sender: Sender<RenderCommand>,
    ) -> Self {
        let finished = Arc::new(AtomicBool::new(true));
        send(
            &sender,
            RenderCommand::AddVoice {
                voice: id,
                role,
                finished: finished.clone(),
            },
        );
        Self {
            id,
            label: label.to_string(),
            role,
            sender,
            finished,
            clip: None,
            looping: false,
            volume: 1.0,
            pitch: 1.0,
            spatial_blend: 0.0,
            position: Vec3::ZERO,
            playing: false,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn role(&self) -> SourceRole {
        self.role
    }
}

fn send(sender: &Sender<RenderCommand>, command: RenderCommand) {
    if let Err(e) = sender.send(command) {
        log::warn!("Audio thread is gone, dropping {:?}", e.into_inner());
    }
}

impl PlaybackSource for CpalSource {
    fn set_clip(&mut self, clip: Option<AudioClip>) {
        self.clip = clip.clone();
        self.playing = false;
        send(&self.sender, RenderCommand::SetClip(self.id, clip));
    }

    fn clip(&self) -> Option<&AudioClip> {
        self.clip.as_ref()
    }

    fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
        send(&self.sender, RenderCommand::SetLooping(self.id, looping));
    }

    fn is_looping(&self) -> bool {
        self.looping
    }

    fn set_volume(&mut self, volume: f32) {
        let volume = clamp01(volume);
        if volume != self.volume {
            self.volume = volume;
            send(&self.sender, RenderCommand::SetVolume(self.id, volume));
        }
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn set_pitch(&mut self, pitch: f32) {
        self.pitch = pitch;
        send(&self.sender, RenderCommand::SetPitch(self.id, pitch));
    }

    fn pitch(&self) -> f32 {
        self.pitch
    }

    fn set_spatial_blend(&mut self, blend: f32) {
        self.spatial_blend = clamp01(blend);
        send(
            &self.sender,
            RenderCommand::SetSpatialBlend(self.id, self.spatial_blend),
        );
    }

    fn spatial_blend(&self) -> f32 {
        self.spatial_blend
    }

    fn set_position(&mut self, position: Vec3) {
        self.position = position;
        send(&self.sender, RenderCommand::SetPosition(self.id, position));
    }

    fn position(&self) -> Vec3 {
        self.position
    }

    fn play(&mut self) {
        if self.clip.is_none() {
            return;
        }
        self.playing = true;
        self.finished.store(false, Ordering::Relaxed);
        send(&self.sender, RenderCommand::Play(self.id));
    }

    fn play_one_shot(&mut self, clip: &AudioClip, volume: f32) {
        send(
            &self.sender,
            RenderCommand::PlayOneShot {
                voice: self.id,
                clip: clip.clone(),
                volume: clamp01(volume),
            },
        );
    }

    fn stop(&mut self) {
        self.playing = false;
        send(&self.sender, RenderCommand::Stop(self.id));
    }

    fn is_playing(&self) -> bool {
        self.playing && !self.finished.load(Ordering::Relaxed)
    }
}

impl Drop for CpalSource {
    fn drop(&mut self) {
        // The audio thread may already be gone during shutdown
        let _ = self.sender.send(RenderCommand::RemoveVoice(self.id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::device::renderer::Renderer;
    use crossbeam_channel::unbounded;
    use std::time::Duration;

    #[test]
    fn test_handle_tracks_playback_end() {
        let (tx, rx) = unbounded();
        let mut renderer = Renderer::new(rx, 100, 4);
        let mut source = CpalSource::new(7, SourceRole::Effect, "voice", tx);

        source.play();
        assert!(!source.is_playing(), "no clip assigned");

        source.set_clip(Some(AudioClip::silence("s", Duration::from_millis(20), 100)));
        source.play();
        assert!(source.is_playing());

        let mut buffer = vec![0.0; 4];
        renderer.render(&mut buffer, 1);
        assert!(!source.is_playing());
    }

    #[test]
    fn test_drop_removes_voice() {
        let (tx, rx) = unbounded();
        let mut renderer = Renderer::new(rx, 100, 4);
        let source = CpalSource::new(1, SourceRole::Music, "music", tx);
        let mut buffer = vec![0.0; 2];
        renderer.render(&mut buffer, 1);
        assert_eq!(renderer.voice_count(), 1);

        drop(source);
        renderer.render(&mut buffer, 1);
        assert_eq!(renderer.voice_count(), 0);
    }

    #[test]
    fn test_volume_is_clamped() {
        let (tx, _rx) = unbounded();
        let mut source = CpalSource::new(1, SourceRole::Music, "music", tx);
        source.set_volume(4.0);
        assert_eq!(source.volume(), 1.0);
        source.set_spatial_blend(-2.0);
        assert_eq!(source.spatial_blend(), 0.0);
    }
}
