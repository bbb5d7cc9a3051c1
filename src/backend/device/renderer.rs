// Renderer - owns all voice state on the audio thread.
// The game thread only ever talks to it through RenderCommand.

use crate::audio_data::AudioClip;
use crate::backend::SourceRole;
use crate::math::{Pose, Vec3, lerp};
use crossbeam_channel::Receiver;
use std::collections::HashMap;
use std::f32::consts::{FRAC_PI_4, SQRT_2};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub(crate) type VoiceId = u64;

/// Distance below which spatial voices are not attenuated further.
const MIN_ROLLOFF_DISTANCE: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Bus {
    Master,
    Music,
    Effect,
}

/// Commands from the game thread. Applied in order at the start of each callback.
#[derive(Debug)]
pub(crate) enum RenderCommand {
    AddVoice {
        voice: VoiceId,
        role: SourceRole,
        finished: Arc<AtomicBool>,
    },
    RemoveVoice(VoiceId),
    SetClip(VoiceId, Option<AudioClip>),
    SetLooping(VoiceId, bool),
    SetVolume(VoiceId, f32),
    SetPitch(VoiceId, f32),
    SetSpatialBlend(VoiceId, f32),
    SetPosition(VoiceId, Vec3),
    Play(VoiceId),
    PlayOneShot {
        voice: VoiceId,
        clip: AudioClip,
        volume: f32,
    },
    Stop(VoiceId),
    SetListener(Pose),
    SetBusGain(Bus, f32),
}

/// Read head over a clip, in source frames.
struct Cursor {
    clip: AudioClip,
    position: f64,
    gain: f32,
}

impl Cursor {
    fn new(clip: AudioClip, gain: f32) -> Self {
        Self {
            clip,
            position: 0.0,
            gain,
        }
    }

    fn is_finished(&self) -> bool {
        self.position >= self.clip.total_frames() as f64
    }

    /// Linearly interpolated sample between the two neighbouring frames.
    fn sample(&self, channel: usize) -> f32 {
        let index = self.position.floor();
        let frac = (self.position - index) as f32;
        let index = index as usize;
        let a = self.clip.sample(index, channel);
        let b = self.clip.sample(index + 1, channel);
        a + (b - a) * frac
    }
}

struct Voice {
    role: SourceRole,
    clip: Option<AudioClip>,
    main: Option<Cursor>,
    shot: Option<Cursor>,
    looping: bool,
    volume: f32,
    pitch: f32,
    spatial_blend: f32,
    position: Vec3,
    finished: Arc<AtomicBool>,
}

impl Voice {
    fn new(role: SourceRole, finished: Arc<AtomicBool>) -> Self {
        Self {
            role,
            clip: None,
            main: None,
            shot: None,
            looping: false,
            volume: 1.0,
            pitch: 1.0,
            spatial_blend: 0.0,
            position: Vec3::ZERO,
            finished,
        }
    }

    fn is_silent(&self) -> bool {
        self.main.is_none() && self.shot.is_none()
    }
}

pub(crate) struct Renderer {
    receiver: Receiver<RenderCommand>,
    voices: HashMap<VoiceId, Voice>,
    listener: Pose,
    master_gain: f32,
    music_gain: f32,
    effect_gain: f32,
    device_rate: u32,
}

impl Renderer {
    pub fn new(receiver: Receiver<RenderCommand>, device_rate: u32, max_voices: usize) -> Self {
        Self {
            receiver,
            voices: HashMap::with_capacity(max_voices),
            listener: Pose::identity(),
            master_gain: 1.0,
            music_gain: 1.0,
            effect_gain: 1.0,
            device_rate: device_rate.max(1),
        }
    }

    #[cfg(test)]
    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    fn apply_pending_commands(&mut self) {
        while let Ok(command) = self.receiver.try_recv() {
            self.apply(command);
        }
    }

    fn apply(&mut self, command: RenderCommand) {
        match command {
            RenderCommand::AddVoice {
                voice,
                role,
                finished,
            } => {
                self.voices.insert(voice, Voice::new(role, finished));
            }
            RenderCommand::RemoveVoice(voice) => {
                self.voices.remove(&voice);
            }
            RenderCommand::SetListener(pose) => self.listener = pose,
            RenderCommand::SetBusGain(bus, gain) => match bus {
                Bus::Master => self.master_gain = gain,
                Bus::Music => self.music_gain = gain,
                Bus::Effect => self.effect_gain = gain,
            },
            RenderCommand::SetClip(id, clip) => {
                if let Some(voice) = self.voices.get_mut(&id) {
                    // Reassigning the clip cuts the current playback
                    voice.clip = clip;
                    voice.main = None;
                }
            }
            RenderCommand::SetLooping(id, looping) => {
                if let Some(voice) = self.voices.get_mut(&id) {
                    voice.looping = looping;
                }
            }
            RenderCommand::SetVolume(id, volume) => {
                if let Some(voice) = self.voices.get_mut(&id) {
                    voice.volume = volume;
                }
            }
            RenderCommand::SetPitch(id, pitch) => {
                if let Some(voice) = self.voices.get_mut(&id) {
                    voice.pitch = pitch;
                }
            }
            RenderCommand::SetSpatialBlend(id, blend) => {
                if let Some(voice) = self.voices.get_mut(&id) {
                    voice.spatial_blend = blend;
                }
            }
            RenderCommand::SetPosition(id, position) => {
                if let Some(voice) = self.voices.get_mut(&id) {
                    voice.position = position;
                }
            }
            RenderCommand::Play(id) => {
                if let Some(voice) = self.voices.get_mut(&id) {
                    voice.main = voice.clip.clone().map(|clip| Cursor::new(clip, 1.0));
                    voice.finished.store(voice.main.is_none(), Ordering::Relaxed);
                }
            }
            RenderCommand::PlayOneShot { voice, clip, volume } => {
                if let Some(voice) = self.voices.get_mut(&voice) {
                    voice.shot = Some(Cursor::new(clip, volume));
                }
            }
            RenderCommand::Stop(id) => {
                if let Some(voice) = self.voices.get_mut(&id) {
                    voice.main = None;
                    voice.shot = None;
                }
            }
        }
    }

    /// Mixes every active voice into `buffer` (interleaved, `channels` wide).
    /// Returns the number of frames written.
    pub fn render(&mut self, buffer: &mut [f32], channels: u16) -> usize {
        self.apply_pending_commands();
        buffer.fill(0.0);

        let channels = channels.max(1) as usize;
        let frames = buffer.len() / channels;
        let device_rate = self.device_rate as f64;
        let listener = self.listener;

        for voice in self.voices.values_mut() {
            if voice.is_silent() {
                continue;
            }

            let bus = self.master_gain
                * match voice.role {
                    SourceRole::Music => self.music_gain,
                    SourceRole::Effect => self.effect_gain,
                };
            let pan = spatial_gains(&listener, voice.position, voice.spatial_blend);
            let pitch = if voice.pitch.is_finite() && voice.pitch > 0.0 {
                voice.pitch as f64
            } else {
                1.0
            };

            if let Some(cursor) = voice.main.as_mut() {
                let step = cursor.clip.sample_rate() as f64 / device_rate * pitch;
                let gain = voice.volume * bus;
                if !mix_cursor(cursor, buffer, channels, frames, step, gain, pan, voice.looping) {
                    voice.main = None;
                    voice.finished.store(true, Ordering::Relaxed);
                }
            }

            if let Some(cursor) = voice.shot.as_mut() {
                let step = cursor.clip.sample_rate() as f64 / device_rate * pitch;
                let gain = cursor.gain * voice.volume * bus;
                if !mix_cursor(cursor, buffer, channels, frames, step, gain, pan, false) {
                    voice.shot = None;
                }
            }
        }

        frames
    }
}

/// Per-channel gains (left, right) for a voice at `position`.
///
/// Blend 0 is flat; blend 1 is inverse-distance rolloff with an equal-power pan.
fn spatial_gains(listener: &Pose, position: Vec3, blend: f32) -> (f32, f32) {
    if blend <= 0.0 {
        return (1.0, 1.0);
    }

    let offset = position - listener.position;
    let distance = offset.length();
    let rolloff = 1.0 / distance.max(MIN_ROLLOFF_DISTANCE);
    let pan = if distance > f32::EPSILON {
        (offset / distance).dot(listener.right()).clamp(-1.0, 1.0)
    } else {
        0.0
    };

    let angle = (pan + 1.0) * FRAC_PI_4;
    let left = angle.cos() * SQRT_2 * rolloff;
    let right = angle.sin() * SQRT_2 * rolloff;
    (lerp(1.0, left, blend), lerp(1.0, right, blend))
}

/// Adds `frames` frames of `cursor` into `buffer`. Returns false once the
/// cursor ran off the end of a non-looping clip.
#[allow(clippy::too_many_arguments)]
fn mix_cursor(
    cursor: &mut Cursor,
    buffer: &mut [f32],
    channels: usize,
    frames: usize,
    step: f64,
    gain: f32,
    (left, right): (f32, f32),
    looping: bool,
) -> bool {
    let total = cursor.clip.total_frames() as f64;
    if total == 0.0 {
        return false;
    }

    for frame in 0..frames {
        if cursor.is_finished() {
            if !looping {
                return false;
            }
            cursor.position %= total;
        }

        for channel in 0..channels {
            let channel_gain = match (channels, channel) {
                (1, _) => (left + right) * 0.5,
                (_, 0) => left,
                (_, 1) => right,
                _ => (left + right) * 0.5,
            };
            buffer[frame * channels + channel] += cursor.sample(channel) * gain * channel_gain;
        }

        cursor.position += step;
    }

    looping || !cursor.is_finished()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    fn constant_clip(value: f32, frames: usize, rate: u32) -> AudioClip {
        AudioClip::from_samples("dc", vec![value; frames], rate, 1).unwrap()
    }

    fn renderer() -> (crossbeam_channel::Sender<RenderCommand>, Renderer, Arc<AtomicBool>) {
        let (tx, rx) = unbounded();
        let finished = Arc::new(AtomicBool::new(false));
        tx.send(RenderCommand::AddVoice {
            voice: 1,
            role: SourceRole::Music,
            finished: finished.clone(),
        })
        .unwrap();
        (tx, Renderer::new(rx, 100, 4), finished)
    }

    #[test]
    fn test_main_playback_applies_volume_and_bus() {
        let (tx, mut renderer, _) = renderer();
        tx.send(RenderCommand::SetClip(1, Some(constant_clip(1.0, 100, 100))))
            .unwrap();
        tx.send(RenderCommand::SetVolume(1, 0.5)).unwrap();
        tx.send(RenderCommand::SetBusGain(Bus::Music, 0.5)).unwrap();
        tx.send(RenderCommand::Play(1)).unwrap();

        let mut buffer = vec![0.0; 8];
        assert_eq!(renderer.render(&mut buffer, 2), 4);
        assert!(buffer.iter().all(|s| (*s - 0.25).abs() < 1e-6));
    }

    #[test]
    fn test_non_looping_clip_finishes() {
        let (tx, mut renderer, finished) = renderer();
        tx.send(RenderCommand::SetClip(1, Some(constant_clip(1.0, 3, 100))))
            .unwrap();
        tx.send(RenderCommand::Play(1)).unwrap();

        let mut buffer = vec![0.0; 5];
        renderer.render(&mut buffer, 1);
        assert_eq!(&buffer[3..], &[0.0, 0.0]);
        assert!(finished.load(Ordering::Relaxed));
    }

    #[test]
    fn test_looping_clip_wraps() {
        let (tx, mut renderer, finished) = renderer();
        tx.send(RenderCommand::SetClip(1, Some(constant_clip(1.0, 3, 100))))
            .unwrap();
        tx.send(RenderCommand::SetLooping(1, true)).unwrap();
        tx.send(RenderCommand::Play(1)).unwrap();

        let mut buffer = vec![0.0; 7];
        renderer.render(&mut buffer, 1);
        assert!(buffer.iter().all(|s| *s > 0.0));
        assert!(!finished.load(Ordering::Relaxed));
    }

    #[test]
    fn test_one_shot_preempts_previous() {
        let (tx, mut renderer, _) = renderer();
        tx.send(RenderCommand::PlayOneShot {
            voice: 1,
            clip: constant_clip(1.0, 10, 100),
            volume: 1.0,
        })
        .unwrap();
        tx.send(RenderCommand::PlayOneShot {
            voice: 1,
            clip: constant_clip(1.0, 10, 100),
            volume: 0.25,
        })
        .unwrap();

        let mut buffer = vec![0.0; 2];
        renderer.render(&mut buffer, 1);
        assert!(buffer.iter().all(|s| (*s - 0.25).abs() < 1e-6));
    }

    #[test]
    fn test_removed_voice_is_gone() {
        let (tx, mut renderer, _) = renderer();
        let mut buffer = vec![0.0; 2];
        renderer.render(&mut buffer, 1);
        assert_eq!(renderer.voice_count(), 1);
        tx.send(RenderCommand::RemoveVoice(1)).unwrap();
        renderer.render(&mut buffer, 1);
        assert_eq!(renderer.voice_count(), 0);
    }

    #[test]
    fn test_spatial_gains() {
        let listener = Pose::identity();
        assert_eq!(spatial_gains(&listener, Vec3::new(50.0, 0.0, 0.0), 0.0), (1.0, 1.0));

        let (left, right) = spatial_gains(&listener, Vec3::new(2.0, 0.0, 0.0), 1.0);
        assert!(left.abs() < 1e-5);
        assert!((right - SQRT_2 * 0.5).abs() < 1e-5);

        let (left, right) = spatial_gains(&listener, Vec3::new(0.0, 0.0, -0.5), 1.0);
        assert!((left - 1.0).abs() < 1e-5);
        assert!((right - 1.0).abs() < 1e-5);
    }
}
