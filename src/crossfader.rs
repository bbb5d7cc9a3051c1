//! Two-slot music player with timed linear crossfades.
//!
//! One slot is *active* (audible, at the music volume), the other *standby*.
//! A play request loads the standby slot, starts it silent and fades it in
//! while the active slot fades out. The roles swap as soon as the fade is
//! started, so a later request already sees the new track as active.
//!
//! Fades are plain records advanced by [`MusicCrossfader::tick`]. Nothing
//! cancels them: a second request during a fade starts another one that
//! overlaps the first.

use crate::audio_data::AudioClip;
use crate::backend::PlaybackSource;
use crate::math::lerp;
use std::time::Duration;

/// Optional arguments of a music request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MusicParams {
    /// Fade length; `None` uses the configured default
    pub fade: Option<Duration>,
    pub looping: bool,
}

impl Default for MusicParams {
    fn default() -> Self {
        Self {
            fade: None,
            looping: true,
        }
    }
}

impl MusicParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fade(mut self, fade: Duration) -> Self {
        self.fade = Some(fade);
        self
    }

    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossfadeState {
    Idle,
    Fading,
}

#[derive(Debug, Clone, Copy)]
enum FadeKind {
    /// Outgoing slot ramps from `start_from` to 0, incoming from 0 to the music volume
    Crossfade { from: usize, start_from: f32 },
    /// One slot ramps from `start` to 0 and stops
    FadeOut { slot: usize, start: f32 },
}

#[derive(Debug, Clone, Copy)]
struct FadeTask {
    kind: FadeKind,
    elapsed: Duration,
    duration: Duration,
}

impl FadeTask {
    fn progress(&self) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (self.elapsed.as_secs_f32() / self.duration.as_secs_f32()).clamp(0.0, 1.0)
    }

    fn is_done(&self) -> bool {
        self.elapsed >= self.duration
    }
}

pub struct MusicCrossfader<S> {
    slots: Option<[S; 2]>,
    active: usize,
    fades: Vec<FadeTask>,
}

impl<S: PlaybackSource> MusicCrossfader<S> {
    /// `None` builds a crossfader whose requests are all no-ops.
    pub fn new(slots: Option<[S; 2]>) -> Self {
        Self {
            slots,
            active: 0,
            fades: Vec::new(),
        }
    }

    pub fn is_available(&self) -> bool {
        self.slots.is_some()
    }

    pub fn state(&self) -> CrossfadeState {
        if self.fades.is_empty() {
            CrossfadeState::Idle
        } else {
            CrossfadeState::Fading
        }
    }

    /// Fades still running (more than one only after overlapping requests)
    pub fn pending_fades(&self) -> usize {
        self.fades.len()
    }

    pub fn active(&self) -> Option<&S> {
        self.slots.as_ref().map(|slots| &slots[self.active])
    }

    pub fn standby(&self) -> Option<&S> {
        self.slots.as_ref().map(|slots| &slots[1 - self.active])
    }

    /// Starts `clip` on the standby slot and crossfades to it over `fade`.
    ///
    /// A zero fade completes before returning. Returns false when the
    /// crossfader has no sources.
    pub fn play(
        &mut self,
        clip: &AudioClip,
        fade: Duration,
        looping: bool,
        music_volume: f32,
    ) -> bool {
        let Some(slots) = self.slots.as_mut() else {
            log::warn!("Music sources missing, ignoring '{}'", clip.name());
            return false;
        };

        let from = self.active;
        let to = 1 - from;

        let incoming = &mut slots[to];
        incoming.set_clip(Some(clip.clone()));
        incoming.set_looping(looping);
        incoming.set_volume(0.0);
        incoming.play();

        let start_from = slots[from].volume();
        self.active = to;

        log::info!(
            "Crossfading music to '{}' over {:?} (slot {} -> {})",
            clip.name(),
            fade,
            from,
            to
        );

        self.start(
            FadeTask {
                kind: FadeKind::Crossfade { from, start_from },
                elapsed: Duration::ZERO,
                duration: fade,
            },
            music_volume,
        );
        true
    }

    /// Fades the active slot to silence and stops it. No-op unless it is playing.
    pub fn stop(&mut self, fade: Duration) -> bool {
        let Some(slots) = self.slots.as_ref() else {
            return false;
        };
        let source = &slots[self.active];
        if !source.is_playing() {
            return false;
        }

        log::info!("Fading out music over {:?}", fade);
        let task = FadeTask {
            kind: FadeKind::FadeOut {
                slot: self.active,
                start: source.volume(),
            },
            elapsed: Duration::ZERO,
            duration: fade,
        };
        self.start(task, 0.0);
        true
    }

    /// Sets the active slot's volume directly.
    pub fn set_active_volume(&mut self, volume: f32) {
        if let Some(slots) = self.slots.as_mut() {
            slots[self.active].set_volume(volume);
        }
    }

    /// Advances every running fade by `delta`. `music_volume` is the target
    /// level for incoming slots.
    pub fn tick(&mut self, delta: Duration, music_volume: f32) {
        let Some(slots) = self.slots.as_mut() else {
            return;
        };

        self.fades.retain_mut(|task| {
            task.elapsed = task.elapsed.saturating_add(delta);
            apply(&mut *slots, task, music_volume);
            !task.is_done()
        });
    }

    fn start(&mut self, task: FadeTask, music_volume: f32) {
        if task.duration.is_zero() {
            if let Some(slots) = self.slots.as_mut() {
                apply(slots, &task, music_volume);
            }
            return;
        }
        self.fades.push(task);
    }

    pub(crate) fn into_sources(self) -> Vec<S> {
        self.slots.map(Vec::from).unwrap_or_default()
    }
}

fn pair_mut<S>(slots: &mut [S; 2], first: usize) -> (&mut S, &mut S) {
    let [a, b] = slots;
    if first == 0 { (a, b) } else { (b, a) }
}

/// Writes the volumes for the task's current progress, finishing it when done.
fn apply<S: PlaybackSource>(slots: &mut [S; 2], task: &FadeTask, music_volume: f32) {
    let t = task.progress();
    let done = task.is_done();

    match task.kind {
        FadeKind::Crossfade { from, start_from } => {
            let (outgoing, incoming) = pair_mut(slots, from);
            if done {
                outgoing.stop();
                outgoing.set_volume(0.0);
                incoming.set_volume(music_volume);
                log::debug!("Crossfade finished, slot {} stopped", from);
            } else {
                outgoing.set_volume(lerp(start_from, 0.0, t));
                incoming.set_volume(lerp(0.0, music_volume, t));
            }
        }
        FadeKind::FadeOut { slot, start } => {
            let source = &mut slots[slot];
            if done {
                source.stop();
                source.set_volume(0.0);
                log::debug!("Music fade-out finished on slot {}", slot);
            } else {
                source.set_volume(lerp(start, 0.0, t));
            }
        }
    }
}
