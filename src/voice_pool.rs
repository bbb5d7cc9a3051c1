//! Fixed set of reusable voices for overlapping sound effects.
//!
//! Voices are handed out round-robin. Allocation never blocks and never fails
//! while the pool is non-empty: the oldest voice is simply reused, cutting off
//! whatever it was still playing. There is no priority or "do not interrupt"
//! flag.

use crate::audio_data::AudioClip;
use crate::backend::PlaybackSource;
use crate::volume::clamp01;
use rand::Rng;
use rand::rngs::StdRng;

/// Optional arguments of a 2D effect request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SfxParams {
    /// Scales the sfx volume; clamped to [0, 1]
    pub volume_multiplier: f32,
    /// Inclusive pitch range sampled uniformly per request
    pub pitch_min: f32,
    pub pitch_max: f32,
}

impl Default for SfxParams {
    fn default() -> Self {
        Self {
            volume_multiplier: 1.0,
            pitch_min: 1.0,
            pitch_max: 1.0,
        }
    }
}

impl SfxParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn volume(mut self, multiplier: f32) -> Self {
        self.volume_multiplier = multiplier;
        self
    }

    pub fn pitch_range(mut self, min: f32, max: f32) -> Self {
        self.pitch_min = min;
        self.pitch_max = max;
        self
    }
}

pub struct VoicePool<S> {
    voices: Vec<S>,
    cursor: usize,
    overflow: Option<S>,
    rng: StdRng,
}

impl<S: PlaybackSource> VoicePool<S> {
    /// `overflow` is the shared fallback used when `voices` is empty.
    pub fn new(voices: Vec<S>, overflow: Option<S>, rng: StdRng) -> Self {
        Self {
            voices,
            cursor: 0,
            overflow,
            rng,
        }
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    /// Index of the voice the next [`allocate`](Self::allocate) returns.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn voices(&self) -> &[S] {
        &self.voices
    }

    pub fn overflow(&self) -> Option<&S> {
        self.overflow.as_ref()
    }

    /// Next voice in rotation, or `None` when the pool has no voices.
    pub fn allocate(&mut self) -> Option<&mut S> {
        if self.voices.is_empty() {
            return None;
        }
        let index = self.cursor;
        self.cursor = (self.cursor + 1) % self.voices.len();
        self.voices.get_mut(index)
    }

    /// Fires `clip` on the next voice (or the overflow source) at
    /// `sfx_volume * multiplier` with a random pitch from the requested range.
    ///
    /// Returns false when the request was dropped: no clip, or neither a
    /// pooled voice nor an overflow source exists.
    pub fn play_effect(
        &mut self,
        clip: Option<&AudioClip>,
        sfx_volume: f32,
        params: &SfxParams,
    ) -> bool {
        let Some(clip) = clip else {
            return false;
        };

        let pitch = pick_pitch(&mut self.rng, params.pitch_min, params.pitch_max);
        let volume = clamp01(sfx_volume) * clamp01(params.volume_multiplier);

        let index = self.cursor;
        let source = if self.voices.is_empty() {
            match self.overflow.as_mut() {
                Some(overflow) => {
                    log::debug!("Voice pool empty, using overflow source");
                    overflow
                }
                None => {
                    log::debug!("No voice available, dropping '{}'", clip.name());
                    return false;
                }
            }
        } else {
            self.cursor = (index + 1) % self.voices.len();
            &mut self.voices[index]
        };

        source.set_pitch(pitch);
        source.play_one_shot(clip, volume);
        log::debug!(
            "Effect '{}' on voice {} (volume {:.3}, pitch {:.3})",
            clip.name(),
            index,
            volume,
            pitch
        );
        true
    }

    /// Gives back every source the pool owns.
    pub(crate) fn into_sources(self) -> Vec<S> {
        let mut sources = self.voices;
        sources.extend(self.overflow);
        sources
    }
}

/// Uniform pick from the inclusive range. Non-finite bounds count as 1.0,
/// reversed bounds are swapped, and a range too wide to sample yields 1.0.
fn pick_pitch(rng: &mut StdRng, min: f32, max: f32) -> f32 {
    let sanitize = |p: f32| if p.is_finite() { p } else { 1.0 };
    let (mut lo, mut hi) = (sanitize(min), sanitize(max));
    if lo > hi {
        std::mem::swap(&mut lo, &mut hi);
    }
    if lo == hi {
        return lo;
    }
    if !(hi - lo).is_finite() {
        log::debug!("Pitch range {}..={} too wide, using 1.0", lo, hi);
        return 1.0;
    }
    rng.gen_range(lo..=hi)
}
