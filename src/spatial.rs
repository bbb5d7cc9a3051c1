//! Fire-and-forget positional effects.
//!
//! Each request gets its own freshly created source anchored at a world
//! position. Emitters live in an arena keyed by id, with a min-heap of
//! teardown deadlines checked every tick. Callers never get a handle back.

use crate::audio_data::AudioClip;
use crate::backend::{AudioBackend, PlaybackSource, SourceRole};
use crate::math::Vec3;
use crate::volume::clamp01;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::time::Duration;

/// Extra lifetime past the clip's end before an emitter is torn down.
pub const TEARDOWN_GRACE: Duration = Duration::from_millis(100);

/// Optional arguments of a positional effect request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialParams {
    /// Scales the sfx volume; clamped to [0, 1]
    pub volume_multiplier: f32,
    /// 0 = non-positional, 1 = fully positional; clamped to [0, 1]
    pub spatial_blend: f32,
}

impl Default for SpatialParams {
    fn default() -> Self {
        Self {
            volume_multiplier: 1.0,
            spatial_blend: 1.0,
        }
    }
}

impl SpatialParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn volume(mut self, multiplier: f32) -> Self {
        self.volume_multiplier = multiplier;
        self
    }

    pub fn spatial_blend(mut self, blend: f32) -> Self {
        self.spatial_blend = blend;
        self
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct EmitterId(u64);

struct SpatialEmitter<S> {
    position: Vec3,
    source: S,
    clip_name: String,
}

pub struct EmitterFactory<S> {
    emitters: HashMap<EmitterId, SpatialEmitter<S>>,
    deadlines: BinaryHeap<Reverse<(Duration, EmitterId)>>,
    next_id: u64,
    clock: Duration,
}

impl<S> Default for EmitterFactory<S> {
    fn default() -> Self {
        Self {
            emitters: HashMap::new(),
            deadlines: BinaryHeap::new(),
            next_id: 0,
            clock: Duration::ZERO,
        }
    }
}

impl<S: PlaybackSource> EmitterFactory<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emitters still waiting for teardown
    pub fn live_count(&self) -> usize {
        self.emitters.len()
    }

    /// Gameplay time accumulated by [`advance`](Self::advance)
    pub fn clock(&self) -> Duration {
        self.clock
    }

    /// Creates a source at `position`, starts `clip` on it and schedules
    /// teardown at `clip.duration() + TEARDOWN_GRACE` from now.
    ///
    /// Returns false when nothing was started (no clip, or the backend could
    /// not create a source).
    pub fn play_at_position<B>(
        &mut self,
        backend: &mut B,
        clip: Option<&AudioClip>,
        position: Vec3,
        sfx_volume: f32,
        params: &SpatialParams,
    ) -> bool
    where
        B: AudioBackend<Source = S>,
    {
        let Some(clip) = clip else {
            return false;
        };

        let label = format!("SFX_3D_{}", clip.name());
        let mut source = match backend.create_source(SourceRole::Effect, &label) {
            Ok(source) => source,
            Err(e) => {
                log::warn!("Dropping positional effect '{}': {}", clip.name(), e);
                return false;
            }
        };

        source.set_position(position);
        source.set_clip(Some(clip.clone()));
        source.set_spatial_blend(clamp01(params.spatial_blend));
        source.set_volume(clamp01(sfx_volume) * clamp01(params.volume_multiplier));
        source.play();

        let id = EmitterId(self.next_id);
        self.next_id += 1;
        let deadline = self
            .clock
            .saturating_add(clip.duration())
            .saturating_add(TEARDOWN_GRACE);
        self.deadlines.push(Reverse((deadline, id)));
        self.emitters.insert(
            id,
            SpatialEmitter {
                position,
                source,
                clip_name: clip.name().to_string(),
            },
        );

        log::debug!(
            "Emitter {:?} '{}' at {:?}, teardown at {:?}",
            id,
            clip.name(),
            position,
            deadline
        );
        true
    }

    /// Advances gameplay time and destroys every emitter whose deadline passed.
    pub fn advance<B>(&mut self, backend: &mut B, delta: Duration)
    where
        B: AudioBackend<Source = S>,
    {
        self.clock = self.clock.saturating_add(delta);

        while let Some(Reverse((deadline, id))) = self.deadlines.peek().copied() {
            if deadline > self.clock {
                break;
            }
            self.deadlines.pop();

            if let Some(mut emitter) = self.emitters.remove(&id) {
                log::debug!(
                    "Emitter {:?} '{}' at {:?} expired",
                    id,
                    emitter.clip_name,
                    emitter.position
                );
                emitter.source.stop();
                backend.destroy_source(emitter.source);
            }
        }
    }

    /// Destroys every live emitter immediately.
    pub fn clear<B>(&mut self, backend: &mut B)
    where
        B: AudioBackend<Source = S>,
    {
        self.deadlines.clear();
        for (_, mut emitter) in self.emitters.drain() {
            emitter.source.stop();
            backend.destroy_source(emitter.source);
        }
    }
}
