//! Per-frame time handed to [`AudioEngine::advance`](crate::AudioEngine::advance).

use std::time::Duration;

/// Time elapsed since the previous tick.
///
/// Fades run on `unscaled_delta` so they finish on schedule while gameplay is
/// paused or slowed. Timed teardown follows gameplay time (`scaled_delta`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTime {
    pub unscaled_delta: Duration,
    pub time_scale: f32,
}

impl FrameTime {
    /// A tick at normal speed.
    pub fn new(delta: Duration) -> Self {
        Self {
            unscaled_delta: delta,
            time_scale: 1.0,
        }
    }

    pub fn from_secs_f32(delta: f32) -> Self {
        Self::new(Duration::try_from_secs_f32(delta).unwrap_or(Duration::ZERO))
    }

    pub fn with_time_scale(mut self, scale: f32) -> Self {
        self.time_scale = scale;
        self
    }

    /// Gameplay time for this tick. Negative or non-finite scales count as
    /// paused; a product too large for `Duration` saturates.
    pub fn scaled_delta(&self) -> Duration {
        if self.time_scale == 1.0 {
            return self.unscaled_delta;
        }
        if !self.time_scale.is_finite() || self.time_scale <= 0.0 {
            return Duration::ZERO;
        }
        let secs = self.unscaled_delta.as_secs_f64() * self.time_scale as f64;
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }
}
