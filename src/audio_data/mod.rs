//! Playable audio assets.
//!
//! [`AudioClip`] is the opaque asset handed to the engine. The engine core only
//! reads its duration; backends read its samples.

mod load_options;
mod resampler;
mod symphonia_loader;

use crate::error::{Result, TuneboxError};
pub use load_options::{Downmix, LoadOptions};
pub use resampler::AudioResampler;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub use symphonia_loader::load_audio_file;

/// Decoded, immutable audio asset. Cloning shares the sample data.
#[derive(Clone)]
pub struct AudioClip {
    inner: Arc<ClipInner>,
}

struct ClipInner {
    id: Uuid,
    name: String,
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u16,
    duration: Duration,
    total_frames: usize,
}

impl AudioClip {
    /// Builds a clip from interleaved samples.
    pub fn from_samples(
        name: impl Into<String>,
        samples: Vec<f32>,
        sample_rate: u32,
        channels: u16,
    ) -> Result<Self> {
        if sample_rate == 0 {
            return Err(TuneboxError::AudioFormat(
                "Sample rate must be greater than 0".to_string(),
            ));
        }
        if channels == 0 {
            return Err(TuneboxError::AudioFormat(
                "Channel count must be greater than 0".to_string(),
            ));
        }

        let total_frames = samples.len() / channels as usize;
        let duration = Duration::from_secs_f64(total_frames as f64 / sample_rate as f64);
        Ok(Self::assemble(
            name.into(),
            samples,
            sample_rate,
            channels,
            duration,
        ))
    }

    /// A mono clip of silence with exactly the given duration.
    pub fn silence(name: impl Into<String>, duration: Duration, sample_rate: u32) -> Self {
        let sample_rate = sample_rate.max(1);
        let frames = (duration.as_secs_f64() * sample_rate as f64).round() as usize;
        Self::assemble(name.into(), vec![0.0; frames], sample_rate, 1, duration)
    }

    /// Decodes an audio file with symphonia.
    pub fn from_path(path: impl AsRef<Path>, options: &LoadOptions) -> Result<Self> {
        load_audio_file(path.as_ref(), options)
    }

    fn assemble(
        name: String,
        samples: Vec<f32>,
        sample_rate: u32,
        channels: u16,
        duration: Duration,
    ) -> Self {
        let total_frames = samples.len() / channels as usize;
        Self {
            inner: Arc::new(ClipInner {
                id: Uuid::new_v4(),
                name,
                samples,
                sample_rate,
                channels,
                duration,
                total_frames,
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn sample_rate(&self) -> u32 {
        self.inner.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.inner.channels
    }

    pub fn duration(&self) -> Duration {
        self.inner.duration
    }

    /// Interleaved samples
    pub fn samples(&self) -> &[f32] {
        &self.inner.samples
    }

    pub fn total_frames(&self) -> usize {
        self.inner.total_frames
    }

    pub fn is_empty(&self) -> bool {
        self.inner.samples.is_empty()
    }

    /// Sample at `frame` for `channel`, repeating the last channel when the
    /// clip has fewer channels than requested.
    pub fn sample(&self, frame: usize, channel: usize) -> f32 {
        let channels = self.inner.channels as usize;
        let channel = channel.min(channels - 1);
        self.inner
            .samples
            .get(frame * channels + channel)
            .copied()
            .unwrap_or(0.0)
    }

    /// Get samples for a specific channel (0-indexed)
    pub fn channel_samples(&self, channel: usize) -> Result<Vec<f32>> {
        if channel >= self.inner.channels as usize {
            return Err(TuneboxError::AudioFormat(format!(
                "Channel {} out of range (max: {})",
                channel,
                self.inner.channels - 1
            )));
        }

        Ok(self
            .inner
            .samples
            .chunks(self.inner.channels as usize)
            .map(|frame| frame[channel])
            .collect())
    }

    /// Downmix all channels to mono
    pub fn to_mono(&self) -> Self {
        if self.inner.channels == 1 {
            return self.clone();
        }

        let channels = self.inner.channels as usize;
        let mono: Vec<f32> = self
            .inner
            .samples
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect();

        Self::assemble(
            self.inner.name.clone(),
            mono,
            self.inner.sample_rate,
            1,
            self.inner.duration,
        )
    }

    /// Resample to a different sample rate using rubato
    pub fn resample(&self, target_sample_rate: u32) -> Result<Self> {
        if target_sample_rate == self.inner.sample_rate {
            return Ok(self.clone());
        }

        let resampler = AudioResampler::new(
            self.inner.sample_rate,
            target_sample_rate,
            self.inner.channels,
            Some(1024),
        )?;
        let resampled = resampler.resample_interleaved(&self.inner.samples)?;

        Self::from_samples(
            self.inner.name.clone(),
            resampled,
            target_sample_rate,
            self.inner.channels,
        )
    }
}

impl PartialEq for AudioClip {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for AudioClip {}

impl std::fmt::Debug for AudioClip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioClip")
            .field("name", &self.inner.name)
            .field("sample_rate", &self.inner.sample_rate)
            .field("channels", &self.inner.channels)
            .field("duration", &self.inner.duration)
            .finish()
    }
}
