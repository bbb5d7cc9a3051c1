use std::time::Duration;

/// How decoded channels are reduced before the clip is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Downmix {
    /// Keep every channel
    #[default]
    Keep,
    /// Average all channels into one
    Average,
    /// Keep a single channel by index
    Channel(usize),
}

/// Options applied while decoding a clip from disk.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Resample to this rate after decoding
    pub sample_rate: Option<u32>,
    pub downmix: Downmix,
    /// Stop decoding after this much audio
    pub max_duration: Option<Duration>,
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sample_rate(mut self, rate: u32) -> Self {
        self.sample_rate = Some(rate);
        self
    }

    pub fn downmix(mut self, downmix: Downmix) -> Self {
        self.downmix = downmix;
        self
    }

    /// Shorthand for [`Downmix::Average`], the usual choice for positional effects.
    pub fn mono(self) -> Self {
        self.downmix(Downmix::Average)
    }

    pub fn max_duration(mut self, duration: Duration) -> Self {
        self.max_duration = Some(duration);
        self
    }
}
