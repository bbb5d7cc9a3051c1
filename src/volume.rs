//! Volume model: normalized [0, 1] levels and their decibel form.
//!
//! UI sliders and gameplay code speak linear gain; mixers speak decibels.
//! [`to_attenuation`] bridges the two and [`VolumeSettings`] holds the three
//! persisted levels (master, music, sfx).

/// Attenuation reported for effectively silent input.
pub const SILENCE_FLOOR_DB: f32 = -80.0;

/// Linear levels at or below this are treated as silence.
pub const SILENCE_THRESHOLD: f32 = 0.0001;

/// Clamps `value` to [0, 1]. NaN maps to 0.
pub fn clamp01(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Converts a linear level into decibel attenuation.
///
/// Total over all inputs: anything at or below [`SILENCE_THRESHOLD`] (including
/// zero, negatives and NaN) yields [`SILENCE_FLOOR_DB`].
pub fn to_attenuation(linear: f32) -> f32 {
    if linear.is_nan() || linear <= SILENCE_THRESHOLD {
        return SILENCE_FLOOR_DB;
    }
    20.0 * linear.log10()
}

/// Converts decibel attenuation back into a linear gain.
///
/// The silence floor maps to exactly zero so a fully attenuated bus is mute
/// rather than merely quiet.
pub fn to_linear(db: f32) -> f32 {
    if db.is_nan() || db <= SILENCE_FLOOR_DB {
        return 0.0;
    }
    10f32.powf(db / 20.0)
}

/// One of the three independently persisted volume levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VolumeChannel {
    Master,
    Music,
    Sfx,
}

impl VolumeChannel {
    pub const ALL: [VolumeChannel; 3] = [Self::Master, Self::Music, Self::Sfx];

    /// Key used by the persistence store for this channel.
    pub fn storage_key(self) -> &'static str {
        match self {
            Self::Master => "Audio_MasterVolume",
            Self::Music => "Audio_MusicVolume",
            Self::Sfx => "Audio_SFXVolume",
        }
    }
}

impl std::fmt::Display for VolumeChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Master => "master",
            Self::Music => "music",
            Self::Sfx => "sfx",
        };
        f.write_str(name)
    }
}

/// The three normalized volume levels. Every write goes through [`clamp01`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeSettings {
    master: f32,
    music: f32,
    sfx: f32,
}

impl Default for VolumeSettings {
    fn default() -> Self {
        Self {
            master: 1.0,
            music: 1.0,
            sfx: 1.0,
        }
    }
}

impl VolumeSettings {
    pub fn new(master: f32, music: f32, sfx: f32) -> Self {
        Self {
            master: clamp01(master),
            music: clamp01(music),
            sfx: clamp01(sfx),
        }
    }

    pub fn master(&self) -> f32 {
        self.master
    }

    pub fn music(&self) -> f32 {
        self.music
    }

    pub fn sfx(&self) -> f32 {
        self.sfx
    }

    pub fn get(&self, channel: VolumeChannel) -> f32 {
        match channel {
            VolumeChannel::Master => self.master,
            VolumeChannel::Music => self.music,
            VolumeChannel::Sfx => self.sfx,
        }
    }

    /// Stores the clamped value and returns it.
    pub fn set(&mut self, channel: VolumeChannel, value: f32) -> f32 {
        let value = clamp01(value);
        match channel {
            VolumeChannel::Master => self.master = value,
            VolumeChannel::Music => self.music = value,
            VolumeChannel::Sfx => self.sfx = value,
        }
        value
    }

    /// Decibel form of a channel, as pushed to the mixer.
    pub fn attenuation(&self, channel: VolumeChannel) -> f32 {
        to_attenuation(self.get(channel))
    }
}
