//! Real output through cpal.
//!
//! The game thread owns [`CpalBackend`], its [`CpalSource`] handles and the
//! [`CpalMixer`]. Every mutation becomes a [`RenderCommand`] on a single
//! crossbeam channel; the audio callback drains it before mixing, so voice
//! state has exactly one writer.

mod renderer;
mod source;

use crate::backend::{AudioBackend, Mixer, SourceRole};
use crate::config::{DeviceConfig, EngineConfig};
use crate::error::{Result, TuneboxError};
use crate::math::Pose;
use crate::volume::to_linear;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SizedSample};
use crossbeam_channel::Sender;
use renderer::{Bus, RenderCommand, Renderer, VoiceId};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

pub use source::CpalSource;

/// Backend that renders voices to the default output device.
pub struct CpalBackend {
    stream: Option<cpal::Stream>,
    sample_rate: u32,
    channels: u16,
    device_name: String,
    is_running: Arc<AtomicBool>,
    frames_processed: Arc<AtomicUsize>,
    command_sender: Sender<RenderCommand>,
    next_voice: VoiceId,
}

impl CpalBackend {
    /// Opens the default output device and starts the stream.
    pub fn start(desc: DeviceConfig) -> Result<Self> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or_else(|| {
            TuneboxError::AudioDevice("No default output device available".into())
        })?;
        let device_name = device
            .name()
            .unwrap_or_else(|_| "Unknown Device".to_string());

        let default_config = device.default_output_config().map_err(|e| {
            TuneboxError::AudioDevice(format!("Failed to get default config: {}", e))
        })?;

        let mut config: cpal::StreamConfig = default_config.config();
        if let Some(frames) = desc.buffer_size {
            config.buffer_size = cpal::BufferSize::Fixed(frames);
        }

        let sample_rate = config.sample_rate.0;
        let channels = config.channels;
        let (command_sender, command_receiver) = crossbeam_channel::unbounded();
        let renderer = Renderer::new(command_receiver, sample_rate, desc.max_voices);
        let is_running = Arc::new(AtomicBool::new(true));
        let frames_processed = Arc::new(AtomicUsize::new(0));

        let stream = match default_config.sample_format() {
            cpal::SampleFormat::F32 => create_stream::<f32>(
                &device,
                &config,
                renderer,
                is_running.clone(),
                frames_processed.clone(),
            )?,
            cpal::SampleFormat::I16 => create_stream::<i16>(
                &device,
                &config,
                renderer,
                is_running.clone(),
                frames_processed.clone(),
            )?,
            cpal::SampleFormat::U16 => create_stream::<u16>(
                &device,
                &config,
                renderer,
                is_running.clone(),
                frames_processed.clone(),
            )?,
            other => {
                return Err(TuneboxError::AudioFormat(format!(
                    "Unsupported sample format: {:?}",
                    other
                )));
            }
        };

        stream
            .play()
            .map_err(|e| TuneboxError::AudioDevice(format!("Failed to start stream: {}", e)))?;

        log::info!(
            "Audio device '{}' opened: {} Hz, {} channels",
            device_name,
            sample_rate,
            channels
        );

        Ok(Self {
            stream: Some(stream),
            sample_rate,
            channels,
            device_name,
            is_running,
            frames_processed,
            command_sender,
            next_voice: 0,
        })
    }

    /// Stops the stream. Sources created earlier become silent no-ops.
    pub fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            self.is_running.store(false, Ordering::Relaxed);
            drop(stream);
            log::info!("Audio device '{}' closed", self.device_name);
        }
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Relaxed)
    }

    /// Number of audio frames rendered since start
    pub fn frames_processed(&self) -> usize {
        self.frames_processed.load(Ordering::Relaxed)
    }

    /// Device sample rate; load clips at this rate to skip per-voice rate conversion.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Moves the listener that spatial voices are panned and attenuated against.
    pub fn set_listener_pose(&self, pose: Pose) {
        let _ = self.command_sender.send(RenderCommand::SetListener(pose));
    }

    /// Mixer whose parameter names follow `config`.
    pub fn mixer(&self, config: &EngineConfig) -> CpalMixer {
        let mut buses = HashMap::new();
        for (name, bus) in [
            (&config.master_param, Bus::Master),
            (&config.music_param, Bus::Music),
            (&config.sfx_param, Bus::Effect),
        ] {
            if !name.is_empty() {
                buses.insert(name.clone(), bus);
            }
        }
        CpalMixer {
            buses,
            sender: self.command_sender.clone(),
        }
    }
}

impl AudioBackend for CpalBackend {
    type Source = CpalSource;

    fn create_source(&mut self, role: SourceRole, label: &str) -> Result<CpalSource> {
        if self.stream.is_none() {
            return Err(TuneboxError::AudioDevice(format!(
                "stream stopped, cannot create '{}'",
                label
            )));
        }
        let id = self.next_voice;
        self.next_voice += 1;
        Ok(CpalSource::new(
            id,
            role,
            label,
            self.command_sender.clone(),
        ))
    }

    fn destroy_source(&mut self, source: CpalSource) {
        log::debug!("Destroying voice '{}'", source.label());
        drop(source);
    }
}

impl Drop for CpalBackend {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Software mixer: decibel parameters become linear bus gains on the audio thread.
#[derive(Clone)]
pub struct CpalMixer {
    buses: HashMap<String, Bus>,
    sender: Sender<RenderCommand>,
}

impl Mixer for CpalMixer {
    fn set_parameter(&mut self, name: &str, value_db: f32) -> Result<()> {
        let bus = *self.buses.get(name).ok_or_else(|| {
            TuneboxError::Configuration(format!("Mixer has no parameter named '{}'", name))
        })?;
        self.sender
            .send(RenderCommand::SetBusGain(bus, to_linear(value_db)))
            .map_err(|_| TuneboxError::Engine("Audio thread is gone".to_string()))
    }
}

fn create_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut renderer: Renderer,
    is_running: Arc<AtomicBool>,
    frames_processed: Arc<AtomicUsize>,
) -> Result<cpal::Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = config.channels;
    let mut scratch: Vec<f32> = Vec::new();

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                if !is_running.load(Ordering::Relaxed) {
                    for sample in data.iter_mut() {
                        *sample = T::from_sample(0.0f32);
                    }
                    return;
                }

                if scratch.len() != data.len() {
                    scratch.resize(data.len(), 0.0);
                }

                let frames = renderer.render(&mut scratch, channels);

                for (out, sample) in data.iter_mut().zip(scratch.iter()) {
                    *out = T::from_sample(sample.clamp(-1.0, 1.0));
                }

                frames_processed.fetch_add(frames, Ordering::Relaxed);
            },
            move |err| {
                log::error!("Audio stream error: {}", err);
            },
            None,
        )
        .map_err(|e| TuneboxError::AudioDevice(format!("Failed to build stream: {}", e)))
}
