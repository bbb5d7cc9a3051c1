use crate::{
    audio_data::{AudioClip, Downmix, LoadOptions},
    error::{Result, TuneboxError},
};
use std::fs::File;
use std::path::Path;
use symphonia::{
    core::{
        audio::SampleBuffer, codecs::DecoderOptions, errors::Error, formats::FormatOptions,
        io::MediaSourceStream, meta::MetadataOptions, probe::Hint,
    },
    default::{get_codecs, get_probe},
};

/// Decodes the default track of an audio file into an [`AudioClip`].
///
/// The clip is named after the file stem.
pub fn load_audio_file(path: &Path, options: &LoadOptions) -> Result<AudioClip> {
    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| TuneboxError::AudioLoading(format!("Failed to probe audio format: {:?}", e)))?;

    let mut format = probed.format;

    let track = format
        .default_track()
        .ok_or_else(|| TuneboxError::AudioLoading("No default audio track found".to_string()))?;
    let track_id = track.id;

    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| TuneboxError::AudioLoading("Sample rate not found".to_string()))?;

    let channels = track
        .codec_params
        .channels
        .ok_or_else(|| TuneboxError::AudioLoading("Channel count not found".to_string()))?
        .count() as u16;

    if let Downmix::Channel(picked) = options.downmix {
        if picked >= channels as usize {
            return Err(TuneboxError::AudioFormat(format!(
                "Channel {} out of range for a {}-channel file",
                picked, channels
            )));
        }
    }

    let mut decoder = get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| TuneboxError::AudioLoading(format!("Failed to create decoder: {:?}", e)))?;

    let max_frames = options
        .max_duration
        .map(|d| (d.as_secs_f64() * sample_rate as f64) as usize)
        .unwrap_or(usize::MAX);

    let mut samples: Vec<f32> = Vec::new();
    let mut frames_decoded = 0;

    while frames_decoded < max_frames {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(Error::IoError(_)) => break, // end-of-file
            Err(e) => {
                return Err(TuneboxError::AudioLoading(format!(
                    "Error reading packet: {:?}",
                    e
                )));
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(Error::IoError(_)) => break,
            Err(Error::DecodeError(e)) => {
                log::debug!("Skipping corrupt packet in {:?}: {}", path, e);
                continue;
            }
            Err(e) => {
                return Err(TuneboxError::AudioLoading(format!(
                    "Error decoding packet: {:?}",
                    e
                )));
            }
        };

        let spec = *decoded.spec();
        let mut tmp = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        tmp.copy_interleaved_ref(decoded);

        let frame_count = tmp.samples().len() / channels as usize;
        let take = frame_count.min(max_frames - frames_decoded);
        let interleaved = &tmp.samples()[..take * channels as usize];

        match options.downmix {
            Downmix::Channel(picked) => samples.extend(
                interleaved
                    .chunks(channels as usize)
                    .map(|frame| frame[picked]),
            ),
            Downmix::Keep | Downmix::Average => samples.extend_from_slice(interleaved),
        }

        frames_decoded += take;
    }

    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("clip")
        .to_string();

    let stored_channels = match options.downmix {
        Downmix::Channel(_) => 1,
        Downmix::Keep | Downmix::Average => channels,
    };
    let mut clip = AudioClip::from_samples(name, samples, sample_rate, stored_channels)?;

    if options.downmix == Downmix::Average {
        clip = clip.to_mono();
    }

    if let Some(rate) = options.sample_rate {
        clip = clip.resample(rate)?;
    }

    log::debug!(
        "Loaded {:?}: {} Hz, {} ch, {:?}",
        path,
        clip.sample_rate(),
        clip.channels(),
        clip.duration()
    );

    Ok(clip)
}
