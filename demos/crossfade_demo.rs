//! Plays two tracks on the default output device with a crossfade between
//! them, a few pooled effects and one positional effect.
//!
//! Usage: `cargo run --example crossfade_demo [first.wav] [second.wav]`
//! Without arguments two generated tones are used.

use anyhow::{Context, Result};
use std::time::{Duration, Instant};
use tunebox::{
    AudioClip, AudioEngine, CpalBackend, DeviceConfig, EngineConfig, FrameTime, LoadOptions,
    MemoryStore, MusicParams, Pose, SfxParams, SpatialParams, Vec3,
};

const TONE_RATE: u32 = 48_000;

fn tone(name: &str, frequency: f32, seconds: f32) -> Result<AudioClip> {
    let frames = (seconds * TONE_RATE as f32) as usize;
    let samples = (0..frames)
        .map(|i| {
            let t = i as f32 / TONE_RATE as f32;
            (t * frequency * std::f32::consts::TAU).sin() * 0.2
        })
        .collect();
    Ok(AudioClip::from_samples(name, samples, TONE_RATE, 1)?)
}

fn track(path: Option<String>, fallback_hz: f32, name: &str) -> Result<AudioClip> {
    match path {
        Some(path) => AudioClip::from_path(&path, &LoadOptions::default())
            .with_context(|| format!("loading {}", path)),
        None => tone(name, fallback_hz, 8.0),
    }
}

/// Runs the frame loop for `duration`, ticking the engine at roughly 60 Hz.
fn run_for(engine: &mut AudioEngine<CpalBackend>, duration: Duration) {
    let end = Instant::now() + duration;
    let mut last = Instant::now();
    while Instant::now() < end {
        std::thread::sleep(Duration::from_millis(16));
        let now = Instant::now();
        engine.advance(FrameTime::new(now - last));
        last = now;
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let first = track(args.next(), 220.0, "low")?;
    let second = track(args.next(), 330.0, "high")?;
    let blip = tone("blip", 880.0, 0.15)?;

    let backend =
        CpalBackend::start(DeviceConfig::default()).context("opening the output device")?;
    println!(
        "Output: {} ({} Hz, {} channels)",
        backend.device_name(),
        backend.sample_rate(),
        backend.channels()
    );

    let config = EngineConfig::new().pool_size(4).rng_seed(7);
    let mixer = backend.mixer(&config);
    let mut engine = AudioEngine::builder(config, backend)
        .mixer(mixer)
        .store(MemoryStore::new())
        .build();
    engine
        .backend()
        .set_listener_pose(Pose::from_position(Vec3::ZERO));

    println!("Playing '{}'", first.name());
    engine.play_music(Some(&first), MusicParams::new().fade(Duration::from_millis(500)));
    run_for(&mut engine, Duration::from_secs(2));

    for _ in 0..4 {
        engine.play_sfx(Some(&blip), &SfxParams::new().volume(0.8).pitch_range(0.9, 1.2));
        run_for(&mut engine, Duration::from_millis(250));
    }

    println!("Crossfading to '{}'", second.name());
    engine.play_music(Some(&second), MusicParams::new().fade(Duration::from_secs(3)));
    run_for(&mut engine, Duration::from_secs(4));

    println!("Positional blip on the right");
    engine.play_sfx_at_position(Some(&blip), Vec3::new(4.0, 0.0, 0.0), &SpatialParams::default());
    run_for(&mut engine, Duration::from_secs(1));

    engine.set_music_volume(0.4);
    run_for(&mut engine, Duration::from_secs(1));

    println!("Fading out");
    engine.stop_music(Some(Duration::from_secs(2)));
    run_for(&mut engine, Duration::from_millis(2500));

    let backend = engine.shutdown();
    println!("Rendered {} frames", backend.frames_processed());
    Ok(())
}
