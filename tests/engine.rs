use std::time::Duration;
use tunebox::backend::HeadlessSource;
use tunebox::backend::headless::ONE_SHOT_HISTORY;
use tunebox::{
    AudioClip, AudioEngine, CrossfadeState, EngineConfig, EngineSlot, FrameTime, HeadlessBackend,
    HeadlessMixer, JsonFileStore, MemoryStore, MusicParams, PlaybackSource, SfxParams,
    SpatialParams, TuneboxError, Vec3, VolumeStore,
};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn clip(name: &str, millis: u64) -> AudioClip {
    AudioClip::silence(name, Duration::from_millis(millis), 1000)
}

fn headless(config: EngineConfig) -> AudioEngine<HeadlessBackend> {
    AudioEngine::builder(config, HeadlessBackend::new()).build()
}

fn step(engine: &mut AudioEngine<HeadlessBackend>, millis: u64) {
    engine.advance(FrameTime::new(Duration::from_millis(millis)));
}

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-4
}

struct FailingStore;

impl VolumeStore for FailingStore {
    fn has(&self, _key: &str) -> bool {
        false
    }

    fn get(&self, _key: &str, default: f32) -> f32 {
        default
    }

    fn set(&mut self, key: &str, _value: f32) -> tunebox::Result<()> {
        Err(TuneboxError::Persistence(format!("read-only store, cannot write {}", key)))
    }
}

#[test]
fn crossfade_finishes_after_exact_duration() {
    init_logger();
    let mut engine = headless(EngineConfig::new().pool_size(2));
    engine.set_music_volume(0.6);

    let first = clip("first", 10_000);
    let second = clip("second", 10_000);
    engine.play_music(Some(&first), MusicParams::new().fade(Duration::ZERO));
    engine.play_music(Some(&second), MusicParams::new().fade(Duration::from_millis(1500)));

    for _ in 0..2 {
        step(&mut engine, 500);
        assert_eq!(engine.music().state(), CrossfadeState::Fading);
    }
    step(&mut engine, 500);

    let music = engine.music();
    assert_eq!(music.state(), CrossfadeState::Idle);

    let active = music.active().unwrap();
    assert_eq!(active.clip(), Some(&second));
    assert!(active.is_playing());
    assert!(approx(active.volume(), 0.6));

    let standby = music.standby().unwrap();
    assert_eq!(standby.clip(), Some(&first));
    assert!(!standby.is_playing());
    assert_eq!(standby.volume(), 0.0);
}

#[test]
fn zero_fade_completes_in_the_same_call() {
    init_logger();
    let mut engine = headless(EngineConfig::new());
    engine.play_music(Some(&clip("a", 5000)), MusicParams::new().fade(Duration::ZERO));
    engine.play_music(Some(&clip("b", 5000)), MusicParams::new().fade(Duration::ZERO));

    let music = engine.music();
    assert_eq!(music.state(), CrossfadeState::Idle);
    assert!(!music.standby().unwrap().is_playing());
    assert_eq!(music.standby().unwrap().volume(), 0.0);
    assert_eq!(music.active().unwrap().volume(), 1.0);
}

#[test]
fn configured_default_fade_applies_when_none_given() {
    init_logger();
    let mut engine = headless(EngineConfig::new().default_fade(Duration::from_millis(200)));
    engine.play_music(Some(&clip("a", 5000)), MusicParams::default());
    assert!(engine.music().active().unwrap().is_looping());

    step(&mut engine, 100);
    assert_eq!(engine.music().state(), CrossfadeState::Fading);
    step(&mut engine, 100);
    assert_eq!(engine.music().state(), CrossfadeState::Idle);
}

#[test]
fn fades_ignore_time_scale() {
    init_logger();
    let mut engine = headless(EngineConfig::new());
    engine.play_music(Some(&clip("a", 5000)), MusicParams::new().fade(Duration::from_secs(1)));

    engine.advance(FrameTime::new(Duration::from_secs(1)).with_time_scale(0.0));
    assert_eq!(engine.music().state(), CrossfadeState::Idle);
    assert_eq!(engine.music().active().unwrap().volume(), 1.0);
}

#[test]
fn stop_music_fades_and_stops_active_track() {
    init_logger();
    let mut engine = headless(EngineConfig::new());
    engine.stop_music(None);
    assert_eq!(engine.music().state(), CrossfadeState::Idle);

    engine.play_music(Some(&clip("a", 5000)), MusicParams::new().fade(Duration::ZERO));
    engine.stop_music(Some(Duration::from_millis(400)));
    step(&mut engine, 200);
    assert!(approx(engine.music().active().unwrap().volume(), 0.5));
    step(&mut engine, 200);

    let active = engine.music().active().unwrap();
    assert!(!active.is_playing());
    assert_eq!(active.volume(), 0.0);
}

#[test]
fn missing_clips_change_nothing() {
    init_logger();
    let mut engine = headless(EngineConfig::new().pool_size(3));

    engine.play_music(None, MusicParams::default());
    engine.play_sfx(None, &SfxParams::default());
    engine.play_sfx_at_position(None, Vec3::ONE, &SpatialParams::default());

    let music = engine.music();
    for source in [music.active().unwrap(), music.standby().unwrap()] {
        assert!(source.clip().is_none());
        assert_eq!(source.play_count(), 0);
    }
    assert_eq!(engine.voices().cursor(), 0);
    assert!(engine.voices().voices().iter().all(|v| v.one_shots().is_empty()));
    assert_eq!(engine.emitters().live_count(), 0);
}

#[test]
fn effects_rotate_through_the_pool() {
    init_logger();
    let mut engine = headless(EngineConfig::new().pool_size(2));
    engine.set_sfx_volume(0.5);
    let hit = clip("hit", 50);

    for _ in 0..3 {
        engine.play_sfx(Some(&hit), &SfxParams::new().volume(0.5));
    }

    let voices = engine.voices().voices();
    assert_eq!(voices[0].one_shots().len(), 2);
    assert_eq!(voices[1].one_shots().len(), 1);
    assert!(approx(voices[0].one_shots()[0].volume, 0.25));
    assert!(engine.voices().overflow().unwrap().one_shots().is_empty());
}

#[test]
fn empty_pool_uses_overflow_source() {
    init_logger();
    let mut engine = headless(EngineConfig::new().pool_size(0));
    engine.play_sfx(Some(&clip("hit", 50)), &SfxParams::default());
    assert_eq!(engine.voices().overflow().unwrap().one_shots().len(), 1);
}

#[test]
fn extreme_pitch_range_plays_at_unit_pitch() {
    init_logger();
    let mut engine = headless(EngineConfig::new().pool_size(1));
    engine.play_sfx(
        Some(&clip("hit", 50)),
        &SfxParams::new().pitch_range(-f32::MAX, f32::MAX),
    );
    let shots = engine.voices().voices()[0].one_shots();
    assert_eq!(shots.len(), 1);
    assert_eq!(shots[0].pitch, 1.0);
}

#[test]
fn long_silent_session_keeps_bounded_records() {
    init_logger();
    let mut engine = headless(EngineConfig::new().pool_size(2));
    let hit = clip("hit", 20);
    for _ in 0..1000 {
        engine.play_sfx(Some(&hit), &SfxParams::default());
        step(&mut engine, 1000);
    }

    let voices = engine.voices().voices();
    assert!(voices.iter().all(|v| v.one_shots().len() <= ONE_SHOT_HISTORY));
    let played: usize = voices.iter().map(|v| v.one_shots_played()).sum();
    assert_eq!(played, 1000);
}

#[test]
fn finished_track_is_not_faded_again() {
    init_logger();
    let mut engine = headless(EngineConfig::new());
    engine.play_music(
        Some(&clip("sting", 500)),
        MusicParams::new().fade(Duration::ZERO).looping(false),
    );
    assert!(engine.music().active().unwrap().is_playing());

    step(&mut engine, 600);
    assert!(!engine.music().active().unwrap().is_playing());

    engine.stop_music(Some(Duration::from_secs(1)));
    assert_eq!(engine.music().state(), CrossfadeState::Idle);
}

#[test]
fn huge_time_scale_saturates_instead_of_panicking() {
    init_logger();
    let mut engine = headless(EngineConfig::new());
    let boom = clip("boom", 100);
    engine.play_sfx_at_position(Some(&boom), Vec3::ZERO, &SpatialParams::default());

    let frame = FrameTime::new(Duration::from_millis(16)).with_time_scale(1e30);
    engine.advance(frame);
    assert_eq!(engine.emitters().live_count(), 0);
    assert_eq!(engine.emitters().clock(), Duration::MAX);

    engine.play_sfx_at_position(Some(&boom), Vec3::ZERO, &SpatialParams::default());
    engine.advance(frame);
    assert_eq!(engine.emitters().live_count(), 0);
}

#[test]
fn spatial_emitter_lives_until_clip_length_plus_grace() {
    init_logger();
    let mut engine = headless(EngineConfig::new().pool_size(0));
    let baseline = engine.backend().live_sources();

    engine.play_sfx_at_position(
        Some(&clip("boom", 400)),
        Vec3::new(3.0, 0.0, -2.0),
        &SpatialParams::new().volume(0.5).spatial_blend(2.0),
    );
    assert_eq!(engine.emitters().live_count(), 1);
    assert_eq!(engine.backend().live_sources(), baseline + 1);

    step(&mut engine, 250);
    step(&mut engine, 249);
    assert_eq!(engine.emitters().live_count(), 1);

    step(&mut engine, 1);
    assert_eq!(engine.emitters().live_count(), 0);
    assert_eq!(engine.backend().live_sources(), baseline);
}

#[test]
fn paused_game_time_holds_emitters() {
    init_logger();
    let mut engine = headless(EngineConfig::new());
    engine.play_sfx_at_position(Some(&clip("boom", 100)), Vec3::ZERO, &SpatialParams::default());

    engine.advance(FrameTime::new(Duration::from_secs(5)).with_time_scale(0.0));
    assert_eq!(engine.emitters().live_count(), 1);

    engine.advance(FrameTime::new(Duration::from_millis(400)).with_time_scale(0.5));
    assert_eq!(engine.emitters().live_count(), 0);
}

#[test]
fn persisted_volume_survives_a_fresh_engine() {
    init_logger();
    let store = MemoryStore::new();

    let mut engine = AudioEngine::builder(EngineConfig::new(), HeadlessBackend::new())
        .store(store.clone())
        .build();
    engine.set_master_volume(0.42);
    engine.shutdown();

    let observed = HeadlessMixer::new();
    let engine = AudioEngine::builder(EngineConfig::new(), HeadlessBackend::new())
        .mixer(observed.clone())
        .store(store.clone())
        .build();

    assert!(approx(engine.master_volume(), 0.42));
    assert!(approx(store.load("Audio_MasterVolume").unwrap(), 0.42));
    let db = observed.parameter("MasterVolume").unwrap();
    assert!((db - 20.0 * 0.42f32.log10()).abs() < 1e-3);
}

#[test]
fn persisted_volume_survives_on_disk() {
    init_logger();
    let path = std::env::temp_dir()
        .join(format!("tunebox-it-{}", uuid::Uuid::new_v4()))
        .join("audio_settings.json");

    let store = JsonFileStore::open(&path).unwrap();
    let mut engine = AudioEngine::builder(EngineConfig::new(), HeadlessBackend::new())
        .store(store)
        .build();
    engine.set_sfx_volume(0.3);
    engine.set_music_volume(0.7);

    let store = JsonFileStore::open(&path).unwrap();
    let engine = AudioEngine::builder(EngineConfig::new(), HeadlessBackend::new())
        .store(store)
        .build();
    assert!(approx(engine.sfx_volume(), 0.3));
    assert!(approx(engine.music_volume(), 0.7));
    assert_eq!(engine.master_volume(), 1.0);

    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn out_of_range_stored_values_are_clamped_not_rewritten() {
    init_logger();
    let mut store = MemoryStore::new();
    store.save("Audio_MusicVolume", 3.0).unwrap();

    let engine = AudioEngine::builder(EngineConfig::new(), HeadlessBackend::new())
        .store(store.clone())
        .build();
    assert_eq!(engine.music_volume(), 1.0);
    assert_eq!(store.load("Audio_MusicVolume"), Some(3.0));
}

#[test]
fn persistence_disabled_leaves_store_untouched() {
    init_logger();
    let mut store = MemoryStore::new();
    store.save("Audio_SFXVolume", 0.1).unwrap();

    let mut engine =
        AudioEngine::builder(EngineConfig::new().persist_enabled(false), HeadlessBackend::new())
            .store(store.clone())
            .build();
    assert_eq!(engine.sfx_volume(), 1.0);

    engine.set_master_volume(0.5);
    assert_eq!(store.len(), 1);
}

#[test]
fn failing_store_is_swallowed() {
    init_logger();
    let observed = HeadlessMixer::new();
    let mut engine = AudioEngine::builder(EngineConfig::new(), HeadlessBackend::new())
        .mixer(observed.clone())
        .store(FailingStore)
        .build();

    engine.set_music_volume(0.2);
    assert!(approx(engine.music_volume(), 0.2));
    assert!(observed.parameter("MusicVolume").unwrap() < -13.0);
}

#[test]
fn setters_clamp_before_mixing() {
    init_logger();
    let observed = HeadlessMixer::new();
    let mut engine = AudioEngine::builder(EngineConfig::new(), HeadlessBackend::new())
        .mixer(observed.clone())
        .build();

    engine.set_sfx_volume(-2.0);
    engine.set_master_volume(7.5);
    engine.set_music_volume(f32::NAN);

    assert_eq!(engine.sfx_volume(), 0.0);
    assert_eq!(engine.master_volume(), 1.0);
    assert_eq!(engine.music_volume(), 0.0);
    assert_eq!(observed.parameter("SFXVolume"), Some(-80.0));
    assert_eq!(observed.parameter("MasterVolume"), Some(0.0));
    assert_eq!(observed.parameter("MusicVolume"), Some(-80.0));
}

#[derive(Debug, PartialEq)]
struct Snapshot {
    music: Vec<(Option<String>, f32, bool)>,
    pitches: Vec<f32>,
}

fn snapshot(engine: &AudioEngine<HeadlessBackend>) -> Snapshot {
    let music = engine.music();
    let describe = |s: &HeadlessSource| {
        (
            s.clip().map(|c| c.name().to_string()),
            s.volume(),
            s.is_playing(),
        )
    };
    Snapshot {
        music: vec![
            describe(music.active().unwrap()),
            describe(music.standby().unwrap()),
        ],
        pitches: engine
            .voices()
            .voices()
            .iter()
            .flat_map(|v| v.one_shots().iter().map(|s| s.pitch))
            .collect(),
    }
}

fn overlapping_session() -> Vec<Snapshot> {
    let mut engine = headless(EngineConfig::new().pool_size(2).rng_seed(42));
    let a = clip("a", 10_000);
    let b = clip("b", 10_000);
    let mut frames = Vec::new();

    engine.play_music(Some(&a), MusicParams::new().fade(Duration::from_millis(300)));
    step(&mut engine, 100);
    engine.play_music(Some(&b), MusicParams::new().fade(Duration::from_millis(300)));
    assert_eq!(engine.music().pending_fades(), 2);

    for _ in 0..6 {
        engine.play_sfx(Some(&clip("step", 20)), &SfxParams::new().pitch_range(0.8, 1.2));
        step(&mut engine, 100);
        frames.push(snapshot(&engine));
    }
    frames
}

#[test]
fn overlapping_music_requests_replay_deterministically() {
    init_logger();
    let first = overlapping_session();
    let second = overlapping_session();
    assert_eq!(first, second);
    assert_eq!(first.last().unwrap().pitches.len(), 6);
}

#[test]
fn slot_keeps_first_engine_and_releases_on_teardown() {
    init_logger();
    let mut slot = EngineSlot::new();
    assert!(slot.install(headless(EngineConfig::new().pool_size(3))));
    assert!(!slot.install(headless(EngineConfig::new().pool_size(6))));

    let engine = slot.get_mut().unwrap();
    assert_eq!(engine.voices().len(), 3);
    engine.play_sfx_at_position(Some(&clip("boom", 1000)), Vec3::ZERO, &SpatialParams::default());

    let backend = slot.teardown().unwrap();
    assert_eq!(backend.live_sources(), 0);
    assert_eq!(backend.destroyed_sources(), 2 + 1 + 3 + 1);
}
