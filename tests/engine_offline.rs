use chipgrid::{Engine, EngineConfig, StepValue, TrackKind};

fn offline_engine(seed: u64) -> Engine {
    Engine::new(EngineConfig {
        seed: Some(seed),
        offline_sample_rate: 8000,
        ..EngineConfig::offline()
    })
}

fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
}

#[test]
fn test_empty_pattern_renders_silence() {
    let mut engine = offline_engine(1);
    engine.play();
    let out = engine.render_offline(8000);
    assert_eq!(out.len(), 8000);
    assert!(out.iter().all(|s| s.abs() < 1e-3));
}

#[test]
fn test_kick_pattern_is_audible_and_bounded() {
    let mut engine = offline_engine(2);
    let kick = engine
        .project()
        .tracks()
        .iter()
        .position(|t| t.template_id == "chipKick")
        .unwrap();
    for step in (0..16).step_by(4) {
        assert!(engine.set_step_value(kick, step, StepValue::Level(3)));
    }
    engine.set_tempo(120.0);
    engine.play();
    let out = engine.render_offline(16000);
    assert!(rms(&out) > 0.01);
    assert!(out.iter().all(|s| s.abs() <= 1.0));
    assert!(engine.transport().position > 0);
}

#[test]
fn test_muted_track_stays_silent() {
    let mut engine = offline_engine(3);
    let kick = engine
        .project()
        .tracks()
        .iter()
        .position(|t| t.kind == TrackKind::Drum)
        .unwrap();
    engine.set_step_value(kick, 0, StepValue::Level(3));
    engine.toggle_mute(kick);
    engine.play();
    let out = engine.render_offline(4000);
    assert!(out.iter().all(|s| s.abs() < 1e-3));
}

#[test]
fn test_same_seed_renders_same_audio() {
    let render = |seed| {
        let mut engine = offline_engine(seed);
        engine.randomize_pattern();
        engine.play();
        engine.render_offline(8000)
    };
    assert_eq!(render(7), render(7));
}

#[test]
fn test_recording_captures_output() {
    let mut engine = offline_engine(4);
    engine.randomize_pattern();
    engine.start_recording().unwrap();
    engine.play();
    engine.render_offline(8000);
    let partial = engine.download_current_buffer().unwrap();
    assert!(partial.frames > 0);
    engine.stop_recording();
    let recording = engine.export_recording().unwrap();
    assert_eq!(recording.sample_rate, 8000);
    assert_eq!(recording.frames, 8000);
    assert!(recording.file_name.ends_with(".wav"));
    assert_eq!(&recording.bytes[..4], b"RIFF");
}
