use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use chipgrid::{DirectorySink, Engine, EngineConfig, OutputMode, RecordingSink, TEMPLATES};

/// Chipgrid - chiptune step sequencer
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON config file; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    bpm: Option<f64>,

    /// Pattern length in steps
    #[arg(long)]
    steps: Option<usize>,

    #[arg(long)]
    swing: Option<f64>,

    /// Scale root, e.g. C, F#, Bb
    #[arg(long)]
    root: Option<String>,

    /// Scale mode, e.g. minor, dorian, chip
    #[arg(long)]
    mode: Option<String>,

    /// How long to play or render
    #[arg(long, default_value_t = 8.0)]
    seconds: f64,

    /// Render offline to this WAV file instead of playing
    #[arg(long)]
    render: Option<PathBuf>,

    /// Record the realtime session into this directory
    #[arg(long)]
    record: Option<PathBuf>,

    /// Load a WAV file onto a sample track
    #[arg(long)]
    sample: Option<PathBuf>,

    /// Also pick a random scale
    #[arg(long)]
    randomize: bool,

    #[arg(long)]
    seed: Option<u64>,

    /// Metronome level, 0 to 1
    #[arg(long)]
    metronome: Option<f32>,

    /// List track templates and exit
    #[arg(long)]
    list_templates: bool,
}

fn build_config(args: &Args) -> Result<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(bpm) = args.bpm {
        config.bpm = bpm;
    }
    if let Some(steps) = args.steps {
        config.pattern_length = steps;
    }
    if let Some(swing) = args.swing {
        config.swing = swing;
    }
    if let Some(root) = &args.root {
        config.scale.root = root.clone();
    }
    if let Some(mode) = &args.mode {
        config.scale.mode = mode.clone();
    }
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    if let Some(level) = args.metronome {
        config.bus.metronome_gain = level;
    }
    if args.render.is_some() {
        config.output = OutputMode::Offline;
    }
    Ok(config)
}

fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<()> {
    let bytes = chipgrid::record::encode_wav(samples, sample_rate)?;
    std::fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))
}

fn render_to_file(engine: &mut Engine, path: &Path, seconds: f64) -> Result<()> {
    let sample_rate = engine.sample_rate();
    let frames = (seconds.max(0.0) * sample_rate as f64) as usize;
    engine.play();
    let samples = engine.render_offline(frames);
    engine.stop();

    write_wav(path, &samples, sample_rate)?;
    info!("Rendered {:.1}s to {}", seconds, path.display());
    Ok(())
}

fn play_realtime(engine: &mut Engine, seconds: f64, record: Option<&Path>) -> Result<()> {
    engine.resume().context("Failed to start audio output")?;
    if record.is_some() {
        engine.start_recording()?;
    }
    engine.play();

    let deadline = Instant::now() + Duration::from_secs_f64(seconds.max(0.0));
    while Instant::now() < deadline {
        match engine.tick() {
            Some(wait) => thread::sleep(wait),
            None => break,
        }
    }
    engine.stop();

    if let Some(dir) = record {
        engine.stop_recording();
        match engine.export_recording() {
            Some(recording) => {
                DirectorySink::new(dir).deliver(&recording)?;
            }
            None => warn!("Nothing was recorded"),
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if args.list_templates {
        println!("Track templates:");
        for t in TEMPLATES.iter() {
            println!("  {:<12} {:<10} {}", t.id, t.kind.name(), t.name);
        }
        return Ok(());
    }

    let config = build_config(&args)?;
    let mut engine = Engine::new(config);

    if let Some(path) = &args.sample {
        let bytes =
            std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("sample");
        if !engine.initialize() {
            warn!("No audio context, sample not loaded");
        } else if engine.load_sample_into_track(&bytes, name).is_none() {
            warn!("Could not load {}", path.display());
        }
    }

    if args.randomize {
        engine.randomize_scale();
    }
    // A fresh project has empty patterns
    engine.randomize_pattern();

    match &args.render {
        Some(path) => render_to_file(&mut engine, path, args.seconds)?,
        None => play_realtime(&mut engine, args.seconds, args.record.as_deref())?,
    }
    engine.shutdown();
    Ok(())
}
