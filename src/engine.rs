use std::path::Path;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::audio::{AudioContext, GraphStatus};
use crate::config::{EngineConfig, OutputMode};
use crate::error::{EngineError, EngineResult};
use crate::fx::{EffectsBus, EffectsBusState};
use crate::pitch::ScaleMode;
use crate::record::{EncodedRecording, Recorder, RecorderState};
use crate::sequencer::{
    compute_gain, DrumVoice, Project, Scale, Scheduler, StepValue, TrackKind, TransportState,
};
use crate::synth::{
    decode_wav, ArpRequest, DrumParams, NoiseParams, SampleBuffer, SampleParams, ToneParams, Voices,
};

/// How long `export_recording` waits for the audio thread's final flush
const CAPTURE_FLUSH_TIMEOUT: Duration = Duration::from_millis(250);

/// Velocity used for previews and key triggers
const PREVIEW_VELOCITY: u8 = 3;

/// Turn one track hit into voices
fn trigger_track(
    voices: &mut Voices,
    project: &Project,
    bpm: f64,
    index: usize,
    time: f64,
    note_index: Option<usize>,
    gain: f32,
) {
    let Some(track) = project.track(index) else {
        return;
    };
    match track.kind {
        TrackKind::Melodic => {
            let window = project.window(index);
            let Some(note) = note_index.and_then(|i| window.get(i)) else {
                return;
            };
            let tone = track.params.tone(track.waveform, note.frequency_hz as f32);
            let tone = ToneParams { gain, ..tone };
            voices.play_waveform(track.waveform, time, &tone, track.duty);
        }
        TrackKind::Arpeggio => {
            let window = project.window(index);
            let pool = track.arp_pool(window, note_index.unwrap_or(0));
            let tone = ToneParams {
                gain,
                ..track.params.tone(track.waveform, 0.0)
            };
            let request = ArpRequest {
                bpm,
                notes: &pool,
                pattern: track.arp_pattern,
                steps: pool.len(),
                subdivision: track.arp_subdivision,
                waveform: track.waveform,
                duty: track.duty,
                tone,
            };
            voices.play_arp(time, &request);
        }
        TrackKind::Drum => match track.drum_voice {
            Some(DrumVoice::Kick) => {
                let params = DrumParams {
                    gain,
                    ..track.params.drum()
                };
                voices.play_sine808(time, &params);
            }
            _ => {
                let params = NoiseParams {
                    gain,
                    ..track.params.noise()
                };
                voices.play_noise(time, &params);
            }
        },
        TrackKind::Sample => {
            let params = SampleParams {
                gain,
                ..track.params.sample()
            };
            voices.play_sample(time, track.sample.as_ref(), &params);
        }
    }
}

/// The engine handle: pattern model, scheduler, voices, effects bus, recorder and the audio
/// context behind them. Everything runs on the caller's thread except rendering.
pub struct Engine {
    config: EngineConfig,
    project: Project,
    scheduler: Scheduler,
    bus: EffectsBus,
    recorder: Recorder,
    voices: Option<Voices>,
    context: Option<AudioContext>,
    rng: StdRng,
    warned_unsupported: bool,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let scale = Scale::new(
            &config.scale.root,
            ScaleMode::from_name(&config.scale.mode),
            config.scale.start_octave,
            config.scale.octaves.max(1),
        );
        if scale.is_empty() {
            warn!("Unknown scale root '{}', note entry disabled", config.scale.root);
        }
        let mut project = Project::new(config.pattern_length, scale);
        for id in &config.tracks {
            if project.add_track(id).is_none() {
                warn!("Unknown track template '{}'", id);
            }
        }
        project.select_track(0);

        let scheduler = Scheduler::new(
            config.bpm,
            config.pattern_length,
            config.swing,
            config.schedule_ahead_secs,
            config.poll_interval_secs,
        );

        Self {
            bus: EffectsBus::new(config.bus),
            config,
            project,
            scheduler,
            recorder: Recorder::unavailable(),
            voices: None,
            context: None,
            rng,
            warned_unsupported: false,
        }
    }

    /// Allocate audio resources on first call. Returns whether audio is available.
    pub fn initialize(&mut self) -> bool {
        if self.context.is_some() {
            return true;
        }
        let curve = self.bus.curve().clone();
        let context = match self.config.output {
            OutputMode::Offline => Ok(AudioContext::offline(
                self.config.offline_sample_rate.max(1),
                self.bus.state(),
                curve,
            )),
            OutputMode::Realtime => AudioContext::realtime(self.bus.state(), curve),
        };
        let mut context = match context {
            Ok(context) => context,
            Err(e) => {
                if !self.warned_unsupported {
                    warn!("Audio unavailable, engine is inert: {}", e);
                    self.warned_unsupported = true;
                }
                return false;
            }
        };

        self.bus.attach(context.sender());
        self.recorder = match context.take_capture() {
            Some(capture) => Recorder::new(
                context.sender(),
                capture,
                context.sample_rate(),
                self.config.recording_chunk_secs,
            ),
            None => Recorder::unavailable(),
        };
        let voice_rng = StdRng::seed_from_u64(self.rng.gen());
        self.voices = Some(Voices::new(
            context.clock().clone(),
            context.sender(),
            voice_rng,
        ));
        info!(
            "Audio context ready ({} Hz, {})",
            context.sample_rate(),
            if context.is_offline() { "offline" } else { "realtime" }
        );
        self.context = Some(context);
        true
    }

    /// Initialize if needed and start the output. No-op when already running.
    pub fn resume(&mut self) -> EngineResult<()> {
        if !self.initialize() {
            return Err(EngineError::UnsupportedPlatform(
                "no audio context".to_string(),
            ));
        }
        match self.context.as_mut() {
            Some(context) => context.resume(),
            None => Err(EngineError::UnsupportedPlatform(
                "no audio context".to_string(),
            )),
        }
    }

    /// Stop everything and release the audio context
    pub fn shutdown(&mut self) {
        self.stop();
        self.recorder.stop();
        self.bus.detach();
        self.voices = None;
        self.recorder = Recorder::unavailable();
        if self.context.take().is_some() {
            info!("Audio context closed");
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.context.is_some()
    }

    pub fn current_time(&self) -> f64 {
        self.context.as_ref().map(|c| c.current_time()).unwrap_or(0.0)
    }

    pub fn sample_rate(&self) -> u32 {
        self.context
            .as_ref()
            .map(|c| c.sample_rate())
            .unwrap_or(self.config.offline_sample_rate)
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn transport(&self) -> &TransportState {
        self.scheduler.transport()
    }

    pub fn bus_state(&self) -> &EffectsBusState {
        self.bus.state()
    }

    pub fn recorder_state(&self) -> RecorderState {
        self.recorder.state()
    }

    /// Latest snapshot from the audio thread
    pub fn status(&self) -> Option<GraphStatus> {
        self.context.as_ref().map(|c| c.status())
    }

    // Transport

    pub fn play(&mut self) {
        if let Err(e) = self.resume() {
            debug!("play ignored: {}", e);
            return;
        }
        let now = self.current_time();
        self.scheduler.play(now);
        info!("Playing at {:.0} BPM", self.scheduler.transport().bpm);
    }

    pub fn stop(&mut self) {
        if self.scheduler.is_playing() {
            self.scheduler.stop();
            info!("Stopped");
        }
    }

    pub fn is_playing(&self) -> bool {
        self.scheduler.is_playing()
    }

    /// One scheduler pass. Returns when to call again, or None once stopped.
    pub fn tick(&mut self) -> Option<Duration> {
        if !self.scheduler.is_playing() {
            return None;
        }
        let Some(voices) = self.voices.as_mut() else {
            return None;
        };
        let now = self.context.as_ref().map(|c| c.current_time())?;
        let bpm = self.scheduler.transport().bpm;
        for step in self.scheduler.poll(now, &self.project) {
            voices.tick(step.time, step.accent);
            for trigger in step.triggers {
                trigger_track(
                    voices,
                    &self.project,
                    bpm,
                    trigger.track,
                    trigger.time,
                    trigger.note_index,
                    trigger.gain,
                );
            }
        }
        self.scheduler.rearm_interval()
    }

    pub fn set_tempo(&mut self, bpm: f64) -> f64 {
        self.scheduler.set_tempo(bpm)
    }

    pub fn set_pattern_length(&mut self, length: usize) -> usize {
        let length = self.project.set_pattern_length(length);
        self.scheduler.set_pattern_length(length)
    }

    pub fn set_swing(&mut self, swing: f64) -> f64 {
        self.scheduler.set_swing(swing)
    }

    // Effects bus

    pub fn set_master_gain(&mut self, gain: f32) {
        self.bus.set_master_gain(gain);
    }

    pub fn set_drive_amount(&mut self, amount: f32) {
        self.bus.set_drive_amount(amount);
    }

    pub fn set_delay_mix(&mut self, mix: f32) {
        self.bus.set_delay_mix(mix);
    }

    pub fn set_delay_time(&mut self, secs: f32) {
        self.bus.set_delay_time(secs);
    }

    pub fn set_delay_feedback(&mut self, feedback: f32) {
        self.bus.set_delay_feedback(feedback);
    }

    pub fn set_metronome_gain(&mut self, gain: f32) {
        self.bus.set_metronome_gain(gain);
    }

    // Scale and pattern

    /// Unknown modes fall back to minor; an unknown root empties the scale
    pub fn set_scale(&mut self, root: &str, mode: &str) {
        self.project.set_scale(root, ScaleMode::from_name(mode));
        if self.project.scale().is_empty() {
            warn!("Unknown scale root '{}', note entry disabled", root);
        } else {
            info!("Scale {} {}", root, self.project.scale().mode.name());
        }
    }

    pub fn randomize_scale(&mut self) {
        self.project.randomize_scale(&mut self.rng);
        let scale = self.project.scale();
        info!("Scale {} {}", scale.root, scale.mode.name());
    }

    pub fn randomize_pattern(&mut self) {
        self.project.randomize_pattern(&mut self.rng);
    }

    pub fn clear_pattern(&mut self) {
        self.project.clear_pattern();
    }

    // Tracks

    pub fn add_track(&mut self, template_id: &str) -> Option<usize> {
        let index = self.project.add_track(template_id);
        if index.is_none() {
            warn!("Unknown track template '{}'", template_id);
        }
        index
    }

    pub fn remove_track(&mut self, index: usize) -> bool {
        self.project.remove_track(index).is_some()
    }

    pub fn select_track(&mut self, index: usize) {
        self.project.select_track(index);
    }

    pub fn set_track_volume(&mut self, index: usize, volume: f32) {
        self.project.set_track_volume(index, volume);
    }

    pub fn set_track_duty(&mut self, index: usize, duty: f32) {
        self.project.set_track_duty(index, duty);
    }

    pub fn toggle_mute(&mut self, index: usize) -> Option<bool> {
        self.project.toggle_mute(index)
    }

    pub fn toggle_solo(&mut self, index: usize) -> Option<bool> {
        self.project.toggle_solo(index)
    }

    pub fn set_step_value(&mut self, track: usize, step: usize, value: StepValue) -> bool {
        self.project.set_step_value(track, step, value)
    }

    pub fn cycle_cell(&mut self, track: usize, step: usize) {
        self.project.cycle_cell(track, step);
    }

    pub fn decrease_cell(&mut self, track: usize, step: usize) {
        self.project.decrease_cell(track, step);
    }

    pub fn bump_velocity(&mut self, track: usize, step: usize) {
        self.project.bump_velocity(track, step);
    }

    pub fn adjust_register(&mut self, track: usize, delta: i32) {
        self.project.adjust_register(track, delta);
    }

    // Immediate triggers

    /// Play a track right now: drums at full velocity, melodic tracks on their preview note
    pub fn trigger_preview(&mut self, index: usize) {
        if let Err(e) = self.resume() {
            debug!("preview ignored: {}", e);
            return;
        }
        let Some(track) = self.project.track(index) else {
            return;
        };
        let note_index = if track.kind.is_rhythm() {
            None
        } else {
            let len = self.project.window(index).len();
            Some(track.preview_note.min(len.saturating_sub(1)))
        };
        let gain = compute_gain(track.volume, PREVIEW_VELOCITY);
        let now = self.current_time();
        let bpm = self.scheduler.transport().bpm;
        if let Some(voices) = self.voices.as_mut() {
            trigger_track(voices, &self.project, bpm, index, now, note_index, gain);
        }
    }

    /// Preview the track bound to `key`. Returns false when no track has it.
    pub fn trigger_key(&mut self, key: char) -> bool {
        match self.project.track_for_key(key) {
            Some(index) => {
                self.trigger_preview(index);
                true
            }
            None => false,
        }
    }

    pub fn trigger_fx(&mut self, name: &str) {
        if let Err(e) = self.resume() {
            debug!("fx ignored: {}", e);
            return;
        }
        let now = self.current_time();
        if let Some(voices) = self.voices.as_mut() {
            voices.play_fx(name, now);
        }
    }

    // Recording

    /// Start the output if needed, then arm the capture
    pub fn start_recording(&mut self) -> EngineResult<()> {
        match self.resume() {
            // No context: the recorder reports itself unavailable
            Ok(()) | Err(EngineError::UnsupportedPlatform(_)) => self.recorder.start(),
            Err(e) => Err(e),
        }
    }

    pub fn stop_recording(&mut self) {
        self.recorder.stop();
        if let Some(context) = self.context.as_mut() {
            context.flush();
        }
    }

    fn wait_for_capture(&mut self) {
        let offline = self.context.as_ref().map(|c| c.is_offline()).unwrap_or(true);
        if !offline {
            self.recorder.wait_finished(CAPTURE_FLUSH_TIMEOUT);
        }
    }

    /// The finished recording, once stopped
    pub fn export_recording(&mut self) -> Option<EncodedRecording> {
        self.wait_for_capture();
        match self.recorder.export() {
            Ok(recording) => recording,
            Err(e) => {
                debug!("export failed: {}", e);
                None
            }
        }
    }

    /// What has been captured so far, while recording continues
    pub fn download_current_buffer(&mut self) -> Option<EncodedRecording> {
        match self.recorder.current_buffer() {
            Ok(recording) => recording,
            Err(e) => {
                debug!("snapshot failed: {}", e);
                None
            }
        }
    }

    // Samples

    /// Decode WAV bytes at the engine sample rate. Failures are logged and yield None.
    pub fn load_sample_buffer(&self, bytes: &[u8]) -> Option<SampleBuffer> {
        match decode_wav(bytes, self.sample_rate()) {
            Ok(buffer) => Some(buffer),
            Err(e) => {
                warn!("{}", e);
                None
            }
        }
    }

    /// Decode and place a sample on a sample track named after the file stem
    pub fn load_sample_into_track(&mut self, bytes: &[u8], file_name: &str) -> Option<usize> {
        let buffer = self.load_sample_buffer(bytes)?;
        let stem = Path::new(file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(file_name);
        let index = self.project.load_sample(buffer, stem)?;
        info!("Loaded sample '{}' into track {}", stem, index);
        Some(index)
    }

    // Offline

    /// Render `frames` samples through the offline context, running the scheduler between
    /// blocks as a realtime host would. Empty for realtime contexts.
    pub fn render_offline(&mut self, frames: usize) -> Vec<f32> {
        if !self.initialize() {
            return Vec::new();
        }
        let sample_rate = self.sample_rate() as f64;
        let block = ((self.scheduler.transport().poll_interval_secs * sample_rate) as usize).max(1);
        let mut out = Vec::with_capacity(frames);
        while out.len() < frames {
            self.tick();
            let n = block.min(frames - out.len());
            let rendered = match self.context.as_mut() {
                Some(context) => context.render_offline(n),
                None => Vec::new(),
            };
            if rendered.is_empty() {
                break;
            }
            out.extend(rendered);
        }
        out
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shutdown();
    }
}
