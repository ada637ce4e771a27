use std::sync::Arc;

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::arp::{resolve_arp_sequence, ArpPattern};
use super::automation::Automation;
use super::envelope::{Envelope, DRUM_LIMITS, NOISE_LIMITS, TONE_LIMITS};
use super::pulse::{PeriodicWave, PulseWaveCache};
use super::sampler::SampleBuffer;
use super::voice::{BusInput, OscShape, ScheduledVoice, VoiceSource};
use crate::audio::AudioClock;
use crate::command::{CommandSender, GraphCommand};
use crate::fx::FilterSpec;

const FALLBACK_FREQ: f32 = 440.0;

/// Tone oscillator family for melodic tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    #[default]
    Pulse,
    Square,
    Triangle,
}

impl Waveform {
    pub fn name(&self) -> &'static str {
        match self {
            Waveform::Pulse => "pulse",
            Waveform::Square => "square",
            Waveform::Triangle => "triangle",
        }
    }

    /// Resonance of the voice's lowpass
    pub fn filter_q(&self) -> f32 {
        match self {
            Waveform::Pulse => 0.7,
            Waveform::Square => 0.6,
            Waveform::Triangle => 0.5,
        }
    }
}

/// Parameters of a pulse/square/triangle voice
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneParams {
    pub freq: f32,
    pub duration: f64,
    pub gain: f32,
    pub attack: f64,
    pub decay: f64,
    pub sustain: f32,
    pub release: f64,
    pub filter_hz: f32,
}

impl ToneParams {
    pub fn square(freq: f32) -> Self {
        Self {
            freq,
            duration: 0.25,
            gain: 0.6,
            attack: 0.002,
            decay: 0.08,
            sustain: 0.25,
            release: 0.08,
            filter_hz: 12000.0,
        }
    }

    pub fn triangle(freq: f32) -> Self {
        Self {
            freq,
            duration: 0.3,
            gain: 0.55,
            attack: 0.003,
            decay: 0.06,
            sustain: 0.3,
            release: 0.1,
            filter_hz: 8000.0,
        }
    }

    pub fn pulse(freq: f32) -> Self {
        Self {
            freq,
            duration: 0.25,
            gain: 0.6,
            attack: 0.0015,
            decay: 0.08,
            sustain: 0.25,
            release: 0.08,
            filter_hz: 12000.0,
        }
    }

    pub fn for_waveform(waveform: Waveform, freq: f32) -> Self {
        match waveform {
            Waveform::Pulse => Self::pulse(freq),
            Waveform::Square => Self::square(freq),
            Waveform::Triangle => Self::triangle(freq),
        }
    }

    fn envelope(&self) -> Envelope {
        Envelope {
            attack: self.attack,
            decay: self.decay,
            sustain: self.sustain,
            release: self.release,
            duration: self.duration,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoiseColor {
    #[default]
    White,
    /// One-pole lowpassed white noise
    Pink,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseParams {
    pub duration: f64,
    pub gain: f32,
    pub attack: f64,
    pub decay: f64,
    pub sustain: f32,
    pub release: f64,
    pub color: NoiseColor,
    pub highpass_hz: f32,
    pub lowpass_hz: f32,
}

impl Default for NoiseParams {
    fn default() -> Self {
        Self {
            duration: 0.18,
            gain: 0.55,
            attack: 0.001,
            decay: 0.06,
            sustain: 0.2,
            release: 0.05,
            color: NoiseColor::White,
            highpass_hz: 200.0,
            lowpass_hz: 8000.0,
        }
    }
}

/// Sine "808" kick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrumParams {
    pub base_freq: f32,
    pub pitch_decay: f64,
    pub duration: f64,
    pub gain: f32,
    pub attack: f64,
    pub decay: f64,
    pub sustain: f32,
    pub release: f64,
}

impl Default for DrumParams {
    fn default() -> Self {
        Self {
            base_freq: 55.0,
            pitch_decay: 0.03,
            duration: 0.7,
            gain: 0.95,
            attack: 0.001,
            decay: 0.12,
            sustain: 0.0,
            release: 0.3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleParams {
    pub gain: f32,
    pub playback_rate: f32,
}

impl Default for SampleParams {
    fn default() -> Self {
        Self {
            gain: 1.0,
            playback_rate: 1.0,
        }
    }
}

/// One arpeggio burst: the pool, how to walk it, and the tone every note uses
#[derive(Debug, Clone)]
pub struct ArpRequest<'a> {
    pub bpm: f64,
    /// Pool frequencies, low to high
    pub notes: &'a [f32],
    pub pattern: ArpPattern,
    pub steps: usize,
    pub subdivision: u32,
    pub waveform: Waveform,
    pub duty: f32,
    /// Shared tone for every note; `freq` is replaced per note
    pub tone: ToneParams,
}

fn clamp_gain(gain: f32) -> f32 {
    if gain.is_finite() {
        gain.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

/// Voice synthesis engine.
///
/// Every `*_voice` method is a pure builder returning an immutable record; the matching
/// `play_*` method builds and hands the record to the audio graph without blocking.
pub struct Voices {
    clock: AudioClock,
    sender: CommandSender,
    pulse_cache: PulseWaveCache,
    rng: StdRng,
}

impl Voices {
    pub fn new(clock: AudioClock, sender: CommandSender, rng: StdRng) -> Self {
        Self {
            clock,
            sender,
            pulse_cache: PulseWaveCache::new(),
            rng,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.clock.sample_rate()
    }

    pub fn pulse_cache(&self) -> &PulseWaveCache {
        &self.pulse_cache
    }

    pub(super) fn pulse_wave(&mut self, duty: f32) -> Arc<PeriodicWave> {
        self.pulse_cache.get(finite_or(duty, 0.5))
    }

    /// Non-finite start times mean "now"
    pub fn resolve_start(&self, time: f64) -> f64 {
        if time.is_finite() {
            time
        } else {
            self.clock.current_time()
        }
    }

    pub fn dispatch(&self, voice: ScheduledVoice) -> bool {
        self.sender.send(GraphCommand::Schedule(Box::new(voice)))
    }

    fn tone_voice(
        &self,
        label: &'static str,
        shape: OscShape,
        q: f32,
        time: f64,
        params: &ToneParams,
    ) -> ScheduledVoice {
        let start = self.resolve_start(time);
        let env = params.envelope().clamped(&TONE_LIMITS);
        let freq = finite_or(params.freq, FALLBACK_FREQ);
        let cutoff = finite_or(params.filter_hz, 12000.0).clamp(20.0, 20000.0);
        ScheduledVoice {
            label,
            start,
            stop: env.stop_time(start),
            source: VoiceSource::Oscillator {
                shape,
                frequency: Automation::constant(freq),
            },
            filters: vec![FilterSpec::lowpass(cutoff, q)],
            amplitude: env.automation(start, clamp_gain(params.gain)),
            bus: BusInput::Master,
        }
    }

    pub fn square_voice(&self, time: f64, params: &ToneParams) -> ScheduledVoice {
        let q = Waveform::Square.filter_q();
        self.tone_voice("square", OscShape::Square, q, time, params)
    }

    pub fn triangle_voice(&self, time: f64, params: &ToneParams) -> ScheduledVoice {
        let q = Waveform::Triangle.filter_q();
        self.tone_voice("triangle", OscShape::Triangle, q, time, params)
    }

    pub fn pulse_voice(&mut self, time: f64, params: &ToneParams, duty: f32) -> ScheduledVoice {
        let wave = self.pulse_wave(duty);
        let q = Waveform::Pulse.filter_q();
        self.tone_voice("pulse", OscShape::Periodic(wave), q, time, params)
    }

    pub fn waveform_voice(
        &mut self,
        waveform: Waveform,
        time: f64,
        params: &ToneParams,
        duty: f32,
    ) -> ScheduledVoice {
        match waveform {
            Waveform::Pulse => self.pulse_voice(time, params, duty),
            Waveform::Square => self.square_voice(time, params),
            Waveform::Triangle => self.triangle_voice(time, params),
        }
    }

    pub fn noise_voice(&mut self, time: f64, params: &NoiseParams) -> ScheduledVoice {
        let start = self.resolve_start(time);
        let env = Envelope {
            attack: params.attack,
            decay: params.decay,
            sustain: params.sustain,
            release: params.release,
            duration: params.duration,
        }
        .clamped(&NOISE_LIMITS);

        let buffer_secs = if params.duration.is_finite() {
            params.duration.clamp(0.01, 2.0)
        } else {
            0.01
        };
        let length = ((self.sample_rate() as f64 * buffer_secs * 2.0).floor() as usize).max(1);
        let mut pink = 0.0f32;
        let samples: Vec<f32> = (0..length)
            .map(|_| {
                let v: f32 = self.rng.gen_range(-1.0..1.0);
                match params.color {
                    NoiseColor::White => v,
                    NoiseColor::Pink => {
                        pink = 0.98 * pink + 0.02 * v;
                        pink
                    }
                }
            })
            .collect();

        let hp = finite_or(params.highpass_hz, 200.0).clamp(20.0, 16000.0);
        let lp = finite_or(params.lowpass_hz, 8000.0).clamp(200.0, 20000.0);

        ScheduledVoice {
            label: "noise",
            start,
            stop: env.stop_time(start),
            source: VoiceSource::Buffer {
                samples: samples.into(),
                rate: 1.0,
            },
            filters: vec![FilterSpec::highpass(hp, 1.0), FilterSpec::lowpass(lp, 1.0)],
            amplitude: env.automation(start, clamp_gain(params.gain)),
            bus: BusInput::Master,
        }
    }

    pub fn sine808_voice(&self, time: f64, params: &DrumParams) -> ScheduledVoice {
        let start = self.resolve_start(time);
        let env = Envelope {
            attack: params.attack,
            decay: params.decay,
            sustain: params.sustain,
            release: params.release,
            duration: params.duration,
        }
        .clamped(&DRUM_LIMITS);

        let base = finite_or(params.base_freq, 55.0);
        let sweep = if params.pitch_decay.is_finite() {
            params.pitch_decay.clamp(0.001, 1.0)
        } else {
            0.001
        };
        let mut frequency = Automation::new((base * 8.0).max(20.0));
        frequency
            .set(start, (base * 8.0).max(20.0))
            .exponential_to(start + sweep, base.max(20.0));

        ScheduledVoice {
            label: "sine808",
            start,
            stop: env.stop_time(start),
            source: VoiceSource::Oscillator {
                shape: OscShape::Sine,
                frequency,
            },
            filters: Vec::new(),
            amplitude: env.automation(start, clamp_gain(params.gain)),
            bus: BusInput::Master,
        }
    }

    /// Plays until the buffer runs out at the clamped rate
    pub fn sample_voice(
        &self,
        time: f64,
        buffer: &SampleBuffer,
        params: &SampleParams,
    ) -> ScheduledVoice {
        let start = self.resolve_start(time);
        let rate = finite_or(params.playback_rate, 1.0).clamp(0.25, 4.0);
        let length_secs = buffer.len() as f64 / self.sample_rate() as f64 / rate as f64;
        ScheduledVoice {
            label: "sample",
            start,
            stop: start + length_secs,
            source: VoiceSource::Buffer {
                samples: buffer.samples().clone(),
                rate,
            },
            filters: Vec::new(),
            amplitude: Automation::constant(clamp_gain(params.gain)),
            bus: BusInput::Master,
        }
    }

    /// Arpeggio notes, spaced 60 / bpm / subdivision apart (all at once for chords)
    pub fn arp_voices(&mut self, time: f64, request: &ArpRequest<'_>) -> Vec<ScheduledVoice> {
        let sequence =
            resolve_arp_sequence(request.notes, request.steps, request.pattern, &mut self.rng);
        if sequence.is_empty() {
            return Vec::new();
        }
        let start = self.resolve_start(time);
        let step = 60.0 / request.bpm.max(1.0) / request.subdivision.max(1) as f64;

        sequence
            .into_iter()
            .enumerate()
            .map(|(i, freq)| {
                let at = match request.pattern {
                    ArpPattern::Chord => start,
                    _ => start + i as f64 * step,
                };
                let params = ToneParams {
                    freq,
                    ..request.tone
                };
                self.waveform_voice(request.waveform, at, &params, request.duty)
            })
            .collect()
    }

    /// Metronome click routed to the metronome input of the bus
    pub fn tick_voice(&self, time: f64, accent: bool) -> ScheduledVoice {
        let start = self.resolve_start(time);
        let peak = if accent { 0.08 } else { 0.05 };
        let mut amplitude = Automation::new(0.0);
        amplitude
            .set(start, 0.0)
            .linear_to(start + 0.001, peak)
            .linear_to(start + 0.001 + 0.05, 0.0);
        ScheduledVoice {
            label: "tick",
            start,
            stop: start + 0.08,
            source: VoiceSource::Oscillator {
                shape: OscShape::Square,
                frequency: Automation::constant(if accent { 1600.0 } else { 1100.0 }),
            },
            filters: Vec::new(),
            amplitude,
            bus: BusInput::Metronome,
        }
    }

    pub fn play_square(&self, time: f64, params: &ToneParams) {
        self.dispatch(self.square_voice(time, params));
    }

    pub fn play_triangle(&self, time: f64, params: &ToneParams) {
        self.dispatch(self.triangle_voice(time, params));
    }

    pub fn play_pulse(&mut self, time: f64, params: &ToneParams, duty: f32) {
        let voice = self.pulse_voice(time, params, duty);
        self.dispatch(voice);
    }

    pub fn play_waveform(&mut self, waveform: Waveform, time: f64, params: &ToneParams, duty: f32) {
        match waveform {
            Waveform::Pulse => self.play_pulse(time, params, duty),
            Waveform::Square => self.play_square(time, params),
            Waveform::Triangle => self.play_triangle(time, params),
        }
    }

    pub fn play_noise(&mut self, time: f64, params: &NoiseParams) {
        let voice = self.noise_voice(time, params);
        self.dispatch(voice);
    }

    pub fn play_sine808(&self, time: f64, params: &DrumParams) {
        self.dispatch(self.sine808_voice(time, params));
    }

    /// No buffer means nothing to play
    pub fn play_sample(&self, time: f64, buffer: Option<&SampleBuffer>, params: &SampleParams) {
        if let Some(buffer) = buffer {
            self.dispatch(self.sample_voice(time, buffer, params));
        }
    }

    pub fn play_arp(&mut self, time: f64, request: &ArpRequest<'_>) {
        for voice in self.arp_voices(time, request) {
            self.dispatch(voice);
        }
    }

    pub fn tick(&self, time: f64, accent: bool) {
        self.dispatch(self.tick_voice(time, accent));
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;
    use crate::command::{CommandBus, CommandReceiver};
    use crate::fx::FilterType;

    fn test_voices() -> (Voices, CommandReceiver, AudioClock) {
        let bus = CommandBus::new();
        let clock = AudioClock::new(44100);
        let voices = Voices::new(clock.clone(), bus.sender(), StdRng::seed_from_u64(1));
        (voices, bus.receiver(), clock)
    }

    #[test]
    fn test_square_defaults_and_stop() {
        let (voices, _rx, _) = test_voices();
        let v = voices.square_voice(1.0, &ToneParams::square(220.0));
        assert_eq!(v.start, 1.0);
        assert!((v.stop - (1.0 + 0.25 + 0.08)).abs() < 1e-12);
        assert_eq!(v.filters.len(), 1);
        assert_eq!(v.filters[0].filter_type, FilterType::LowPass);
        assert_eq!(v.filters[0].cutoff_hz, 12000.0);
        assert_eq!(v.filters[0].q, 0.6);
        assert!((v.amplitude.value_at(1.002) - 0.6).abs() < 1e-4);
    }

    #[test]
    fn test_params_are_clamped() {
        let (voices, _rx, _) = test_voices();
        let params = ToneParams {
            duration: 100.0,
            release: 100.0,
            gain: 3.0,
            filter_hz: 1e9,
            ..ToneParams::triangle(220.0)
        };
        let v = voices.triangle_voice(0.0, &params);
        assert!((v.stop - 7.0).abs() < 1e-12);
        assert_eq!(v.filters[0].cutoff_hz, 20000.0);
        assert!(v.peak_amplitude() <= 1.0);
    }

    #[test]
    fn test_non_finite_start_uses_clock() {
        let (voices, _rx, clock) = test_voices();
        clock.advance(44100);
        let v = voices.triangle_voice(f64::NAN, &ToneParams::triangle(220.0));
        assert_eq!(v.start, 1.0);
    }

    #[test]
    fn test_pulse_reuses_cached_wave() {
        let (mut voices, _rx, _) = test_voices();
        voices.pulse_voice(0.0, &ToneParams::pulse(440.0), 0.25);
        voices.pulse_voice(0.5, &ToneParams::pulse(330.0), 0.25);
        voices.pulse_voice(0.5, &ToneParams::pulse(330.0), 0.5);
        assert_eq!(voices.pulse_cache().len(), 2);
    }

    #[test]
    fn test_noise_buffer_length() {
        let (mut voices, _rx, _) = test_voices();
        let v = voices.noise_voice(0.0, &NoiseParams::default());
        match &v.source {
            VoiceSource::Buffer { samples, rate } => {
                assert_eq!(samples.len(), (44100.0f64 * 0.18 * 2.0).floor() as usize);
                assert_eq!(*rate, 1.0);
                assert!(samples.iter().all(|s| (-1.0..1.0).contains(s)));
            }
            _ => panic!("noise should be a buffer source"),
        }
        assert_eq!(v.filters[0].filter_type, FilterType::HighPass);
        assert_eq!(v.filters[1].filter_type, FilterType::LowPass);

        let long = NoiseParams {
            duration: 4.0,
            ..NoiseParams::default()
        };
        match voices.noise_voice(0.0, &long).source {
            VoiceSource::Buffer { samples, .. } => assert_eq!(samples.len(), 44100 * 4),
            _ => panic!("noise should be a buffer source"),
        }
    }

    #[test]
    fn test_pink_noise_is_smoother() {
        let (mut voices, _rx, _) = test_voices();
        let pink = NoiseParams {
            color: NoiseColor::Pink,
            ..NoiseParams::default()
        };
        match voices.noise_voice(0.0, &pink).source {
            VoiceSource::Buffer { samples, .. } => {
                assert!(samples.iter().all(|s| s.abs() < 0.5));
            }
            _ => panic!("noise should be a buffer source"),
        }
    }

    #[test]
    fn test_808_pitch_sweep() {
        let (voices, _rx, _) = test_voices();
        let v = voices.sine808_voice(2.0, &DrumParams::default());
        match &v.source {
            VoiceSource::Oscillator { frequency, .. } => {
                assert_eq!(frequency.value_at(2.0), 440.0);
                assert!((frequency.value_at(2.03) - 55.0).abs() < 1e-3);
                assert!((frequency.value_at(3.0) - 55.0).abs() < 1e-3);
            }
            _ => panic!("808 should be an oscillator"),
        }
        assert!((v.stop - (2.0 + 0.7 + 0.3)).abs() < 1e-12);
    }

    #[test]
    fn test_808_low_base_floors_at_20hz() {
        let (voices, _rx, _) = test_voices();
        let params = DrumParams {
            base_freq: 1.0,
            ..DrumParams::default()
        };
        match voices.sine808_voice(0.0, &params).source {
            VoiceSource::Oscillator { frequency, .. } => {
                assert_eq!(frequency.value_at(0.0), 20.0);
                assert_eq!(frequency.value_at(1.0), 20.0);
            }
            _ => panic!("808 should be an oscillator"),
        }
    }

    #[test]
    fn test_sample_rate_clamp_and_stop() {
        let (voices, _rx, _) = test_voices();
        let buffer = SampleBuffer::new(vec![0.0; 44100], 44100);
        let params = SampleParams {
            gain: 1.0,
            playback_rate: 10.0,
        };
        let v = voices.sample_voice(0.0, &buffer, &params);
        match &v.source {
            VoiceSource::Buffer { rate, .. } => assert_eq!(*rate, 4.0),
            _ => panic!("sample should be a buffer source"),
        }
        assert!((v.stop - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_missing_sample_is_silent() {
        let (voices, rx, _) = test_voices();
        voices.play_sample(0.0, None, &SampleParams::default());
        assert!(rx.try_recv().is_none());
    }

    #[test]
    fn test_arp_spacing() {
        let (mut voices, _rx, _) = test_voices();
        let notes = [220.0, 330.0, 440.0];
        let request = ArpRequest {
            bpm: 120.0,
            notes: &notes,
            pattern: ArpPattern::Up,
            steps: 4,
            subdivision: 4,
            waveform: Waveform::Square,
            duty: 0.5,
            tone: ToneParams::square(0.0),
        };
        let out = voices.arp_voices(1.0, &request);
        let starts: Vec<f64> = out.iter().map(|v| v.start).collect();
        assert_eq!(starts, vec![1.0, 1.125, 1.25, 1.375]);
        let freqs: Vec<f32> = out
            .iter()
            .map(|v| match &v.source {
                VoiceSource::Oscillator { frequency, .. } => frequency.initial(),
                _ => 0.0,
            })
            .collect();
        assert_eq!(freqs, vec![220.0, 330.0, 440.0, 220.0]);
    }

    #[test]
    fn test_arp_chord_is_simultaneous() {
        let (mut voices, _rx, _) = test_voices();
        let notes = [220.0, 330.0, 440.0];
        let request = ArpRequest {
            bpm: 120.0,
            notes: &notes,
            pattern: ArpPattern::Chord,
            steps: 0,
            subdivision: 4,
            waveform: Waveform::Triangle,
            duty: 0.5,
            tone: ToneParams::triangle(0.0),
        };
        let out = voices.arp_voices(0.5, &request);
        assert_eq!(out.len(), 3);
        assert!(out.iter().all(|v| v.start == 0.5));
    }

    #[test]
    fn test_tick_voice() {
        let (voices, _rx, _) = test_voices();
        let accent = voices.tick_voice(1.0, true);
        assert_eq!(accent.bus, BusInput::Metronome);
        assert!((accent.stop - 1.08).abs() < 1e-12);
        assert!((accent.amplitude.value_at(1.001) - 0.08).abs() < 1e-4);
        assert!(accent.amplitude.value_at(1.06).abs() < 1e-6);
        let plain = voices.tick_voice(1.0, false);
        assert!((plain.peak_amplitude() - 0.05).abs() < 1e-6);
        match plain.source {
            VoiceSource::Oscillator { frequency, .. } => assert_eq!(frequency.initial(), 1100.0),
            _ => panic!("tick should be an oscillator"),
        }
    }

    #[test]
    fn test_play_dispatches_to_graph() {
        let (voices, rx, _) = test_voices();
        voices.tick(0.0, true);
        voices.play_square(0.0, &ToneParams::square(220.0));
        assert_eq!(rx.pending(), 2);
    }
}
