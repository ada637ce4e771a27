use super::automation::Automation;
use super::voice::{BusInput, OscShape, ScheduledVoice, VoiceSource};
use super::voices::{NoiseColor, NoiseParams, ToneParams, Voices};

/// Soundboard one-shots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CannedFx {
    Laser,
    PowerUp,
    Hit,
    Explosion,
    Coin,
    /// Short filtered noise burst for names nobody recognises
    Blip,
}

/// Soundboard entry shown to the host: (id, label, description)
pub const SOUNDBOARD: [(&str, &str, &str); 5] = [
    ("laser", "Laser", "Descending pulse sweep"),
    ("power", "Power Up", "Ascending power chord"),
    ("hit", "Impact", "Short triangle stab"),
    ("coin", "Coin", "Retro pickup sparkle"),
    ("explosion", "Explosion", "Noisy boom for boss fights"),
];

impl CannedFx {
    pub fn from_name(name: &str) -> Self {
        match name {
            "laser" => CannedFx::Laser,
            "power" => CannedFx::PowerUp,
            "hit" => CannedFx::Hit,
            "explosion" => CannedFx::Explosion,
            "coin" => CannedFx::Coin,
            _ => CannedFx::Blip,
        }
    }
}

impl Voices {
    /// Pulse with its own pitch and amplitude curves, no filter
    fn sweep_voice(
        &mut self,
        label: &'static str,
        duty: f32,
        frequency: Automation,
        amplitude: Automation,
        start: f64,
        stop: f64,
    ) -> ScheduledVoice {
        let wave = self.pulse_wave(duty);
        ScheduledVoice {
            label,
            start,
            stop,
            source: VoiceSource::Oscillator {
                shape: OscShape::Periodic(wave),
                frequency,
            },
            filters: Vec::new(),
            amplitude,
            bus: BusInput::Master,
        }
    }

    pub fn fx_voices(&mut self, fx: CannedFx, time: f64) -> Vec<ScheduledVoice> {
        let t0 = self.resolve_start(time);
        match fx {
            CannedFx::Laser => {
                let mut freq = Automation::new(1600.0);
                freq.set(t0, 1600.0).exponential_to(t0 + 0.55, 90.0);
                let mut amp = Automation::new(0.0);
                amp.set(t0, 0.0)
                    .linear_to(t0 + 0.02, 0.8)
                    .exponential_to(t0 + 0.55, 0.001);
                vec![self.sweep_voice("laser", 0.2, freq, amp, t0, t0 + 0.6)]
            }
            CannedFx::PowerUp => {
                let mut freq = Automation::new(220.0);
                freq.set(t0, 220.0).exponential_to(t0 + 0.35, 880.0);
                let mut amp = Automation::new(0.0);
                amp.set(t0, 0.0)
                    .linear_to(t0 + 0.03, 0.7)
                    .exponential_to(t0 + 0.4, 0.001);
                vec![self.sweep_voice("power", 0.35, freq, amp, t0, t0 + 0.45)]
            }
            CannedFx::Hit => {
                let params = ToneParams {
                    freq: 660.0,
                    duration: 0.18,
                    gain: 0.6,
                    attack: 0.0008,
                    decay: 0.06,
                    sustain: 0.0,
                    release: 0.12,
                    filter_hz: 9000.0,
                };
                vec![self.triangle_voice(t0, &params)]
            }
            CannedFx::Explosion => {
                let params = NoiseParams {
                    duration: 0.6,
                    gain: 0.75,
                    attack: 0.002,
                    decay: 0.35,
                    sustain: 0.1,
                    release: 0.25,
                    color: NoiseColor::Pink,
                    highpass_hz: 80.0,
                    lowpass_hz: 2000.0,
                };
                vec![self.noise_voice(t0, &params)]
            }
            CannedFx::Coin => {
                let first = ToneParams {
                    freq: 1200.0,
                    duration: 0.18,
                    gain: 0.55,
                    attack: 0.001,
                    decay: 0.05,
                    sustain: 0.0,
                    release: 0.12,
                    filter_hz: 8000.0,
                };
                let second = ToneParams {
                    freq: 1800.0,
                    duration: 0.12,
                    gain: 0.45,
                    attack: 0.001,
                    decay: 0.04,
                    sustain: 0.0,
                    release: 0.1,
                    filter_hz: 9000.0,
                };
                vec![
                    self.pulse_voice(t0, &first, 0.5),
                    self.pulse_voice(t0 + 0.12, &second, 0.3),
                ]
            }
            CannedFx::Blip => {
                let params = NoiseParams {
                    duration: 0.2,
                    gain: 0.4,
                    attack: 0.001,
                    decay: 0.05,
                    sustain: 0.0,
                    release: 0.08,
                    color: NoiseColor::White,
                    highpass_hz: 500.0,
                    lowpass_hz: 6000.0,
                };
                vec![self.noise_voice(t0, &params)]
            }
        }
    }

    pub fn play_fx(&mut self, name: &str, time: f64) {
        for voice in self.fx_voices(CannedFx::from_name(name), time) {
            self.dispatch(voice);
        }
    }
}
