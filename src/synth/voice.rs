use std::sync::Arc;

use super::automation::{Automation, AutomationEvent};
use super::pulse::PeriodicWave;
use crate::fx::FilterSpec;

/// Oscillator waveform
#[derive(Debug, Clone)]
pub enum OscShape {
    Sine,
    Square,
    Triangle,
    Periodic(Arc<PeriodicWave>),
}

impl OscShape {
    pub fn name(&self) -> &'static str {
        match self {
            OscShape::Sine => "sine",
            OscShape::Square => "square",
            OscShape::Triangle => "triangle",
            OscShape::Periodic(_) => "periodic",
        }
    }

    /// Naive (non band-limited) value at `phase` in [0, 1)
    pub fn sample(&self, phase: f32) -> f32 {
        match self {
            OscShape::Sine => (phase * std::f32::consts::TAU).sin(),
            OscShape::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            OscShape::Triangle => {
                // Starts at 0 rising, like a sine
                if phase < 0.25 {
                    phase * 4.0
                } else if phase < 0.75 {
                    2.0 - phase * 4.0
                } else {
                    phase * 4.0 - 4.0
                }
            }
            OscShape::Periodic(wave) => wave.sample(phase),
        }
    }
}

/// What a voice generates before filtering and amplitude
#[derive(Debug, Clone)]
pub enum VoiceSource {
    Oscillator {
        shape: OscShape,
        frequency: Automation,
    },
    /// Mono buffer played at `rate` from its start until it runs out or the voice stops
    Buffer { samples: Arc<[f32]>, rate: f32 },
}

/// Which bus input the voice feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusInput {
    Master,
    Metronome,
}

/// Immutable description of one fire-and-forget sound.
///
/// Built on the control thread, sent to the audio graph, rendered from `start` until `stop`
/// (or until a buffer source runs dry) and then dropped. Cannot be cancelled once sent.
#[derive(Debug, Clone)]
pub struct ScheduledVoice {
    pub label: &'static str,
    pub start: f64,
    pub stop: f64,
    pub source: VoiceSource,
    /// Applied in order between the source and the amplitude stage
    pub filters: Vec<FilterSpec>,
    pub amplitude: Automation,
    pub bus: BusInput,
}

impl ScheduledVoice {
    pub fn peak_amplitude(&self) -> f32 {
        self.amplitude
            .events()
            .iter()
            .filter_map(|e| match *e {
                AutomationEvent::Set { value, .. }
                | AutomationEvent::LinearTo { value, .. }
                | AutomationEvent::ExponentialTo { value, .. } => Some(value),
                AutomationEvent::Target { .. } => None,
            })
            .fold(self.amplitude.initial(), f32::max)
    }
}
