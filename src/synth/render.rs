use super::voice::{BusInput, ScheduledVoice, VoiceSource};
use crate::fx::SvfFilter;

/// Audio-thread playback state for one scheduled voice
pub struct ActiveVoice {
    voice: ScheduledVoice,
    filters: Vec<SvfFilter>,
    sample_rate: f32,
    /// Accumulated oscillator phase (0.0 to 1.0)
    osc_phase: f32,
    /// Fractional read position for buffer sources
    buffer_pos: f64,
    finished: bool,
}

impl ActiveVoice {
    pub fn new(voice: ScheduledVoice, sample_rate: f32) -> Self {
        let filters = voice
            .filters
            .iter()
            .map(|spec| SvfFilter::from_spec(spec, sample_rate))
            .collect();
        Self {
            voice,
            filters,
            sample_rate,
            osc_phase: 0.0,
            buffer_pos: 0.0,
            finished: false,
        }
    }

    pub fn bus(&self) -> BusInput {
        self.voice.bus
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Generate the sample at absolute clock time `t`
    pub fn next_sample(&mut self, t: f64) -> f32 {
        if self.finished {
            return 0.0;
        }
        if t >= self.voice.stop {
            self.finished = true;
            return 0.0;
        }
        if t < self.voice.start {
            return 0.0;
        }

        let raw = match &self.voice.source {
            VoiceSource::Oscillator { shape, frequency } => {
                let s = shape.sample(self.osc_phase);
                self.osc_phase += frequency.value_at(t) / self.sample_rate;
                if self.osc_phase >= 1.0 {
                    self.osc_phase -= self.osc_phase.floor();
                }
                s
            }
            VoiceSource::Buffer { samples, rate } => {
                let pos = self.buffer_pos;
                if pos >= samples.len() as f64 {
                    self.finished = true;
                    return 0.0;
                }
                // Linear interpolation
                let idx = pos as usize;
                let frac = (pos - idx as f64) as f32;
                let s0 = samples[idx];
                let s1 = samples.get(idx + 1).copied().unwrap_or(s0);
                self.buffer_pos = pos + *rate as f64;
                s0 + (s1 - s0) * frac
            }
        };

        let filtered = self
            .filters
            .iter_mut()
            .fold(raw, |signal, filter| filter.process(signal));

        filtered * self.voice.amplitude.value_at(t)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::synth::automation::Automation;
    use crate::synth::voice::OscShape;

    fn voice(source: VoiceSource, start: f64, stop: f64) -> ScheduledVoice {
        ScheduledVoice {
            label: "test",
            start,
            stop,
            source,
            filters: Vec::new(),
            amplitude: Automation::constant(1.0),
            bus: BusInput::Master,
        }
    }

    #[test]
    fn test_silent_outside_window() {
        let sr = 1000.0;
        let osc = VoiceSource::Oscillator {
            shape: OscShape::Square,
            frequency: Automation::constant(100.0),
        };
        let mut v = ActiveVoice::new(voice(osc, 0.1, 0.2), sr);
        assert_eq!(v.next_sample(0.05), 0.0);
        assert!(!v.is_finished());
        assert_eq!(v.next_sample(0.1), 1.0);
        assert_eq!(v.next_sample(0.2), 0.0);
        assert!(v.is_finished());
    }

    #[test]
    fn test_buffer_plays_at_rate_then_finishes() {
        let samples: Arc<[f32]> = vec![0.0, 1.0, 2.0, 3.0].into();
        let src = VoiceSource::Buffer { samples, rate: 2.0 };
        let mut v = ActiveVoice::new(voice(src, 0.0, 10.0), 1000.0);
        assert_eq!(v.next_sample(0.000), 0.0);
        assert_eq!(v.next_sample(0.001), 2.0);
        assert_eq!(v.next_sample(0.002), 0.0);
        assert!(v.is_finished());
    }

    #[test]
    fn test_half_rate_interpolates() {
        let samples: Arc<[f32]> = vec![0.0, 1.0].into();
        let src = VoiceSource::Buffer { samples, rate: 0.5 };
        let mut v = ActiveVoice::new(voice(src, 0.0, 10.0), 1000.0);
        assert_eq!(v.next_sample(0.000), 0.0);
        assert_eq!(v.next_sample(0.001), 0.5);
        assert_eq!(v.next_sample(0.002), 1.0);
        // Last sample holds with no right neighbour
        assert_eq!(v.next_sample(0.003), 1.0);
        assert_eq!(v.next_sample(0.004), 0.0);
        assert!(v.is_finished());
    }
}
