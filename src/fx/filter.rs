use serde::{Deserialize, Serialize};

/// Filter type selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterType {
    LowPass,
    HighPass,
}

impl FilterType {
    pub fn name(&self) -> &'static str {
        match self {
            FilterType::LowPass => "LP",
            FilterType::HighPass => "HP",
        }
    }
}

/// Static description of a voice filter, resolved to DSP state on the audio thread
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterSpec {
    pub filter_type: FilterType,
    pub cutoff_hz: f32,
    pub q: f32,
}

impl FilterSpec {
    pub fn lowpass(cutoff_hz: f32, q: f32) -> Self {
        Self {
            filter_type: FilterType::LowPass,
            cutoff_hz,
            q,
        }
    }

    pub fn highpass(cutoff_hz: f32, q: f32) -> Self {
        Self {
            filter_type: FilterType::HighPass,
            cutoff_hz,
            q,
        }
    }
}

/// State Variable Filter (2-pole SVF)
pub struct SvfFilter {
    sample_rate: f32,
    filter_type: FilterType,
    cutoff: f32,
    q: f32,
    // Integrator states
    low: f32,
    band: f32,
    // Precomputed coefficients
    g: f32, // frequency coefficient
    k: f32, // damping coefficient
}

impl SvfFilter {
    pub fn new(sample_rate: f32) -> Self {
        let mut f = Self {
            sample_rate,
            filter_type: FilterType::LowPass,
            cutoff: 2000.0,
            q: std::f32::consts::FRAC_1_SQRT_2,
            low: 0.0,
            band: 0.0,
            g: 0.0,
            k: 0.0,
        };
        f.update_coefficients();
        f
    }

    pub fn from_spec(spec: &FilterSpec, sample_rate: f32) -> Self {
        let mut f = Self::new(sample_rate);
        f.filter_type = spec.filter_type;
        f.cutoff = spec.cutoff_hz.clamp(20.0, 20000.0);
        f.q = spec.q.clamp(0.1, 20.0);
        f.update_coefficients();
        f
    }

    fn update_coefficients(&mut self) {
        // g = tan(pi * cutoff / sample_rate)
        let freq = self.cutoff.clamp(20.0, self.sample_rate * 0.49);
        self.g = (std::f32::consts::PI * freq / self.sample_rate).tan();
        // k = 1/Q (Q 0.5 -> k 2.0, critically damped)
        self.k = 1.0 / self.q;
    }

    pub fn process(&mut self, input: f32) -> f32 {
        // Trapezoidal SVF
        let a1 = 1.0 / (1.0 + self.g * (self.g + self.k));
        let a2 = self.g * a1;
        let a3 = self.g * a2;

        let v3 = input - self.low - self.k * self.band;
        let v1 = a1 * self.band + a2 * v3;
        let v2 = self.low + a2 * self.band + a3 * v3;

        self.band = 2.0 * v1 - self.band;
        self.low = 2.0 * v2 - self.low;

        match self.filter_type {
            FilterType::LowPass => v2,
            FilterType::HighPass => input - self.k * v1 - v2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settle(filter: &mut SvfFilter, input: impl Fn(usize) -> f32, n: usize) -> f32 {
        let mut peak = 0.0f32;
        for i in 0..n {
            let y = filter.process(input(i));
            if i > n / 2 {
                peak = peak.max(y.abs());
            }
        }
        peak
    }

    #[test]
    fn test_lowpass_passes_dc_blocks_nyquist() {
        let mut lp = SvfFilter::from_spec(&FilterSpec::lowpass(1000.0, 0.7), 44100.0);
        let dc = settle(&mut lp, |_| 1.0, 4000);
        assert!((dc - 1.0).abs() < 0.01);

        let mut lp = SvfFilter::from_spec(&FilterSpec::lowpass(1000.0, 0.7), 44100.0);
        let nyquist = settle(&mut lp, |i| if i % 2 == 0 { 1.0 } else { -1.0 }, 4000);
        assert!(nyquist < 0.01);
    }

    #[test]
    fn test_highpass_blocks_dc() {
        let mut hp = SvfFilter::from_spec(&FilterSpec::highpass(200.0, 1.0), 44100.0);
        let dc = settle(&mut hp, |_| 1.0, 44100);
        assert!(dc < 0.01);
    }
}
