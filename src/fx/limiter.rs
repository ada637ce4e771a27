/// Soft-knee feed-forward compressor used as the bus limiter.
///
/// Gain reduction is computed in dB from the instantaneous input level and smoothed by an
/// attack/release envelope follower before being applied.
pub struct Limiter {
    threshold_db: f32,
    knee_db: f32,
    ratio: f32,
    attack_coeff: f32,
    release_coeff: f32,
    /// Current gain reduction in dB (>= 0)
    envelope: f32,
}

impl Limiter {
    pub fn new(sample_rate: f32) -> Self {
        Self::with_settings(sample_rate, -6.0, 30.0, 12.0, 0.003, 0.25)
    }

    pub fn with_settings(
        sample_rate: f32,
        threshold_db: f32,
        knee_db: f32,
        ratio: f32,
        attack_secs: f32,
        release_secs: f32,
    ) -> Self {
        Self {
            threshold_db,
            knee_db: knee_db.max(0.0),
            ratio: ratio.clamp(1.0, 20.0),
            attack_coeff: (-1.0 / (attack_secs.max(0.0001) * sample_rate)).exp(),
            release_coeff: (-1.0 / (release_secs.max(0.001) * sample_rate)).exp(),
            envelope: 0.0,
        }
    }

    /// Static gain reduction (dB) for an input level (dB)
    fn gain_reduction(&self, input_db: f32) -> f32 {
        let over = input_db - self.threshold_db;
        let slope = 1.0 - 1.0 / self.ratio;
        let half_knee = self.knee_db * 0.5;
        if self.knee_db > 0.0 && over.abs() <= half_knee {
            let x = over + half_knee;
            slope * x * x / (2.0 * self.knee_db)
        } else if over > 0.0 {
            slope * over
        } else {
            0.0
        }
    }

    pub fn process(&mut self, input: f32) -> f32 {
        let input_db = 20.0 * input.abs().max(1e-10).log10();
        let target = self.gain_reduction(input_db);

        let coeff = if target > self.envelope {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        self.envelope = coeff * self.envelope + (1.0 - coeff) * target;

        input * 10f32.powf(-self.envelope / 20.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_signal_untouched() {
        let mut limiter = Limiter::new(44100.0);
        for _ in 0..1000 {
            let y = limiter.process(0.01);
            assert!((y - 0.01).abs() < 1e-4);
        }
    }

    #[test]
    fn test_loud_signal_reduced() {
        let mut limiter = Limiter::new(44100.0);
        let mut last = 0.0;
        for _ in 0..44100 {
            last = limiter.process(1.0);
        }
        // 0 dBFS against a -6 dB threshold at 12:1 settles well below unity
        assert!(last < 0.7);
        assert!(last > 0.3);
    }
}
