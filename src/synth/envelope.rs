use super::automation::Automation;

/// Legal ranges (seconds) for one voice family's envelope
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeLimits {
    pub attack: (f64, f64),
    pub decay: (f64, f64),
    pub release: (f64, f64),
    pub duration: (f64, f64),
}

/// Pulse, square and triangle voices
pub const TONE_LIMITS: EnvelopeLimits = EnvelopeLimits {
    attack: (0.0005, 1.0),
    decay: (0.001, 2.0),
    release: (0.001, 2.0),
    duration: (0.01, 5.0),
};

pub const NOISE_LIMITS: EnvelopeLimits = EnvelopeLimits {
    attack: (0.0003, 1.0),
    decay: (0.001, 2.0),
    release: (0.001, 2.0),
    duration: (0.01, 5.0),
};

/// Sine 808
pub const DRUM_LIMITS: EnvelopeLimits = EnvelopeLimits {
    attack: (0.0003, 0.2),
    decay: (0.01, 1.0),
    release: (0.01, 2.0),
    duration: (0.05, 4.0),
};

/// ADSR shape with a fixed hold time.
///
/// `duration` is when the release tail starts, measured from the trigger; the voice stops
/// `release` seconds after that.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    pub attack: f64,
    pub decay: f64,
    pub sustain: f32,
    pub release: f64,
    pub duration: f64,
}

impl Envelope {
    /// Force every stage into the family's safe range. Non-finite stages take the lower bound.
    pub fn clamped(&self, limits: &EnvelopeLimits) -> Self {
        fn fit(v: f64, (lo, hi): (f64, f64)) -> f64 {
            if v.is_finite() {
                v.clamp(lo, hi)
            } else {
                lo
            }
        }
        Self {
            attack: fit(self.attack, limits.attack),
            decay: fit(self.decay, limits.decay),
            sustain: if self.sustain.is_finite() {
                self.sustain.clamp(0.0, 1.0)
            } else {
                0.0
            },
            release: fit(self.release, limits.release),
            duration: fit(self.duration, limits.duration),
        }
    }

    /// Absolute stop time for a voice triggered at `start`
    pub fn stop_time(&self, start: f64) -> f64 {
        start + self.duration + self.release
    }

    /// Amplitude timeline for a voice triggered at `start` peaking at `peak`.
    ///
    /// Linear attack to `peak`, linear decay to `peak * sustain`, then an exponential tail
    /// toward zero from `start + duration` with time constant `release / 3`. When the hold
    /// time ends inside the attack or decay, that segment is cut short at the value it reached.
    pub fn automation(&self, start: f64, peak: f32) -> Automation {
        let mut amp = Automation::new(0.0);
        amp.set(start, 0.0);

        let attack_end = self.attack;
        let decay_end = self.attack + self.decay;
        let sustain_level = peak * self.sustain;

        if self.duration < attack_end {
            let frac = (self.duration / self.attack) as f32;
            amp.linear_to(start + self.duration, peak * frac);
        } else if self.duration < decay_end {
            let frac = ((self.duration - self.attack) / self.decay) as f32;
            amp.linear_to(start + attack_end, peak);
            amp.linear_to(
                start + self.duration,
                peak + (sustain_level - peak) * frac,
            );
        } else {
            amp.linear_to(start + attack_end, peak);
            amp.linear_to(start + decay_end, sustain_level);
        }

        amp.target(start + self.duration, 0.0, self.release / 3.0);
        amp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(attack: f64, decay: f64, sustain: f32, release: f64, duration: f64) -> Envelope {
        Envelope {
            attack,
            decay,
            sustain,
            release,
            duration,
        }
    }

    #[test]
    fn test_full_shape() {
        let e = env(0.01, 0.1, 0.5, 0.3, 0.5);
        let amp = e.automation(1.0, 0.8);
        assert_eq!(amp.value_at(1.0), 0.0);
        assert!((amp.value_at(1.01) - 0.8).abs() < 1e-4);
        assert!((amp.value_at(1.11) - 0.4).abs() < 1e-4);
        assert!((amp.value_at(1.3) - 0.4).abs() < 1e-4);
        // One time constant into the tail
        assert!((amp.value_at(1.6) - 0.4 * (-1.0f32).exp()).abs() < 1e-3);
        assert!((e.stop_time(1.0) - 1.8).abs() < 1e-12);
    }

    #[test]
    fn test_short_duration_truncates_decay() {
        let e = env(0.01, 0.1, 0.0, 0.1, 0.06);
        let amp = e.automation(0.0, 1.0);
        // Halfway through the decay when the tail starts
        assert!((amp.value_at(0.06) - 0.5).abs() < 1e-3);
        assert!(amp.value_at(0.2) < 0.1);
    }

    #[test]
    fn test_short_duration_truncates_attack() {
        let e = env(0.1, 0.1, 1.0, 0.1, 0.05);
        let amp = e.automation(0.0, 1.0);
        assert!((amp.value_at(0.05) - 0.5).abs() < 1e-3);
        // The tail never rises above where the attack stopped
        assert!(amp.value_at(0.08) < 0.5);
    }

    #[test]
    fn test_clamping() {
        let e = env(-1.0, 10.0, 2.0, f64::NAN, 0.0).clamped(&TONE_LIMITS);
        assert_eq!(e.attack, 0.0005);
        assert_eq!(e.decay, 2.0);
        assert_eq!(e.sustain, 1.0);
        assert_eq!(e.release, 0.001);
        assert_eq!(e.duration, 0.01);
    }

    #[test]
    fn test_stop_time_uses_clamped_values() {
        let e = env(0.001, 0.12, 0.0, 5.0, 10.0).clamped(&DRUM_LIMITS);
        assert!((e.stop_time(2.0) - (2.0 + 4.0 + 2.0)).abs() < 1e-12);
    }
}
