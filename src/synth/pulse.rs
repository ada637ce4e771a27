use std::collections::HashMap;
use std::f32::consts::PI;
use std::fmt;
use std::sync::Arc;

/// Harmonic slots in a pulse wave (index 0 is DC and stays empty)
pub const PULSE_HARMONICS: usize = 32;
/// Samples per cycle in the rendered wavetable
pub const WAVETABLE_SIZE: usize = 2048;

pub const MIN_DUTY: f32 = 0.05;
pub const MAX_DUTY: f32 = 0.95;

/// Band-limited single-cycle waveform built from a Fourier series, normalized to unit peak
pub struct PeriodicWave {
    duty: f32,
    imag: [f32; PULSE_HARMONICS],
    table: Vec<f32>,
}

impl fmt::Debug for PeriodicWave {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeriodicWave")
            .field("duty", &self.duty)
            .field("size", &self.table.len())
            .finish()
    }
}

impl PeriodicWave {
    /// Pulse with the given duty cycle: imag[n] = 2 / (n pi) * sin(n pi duty)
    pub fn pulse(duty: f32) -> Self {
        let duty = duty.clamp(MIN_DUTY, MAX_DUTY);
        let mut imag = [0.0f32; PULSE_HARMONICS];
        for (n, coeff) in imag.iter_mut().enumerate().skip(1) {
            let n = n as f32;
            *coeff = (2.0 / (n * PI)) * (n * PI * duty).sin();
        }

        let mut table: Vec<f32> = (0..WAVETABLE_SIZE)
            .map(|i| {
                let phase = 2.0 * PI * i as f32 / WAVETABLE_SIZE as f32;
                imag.iter()
                    .enumerate()
                    .skip(1)
                    .map(|(n, c)| c * (n as f32 * phase).sin())
                    .sum()
            })
            .collect();

        let peak = table.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        if peak > 0.0 {
            for s in &mut table {
                *s /= peak;
            }
        }

        Self { duty, imag, table }
    }

    pub fn duty(&self) -> f32 {
        self.duty
    }

    pub fn imag(&self) -> &[f32; PULSE_HARMONICS] {
        &self.imag
    }

    /// Sample the waveform at `phase` in [0, 1)
    pub fn sample(&self, phase: f32) -> f32 {
        let len = self.table.len();
        let pos = phase.rem_euclid(1.0) * len as f32;
        let idx = (pos as usize).min(len - 1);
        let frac = pos - idx as f32;
        let next = self.table[(idx + 1) % len];
        self.table[idx] + (next - self.table[idx]) * frac
    }
}

/// Pulse waves keyed by duty cycle rounded to three decimals.
///
/// Duty is clamped to [0.05, 0.95] first, so there are at most 901 distinct keys and
/// entries are never evicted.
#[derive(Default)]
pub struct PulseWaveCache {
    waves: HashMap<String, Arc<PeriodicWave>>,
}

impl PulseWaveCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache key for a duty cycle ("0.333")
    pub fn key_for(duty: f32) -> String {
        format!("{:.3}", duty.clamp(MIN_DUTY, MAX_DUTY))
    }

    pub fn get(&mut self, duty: f32) -> Arc<PeriodicWave> {
        let key = Self::key_for(duty);
        self.waves
            .entry(key)
            .or_insert_with(|| Arc::new(PeriodicWave::pulse(duty)))
            .clone()
    }

    pub fn len(&self) -> usize {
        self.waves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waves.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_keys_share_wave() {
        let mut cache = PulseWaveCache::new();
        let a = cache.get(0.3333);
        let b = cache.get(0.33331);
        assert_eq!(PulseWaveCache::key_for(0.3333), "0.333");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);

        let c = cache.get(0.5);
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_three_decimal_neighbours_share_entry() {
        let mut cache = PulseWaveCache::new();
        let a = cache.get(0.333);
        let b = cache.get(0.3334);
        assert_eq!(PulseWaveCache::key_for(0.3334), "0.333");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_duty_clamped_before_keying() {
        assert_eq!(PulseWaveCache::key_for(0.0), "0.050");
        assert_eq!(PulseWaveCache::key_for(1.0), "0.950");
        let mut cache = PulseWaveCache::new();
        let a = cache.get(0.01);
        let b = cache.get(0.02);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_harmonics_follow_duty() {
        let wave = PeriodicWave::pulse(0.5);
        assert_eq!(wave.imag()[0], 0.0);
        assert!((wave.imag()[1] - 2.0 / PI).abs() < 1e-6);
        // Even harmonics vanish at 50% duty
        assert!(wave.imag()[2].abs() < 1e-6);
    }

    #[test]
    fn test_unit_peak() {
        for duty in [0.05, 0.125, 0.5, 0.9] {
            let wave = PeriodicWave::pulse(duty);
            let peak = (0..WAVETABLE_SIZE)
                .map(|i| wave.sample(i as f32 / WAVETABLE_SIZE as f32).abs())
                .fold(0.0f32, f32::max);
            assert!((peak - 1.0).abs() < 1e-4);
        }
    }
}
