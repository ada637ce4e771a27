/// Longest delay the bus line can hold, in seconds
pub const MAX_DELAY_SECS: f32 = 1.0;

/// Hard ceiling on feedback so the loop can never run away
pub const MAX_FEEDBACK: f32 = 0.95;

/// Ring buffer delay line with an internal feedback loop. Returns the wet signal only;
/// the bus decides how much of it reaches the limiter.
pub struct Delay {
    buffer: Vec<f32>,
    write_pos: usize,
    sample_rate: f32,
    time_secs: f32,
    feedback: f32,
    // Smoothed read position to avoid clicks
    current_delay_samples: f32,
    target_delay_samples: f32,
}

impl Delay {
    pub fn new(sample_rate: f32) -> Self {
        let max_samples = (sample_rate * MAX_DELAY_SECS) as usize + 2;
        let initial = Self::delay_samples(sample_rate, 0.25);
        Self {
            buffer: vec![0.0; max_samples],
            write_pos: 0,
            sample_rate,
            time_secs: 0.25,
            feedback: 0.25,
            current_delay_samples: initial,
            target_delay_samples: initial,
        }
    }

    fn delay_samples(sample_rate: f32, secs: f32) -> f32 {
        // At least one sample so the feedback loop always has a delay in it
        (sample_rate * secs).max(1.0)
    }

    pub fn time(&self) -> f32 {
        self.time_secs
    }

    pub fn feedback(&self) -> f32 {
        self.feedback
    }

    /// Non-finite times are ignored
    pub fn set_time(&mut self, secs: f32) {
        if !secs.is_finite() {
            return;
        }
        self.time_secs = secs.clamp(0.0, MAX_DELAY_SECS);
        self.target_delay_samples = Self::delay_samples(self.sample_rate, self.time_secs);
    }

    /// Jump straight to the target time (used when the graph is first configured)
    pub fn snap_time(&mut self, secs: f32) {
        self.set_time(secs);
        self.current_delay_samples = self.target_delay_samples;
    }

    pub fn set_feedback(&mut self, feedback: f32) {
        if !feedback.is_finite() {
            return;
        }
        self.feedback = feedback.clamp(0.0, MAX_FEEDBACK);
    }

    pub fn process(&mut self, input: f32) -> f32 {
        // Smooth delay time changes to avoid clicks
        let smooth_speed = 0.001;
        self.current_delay_samples +=
            (self.target_delay_samples - self.current_delay_samples) * smooth_speed;

        // Read from buffer with linear interpolation
        let delay_samples = self.current_delay_samples;
        let read_pos_f = self.write_pos as f32 - delay_samples;
        let buf_len = self.buffer.len() as f32;
        let read_pos_f = if read_pos_f < 0.0 {
            read_pos_f + buf_len
        } else {
            read_pos_f
        };

        let read_idx = read_pos_f as usize;
        let frac = read_pos_f - read_idx as f32;
        let idx0 = read_idx % self.buffer.len();
        let idx1 = (read_idx + 1) % self.buffer.len();
        let delayed = self.buffer[idx0] * (1.0 - frac) + self.buffer[idx1] * frac;

        // Write input + feedback to buffer
        self.buffer[self.write_pos] = input + delayed * self.feedback;
        self.write_pos = (self.write_pos + 1) % self.buffer.len();

        delayed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_impulse_returns_after_delay_time() {
        let sr = 1000.0;
        let mut delay = Delay::new(sr);
        delay.snap_time(0.1);
        delay.set_feedback(0.5);

        let out: Vec<f32> = (0..400)
            .map(|i| delay.process(if i == 0 { 1.0 } else { 0.0 }))
            .collect();

        assert!(out[..99].iter().all(|s| s.abs() < 1e-6));
        assert!((out[100] - 1.0).abs() < 1e-3);
        // First echo fed back at half level
        assert!((out[200] - 0.5).abs() < 1e-3);
        assert!((out[300] - 0.25).abs() < 1e-3);
    }

    #[test]
    fn test_feedback_ceiling() {
        let mut delay = Delay::new(44100.0);
        delay.set_feedback(3.0);
        assert_eq!(delay.feedback(), MAX_FEEDBACK);
        delay.set_time(5.0);
        assert_eq!(delay.time(), MAX_DELAY_SECS);
    }

    #[test]
    fn test_nan_settings_ignored() {
        let sr = 1000.0;
        let mut delay = Delay::new(sr);
        delay.snap_time(0.1);
        delay.set_time(f32::NAN);
        delay.set_feedback(f32::NAN);
        assert_eq!(delay.time(), 0.1);
        assert_eq!(delay.feedback(), 0.25);
        let out: Vec<f32> = (0..300)
            .map(|i| delay.process(if i == 0 { 1.0 } else { 0.0 }))
            .collect();
        assert!(out.iter().all(|s| s.is_finite()));
        assert!((out[100] - 1.0).abs() < 1e-3);
    }
}
