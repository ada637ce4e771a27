use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Audio clock shared between the render thread (writer) and the control thread (reader).
///
/// Time is derived from the number of frames the graph has rendered, so it only advances
/// while audio is actually being produced.
#[derive(Clone, Debug)]
pub struct AudioClock {
    frames: Arc<AtomicU64>,
    sample_rate: u32,
}

impl AudioClock {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            frames: Arc::new(AtomicU64::new(0)),
            sample_rate: sample_rate.max(1),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Acquire)
    }

    /// Seconds of audio rendered so far
    pub fn current_time(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Time of a frame index on this clock
    pub fn frame_time(&self, frame: u64) -> f64 {
        frame as f64 / self.sample_rate as f64
    }

    /// Called by the render thread after each block
    pub fn advance(&self, frames: u64) {
        self.frames.fetch_add(frames, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_follows_frames() {
        let clock = AudioClock::new(48000);
        let reader = clock.clone();
        assert_eq!(reader.current_time(), 0.0);
        clock.advance(24000);
        assert_eq!(reader.current_time(), 0.5);
        assert_eq!(reader.frames(), 24000);
    }
}
