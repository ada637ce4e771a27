use std::time::Duration;

use tracing::debug;

use super::pattern::{Project, MAX_PATTERN_LENGTH, MIN_PATTERN_LENGTH};

pub const DEFAULT_BPM: f64 = 120.0;
pub const MIN_BPM: f64 = 40.0;
pub const MAX_BPM: f64 = 220.0;
pub const MAX_SWING: f64 = 0.95;
pub const DEFAULT_SCHEDULE_AHEAD: f64 = 0.12;
pub const DEFAULT_POLL_INTERVAL: f64 = 0.025;

/// Velocity level (1-3) to gain
const VELOCITY_GAINS: [f32; 3] = [0.25, 0.5, 0.9];

/// Gain for one hit: curved track volume times the velocity level's gain, within [0, 1]
pub fn compute_gain(volume: f32, velocity: u8) -> f32 {
    let level = velocity.clamp(1, 3) as usize;
    let volume = if volume.is_finite() {
        volume.clamp(0.0, 1.0)
    } else {
        0.0
    };
    (VELOCITY_GAINS[level - 1] * volume.powf(1.5)).clamp(0.0, 1.0)
}

fn clamp_bpm(bpm: f64) -> f64 {
    if bpm.is_finite() {
        bpm.clamp(MIN_BPM, MAX_BPM)
    } else {
        DEFAULT_BPM
    }
}

fn clamp_swing(swing: f64) -> f64 {
    if swing.is_finite() {
        swing.clamp(0.0, MAX_SWING)
    } else {
        0.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransportState {
    pub bpm: f64,
    pub pattern_length: usize,
    pub swing: f64,
    pub playing: bool,
    /// Monotonic step counter, wrapped only for pattern lookup
    pub position: u64,
    /// Audio-clock time of the next unscheduled step
    pub next_event_time: f64,
    pub schedule_ahead_secs: f64,
    pub poll_interval_secs: f64,
}

/// A track hit due at `time`
#[derive(Debug, Clone, PartialEq)]
pub struct TrackTrigger {
    pub track: usize,
    pub time: f64,
    pub velocity: u8,
    pub note_index: Option<usize>,
    pub gain: f32,
}

/// Everything one step emits: the metronome tick, then the track hits
#[derive(Debug, Clone, PartialEq)]
pub struct StepEvents {
    pub position: u64,
    pub step: usize,
    pub time: f64,
    pub accent: bool,
    pub triggers: Vec<TrackTrigger>,
}

/// Lookahead scheduler.
///
/// Each `poll` turns every step that falls inside `[now, now + schedule_ahead)` into timed
/// events, so irregular polling never shifts the grid: step times are derived from the
/// previous step time, not from when the poll happened.
#[derive(Debug, Clone)]
pub struct Scheduler {
    transport: TransportState,
}

impl Scheduler {
    pub fn new(
        bpm: f64,
        pattern_length: usize,
        swing: f64,
        schedule_ahead_secs: f64,
        poll_interval_secs: f64,
    ) -> Self {
        Self {
            transport: TransportState {
                bpm: clamp_bpm(bpm),
                pattern_length: pattern_length.clamp(MIN_PATTERN_LENGTH, MAX_PATTERN_LENGTH),
                swing: clamp_swing(swing),
                playing: false,
                position: 0,
                next_event_time: 0.0,
                schedule_ahead_secs: schedule_ahead_secs.max(0.001),
                poll_interval_secs: poll_interval_secs.max(0.001),
            },
        }
    }

    pub fn transport(&self) -> &TransportState {
        &self.transport
    }

    pub fn is_playing(&self) -> bool {
        self.transport.playing
    }

    /// Sixteenth-note length in seconds
    pub fn step_duration(&self) -> f64 {
        60.0 / self.transport.bpm / 4.0
    }

    pub fn set_tempo(&mut self, bpm: f64) -> f64 {
        self.transport.bpm = clamp_bpm(bpm);
        self.transport.bpm
    }

    pub fn set_pattern_length(&mut self, length: usize) -> usize {
        self.transport.pattern_length = length.clamp(MIN_PATTERN_LENGTH, MAX_PATTERN_LENGTH);
        self.transport.pattern_length
    }

    pub fn set_swing(&mut self, swing: f64) -> f64 {
        self.transport.swing = clamp_swing(swing);
        self.transport.swing
    }

    pub fn play(&mut self, now: f64) {
        self.transport.playing = true;
        self.transport.position = 0;
        self.transport.next_event_time = now;
        debug!("transport started at {:.3}s", now);
    }

    pub fn stop(&mut self) {
        self.transport.playing = false;
        self.transport.position = 0;
        debug!("transport stopped");
    }

    /// Time until the next poll, or None when stopped
    pub fn rearm_interval(&self) -> Option<Duration> {
        self.transport
            .playing
            .then(|| Duration::from_secs_f64(self.transport.poll_interval_secs))
    }

    /// One scheduling pass at clock time `now`
    pub fn poll(&mut self, now: f64, project: &Project) -> Vec<StepEvents> {
        let mut out = Vec::new();
        if !self.transport.playing {
            return out;
        }
        let horizon = now + self.transport.schedule_ahead_secs;
        while self.transport.next_event_time < horizon {
            out.push(self.schedule_step(project));
            self.transport.position += 1;
            self.transport.next_event_time += self.step_duration();
        }
        out
    }

    fn schedule_step(&self, project: &Project) -> StepEvents {
        let t = &self.transport;
        let step = (t.position % t.pattern_length as u64) as usize;
        let swing_offset = if t.swing > 0.0 && step % 2 == 1 {
            self.step_duration() * t.swing
        } else {
            0.0
        };
        let time = t.next_event_time;

        let triggers = project
            .tracks()
            .iter()
            .enumerate()
            .filter(|(index, _)| project.is_audible(*index))
            .filter_map(|(index, track)| {
                let hit = track.hit(step)?;
                Some(TrackTrigger {
                    track: index,
                    time: time + swing_offset,
                    velocity: hit.velocity,
                    note_index: hit.note_index,
                    gain: compute_gain(track.volume, hit.velocity),
                })
            })
            .collect();

        StepEvents {
            position: t.position,
            step,
            time,
            accent: t.position % 4 == 0,
            triggers,
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(
            DEFAULT_BPM,
            16,
            0.0,
            DEFAULT_SCHEDULE_AHEAD,
            DEFAULT_POLL_INTERVAL,
        )
    }
}
