use std::sync::Arc;

use parking_lot::RwLock;
use tracing::trace;

use super::clock::AudioClock;
use crate::command::{CommandReceiver, GraphCommand};
use crate::fx::BusProcessor;
use crate::record::RecordingTap;
use crate::synth::{ActiveVoice, BusInput, ScheduledVoice};

/// Snapshot the graph publishes after each render block
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphStatus {
    pub frames: u64,
    pub active_voices: usize,
    pub pending_voices: usize,
    /// Highest absolute output sample of the last block
    pub peak: f32,
    pub capturing: bool,
}

/// Everything that runs on the audio thread: scheduled voices, the effects bus and the
/// recording tap. Owned by the output callback (or by the offline context).
pub struct AudioGraph {
    sample_rate: u32,
    clock: AudioClock,
    commands: CommandReceiver,
    /// Sorted by start time
    pending: Vec<ScheduledVoice>,
    active: Vec<ActiveVoice>,
    bus: BusProcessor,
    tap: RecordingTap,
    status: Arc<RwLock<GraphStatus>>,
}

impl AudioGraph {
    pub fn new(
        clock: AudioClock,
        commands: CommandReceiver,
        bus: BusProcessor,
        tap: RecordingTap,
        status: Arc<RwLock<GraphStatus>>,
    ) -> Self {
        Self {
            sample_rate: clock.sample_rate(),
            clock,
            commands,
            pending: Vec::new(),
            active: Vec::new(),
            bus,
            tap,
            status,
        }
    }

    pub fn clock(&self) -> &AudioClock {
        &self.clock
    }

    pub fn active_voices(&self) -> usize {
        self.active.len()
    }

    pub fn pending_voices(&self) -> usize {
        self.pending.len()
    }

    fn schedule(&mut self, voice: ScheduledVoice) {
        let at = self.pending.partition_point(|v| v.start <= voice.start);
        self.pending.insert(at, voice);
    }

    /// Apply every queued command, in send order
    pub fn drain_commands(&mut self) {
        while let Some(cmd) = self.commands.try_recv() {
            match cmd {
                GraphCommand::Schedule(voice) => self.schedule(*voice),
                GraphCommand::StartCapture {
                    chunk_frames,
                    session,
                } => self.tap.start(chunk_frames, session),
                GraphCommand::StopCapture => self.tap.stop(),
                other => {
                    self.bus.apply(other);
                }
            }
        }
    }

    /// Render one block of mono output and advance the clock by its length
    pub fn render(&mut self, out: &mut [f32]) {
        self.drain_commands();

        let sr = self.sample_rate as f64;
        let base = self.clock.frames();
        let block_end = self.clock.frame_time(base + out.len() as u64);

        // Voices starting inside this block go live; they stay silent until their start time
        let due = self.pending.partition_point(|v| v.start < block_end);
        for voice in self.pending.drain(..due) {
            trace!(
                "voice {} live at {:.4}s, peak {:.3}",
                voice.label,
                voice.start,
                voice.peak_amplitude()
            );
            self.active.push(ActiveVoice::new(voice, sr as f32));
        }

        let mut peak = 0.0f32;
        for (i, sample) in out.iter_mut().enumerate() {
            let t = (base + i as u64) as f64 / sr;
            let mut master = 0.0f32;
            let mut metronome = 0.0f32;
            for voice in &mut self.active {
                let s = voice.next_sample(t);
                match voice.bus() {
                    BusInput::Master => master += s,
                    BusInput::Metronome => metronome += s,
                }
            }
            let y = self.bus.process(master, metronome);
            self.tap.push(y);
            peak = peak.max(y.abs());
            *sample = y;
        }

        self.active.retain(|v| !v.is_finished());
        self.clock.advance(out.len() as u64);
        self.publish(peak);
    }

    fn publish(&self, peak: f32) {
        // Never block the audio thread; a missed snapshot is replaced by the next one
        if let Some(mut status) = self.status.try_write() {
            status.frames = self.clock.frames();
            status.active_voices = self.active.len();
            status.pending_voices = self.pending.len();
            status.peak = peak;
            status.capturing = self.tap.is_capturing();
        }
    }
}
