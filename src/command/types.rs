use crate::fx::DriveCurve;
use crate::synth::ScheduledVoice;

/// Messages from the control thread to the audio graph.
///
/// Everything here is immutable once sent; the graph applies commands at the start of each
/// render block, in the order they were sent.
#[derive(Debug, Clone)]
pub enum GraphCommand {
    /// Queue a one-shot voice for its start time
    Schedule(Box<ScheduledVoice>),

    // Effects bus
    SetMasterGain(f32),
    SetDrive { amount: f32, curve: DriveCurve },
    SetDelayTime(f32),
    SetDelayFeedback(f32),
    SetDelayMix(f32),
    SetMetronomeGain(f32),

    // Recording tap
    StartCapture { chunk_frames: usize, session: u64 },
    StopCapture,
}

impl GraphCommand {
    /// Short human-readable description for debug logging
    pub fn description(&self) -> String {
        match self {
            GraphCommand::Schedule(voice) => {
                format!("schedule {} @ {:.3}s", voice.label, voice.start)
            }
            GraphCommand::SetMasterGain(v) => format!("master gain {:.2}", v),
            GraphCommand::SetDrive { amount, .. } => format!("drive {:.2}", amount),
            GraphCommand::SetDelayTime(v) => format!("delay time {:.3}s", v),
            GraphCommand::SetDelayFeedback(v) => format!("delay feedback {:.2}", v),
            GraphCommand::SetDelayMix(v) => format!("delay mix {:.2}", v),
            GraphCommand::SetMetronomeGain(v) => format!("metronome gain {:.2}", v),
            GraphCommand::StartCapture {
                chunk_frames,
                session,
            } => format!("start capture #{} ({} frame chunks)", session, chunk_frames),
            GraphCommand::StopCapture => "stop capture".to_string(),
        }
    }
}
