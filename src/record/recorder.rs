use std::io::Cursor;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crossbeam_channel::{Receiver, RecvTimeoutError};
use tracing::{debug, info, warn};

use super::tap::CaptureMessage;
use crate::command::{CommandSender, GraphCommand};
use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Idle,
    Recording,
    Stopped,
}

/// A finished (or in-progress snapshot) recording as a 16-bit mono WAV file
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedRecording {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub sample_rate: u32,
    pub frames: usize,
}

impl EncodedRecording {
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames as f64 / self.sample_rate as f64
    }
}

/// Encode mono samples as 16-bit PCM WAV bytes
pub fn encode_wav(samples: &[f32], sample_rate: u32) -> EngineResult<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for &s in samples {
            let v = (s * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer.write_sample(v)?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

fn recording_file_name() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    format!("chipgrid-{}.wav", secs)
}

/// Control-side recorder: asks the graph to capture, collects the chunks it sends back and
/// encodes them on demand.
pub struct Recorder {
    state: RecorderState,
    sample_rate: u32,
    chunk_frames: usize,
    sender: Option<CommandSender>,
    receiver: Option<Receiver<CaptureMessage>>,
    chunks: Vec<Vec<f32>>,
    /// Id of the latest capture session; messages from older ones are dropped
    session: u64,
    finished: bool,
    warned_unavailable: bool,
}

impl Recorder {
    /// A recorder with no capture path; every call reports `RecordingUnavailable`
    pub fn unavailable() -> Self {
        Self {
            state: RecorderState::Idle,
            sample_rate: 0,
            chunk_frames: 0,
            sender: None,
            receiver: None,
            chunks: Vec::new(),
            session: 0,
            finished: false,
            warned_unavailable: false,
        }
    }

    pub fn new(
        sender: CommandSender,
        receiver: Receiver<CaptureMessage>,
        sample_rate: u32,
        chunk_secs: f64,
    ) -> Self {
        let chunk_secs = if chunk_secs.is_finite() && chunk_secs > 0.0 {
            chunk_secs
        } else {
            super::DEFAULT_CHUNK_SECS
        };
        Self {
            state: RecorderState::Idle,
            sample_rate,
            chunk_frames: ((sample_rate as f64 * chunk_secs).round() as usize).max(1),
            sender: Some(sender),
            receiver: Some(receiver),
            chunks: Vec::new(),
            session: 0,
            finished: false,
            warned_unavailable: false,
        }
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    pub fn is_available(&self) -> bool {
        self.sender.is_some() && self.receiver.is_some()
    }

    /// Frames collected so far
    pub fn frames(&self) -> usize {
        self.chunks.iter().map(Vec::len).sum()
    }

    fn unavailable_error(&mut self) -> EngineError {
        if !self.warned_unavailable {
            warn!("Recording unavailable: no audio context");
            self.warned_unavailable = true;
        }
        EngineError::RecordingUnavailable("no audio context".to_string())
    }

    pub fn start(&mut self) -> EngineResult<()> {
        if self.state == RecorderState::Recording {
            return Ok(());
        }
        let Some(sender) = self.sender.as_ref() else {
            return Err(self.unavailable_error());
        };
        let session = self.session + 1;
        if !sender.send(GraphCommand::StartCapture {
            chunk_frames: self.chunk_frames,
            session,
        }) {
            return Err(self.unavailable_error());
        }
        self.session = session;
        self.chunks.clear();
        self.finished = false;
        self.state = RecorderState::Recording;
        info!("Recording started");
        Ok(())
    }

    pub fn stop(&mut self) {
        if self.state != RecorderState::Recording {
            return;
        }
        if let Some(sender) = self.sender.as_ref() {
            sender.send(GraphCommand::StopCapture);
        }
        self.state = RecorderState::Stopped;
        info!("Recording stopped");
    }

    /// Pull every chunk the audio thread has sent so far
    pub fn drain(&mut self) {
        let Some(receiver) = self.receiver.as_ref() else {
            return;
        };
        let messages: Vec<CaptureMessage> = receiver.try_iter().collect();
        for msg in messages {
            self.accept(msg);
        }
    }

    /// Keep a message from the current session. Returns true once its final flush arrived.
    fn accept(&mut self, msg: CaptureMessage) -> bool {
        if msg.session() != self.session {
            debug!("Dropping capture message from session {}", msg.session());
            return false;
        }
        match msg {
            CaptureMessage::Chunk { samples, .. } => self.chunks.push(samples),
            CaptureMessage::Finished { .. } => self.finished = true,
        }
        self.finished
    }

    /// Wait up to `timeout` for the final flush after `stop`
    pub fn wait_finished(&mut self, timeout: Duration) {
        self.drain();
        if self.finished || self.state != RecorderState::Stopped {
            return;
        }
        let Some(receiver) = self.receiver.clone() else {
            return;
        };
        loop {
            match receiver.recv_timeout(timeout) {
                Ok(msg) => {
                    if self.accept(msg) {
                        return;
                    }
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    debug!("Capture flush did not arrive in {:?}", timeout);
                    return;
                }
            }
        }
    }

    fn encode(&self) -> EngineResult<Option<EncodedRecording>> {
        if self.chunks.is_empty() {
            return Ok(None);
        }
        let samples: Vec<f32> = self.chunks.concat();
        let bytes = encode_wav(&samples, self.sample_rate)?;
        Ok(Some(EncodedRecording {
            file_name: recording_file_name(),
            bytes,
            sample_rate: self.sample_rate,
            frames: samples.len(),
        }))
    }

    /// The stopped recording. Nothing before `stop`, or when nothing was captured.
    pub fn export(&mut self) -> EngineResult<Option<EncodedRecording>> {
        if !self.is_available() {
            return Err(self.unavailable_error());
        }
        self.drain();
        if self.state != RecorderState::Stopped {
            return Ok(None);
        }
        self.encode()
    }

    /// Everything captured so far, without stopping
    pub fn current_buffer(&mut self) -> EngineResult<Option<EncodedRecording>> {
        if !self.is_available() {
            return Err(self.unavailable_error());
        }
        self.drain();
        self.encode()
    }
}
