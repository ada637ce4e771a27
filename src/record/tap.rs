use crossbeam_channel::{Receiver, Sender};

/// Chunk length when none is configured
pub const DEFAULT_CHUNK_SECS: f64 = 1.0;

/// What the audio thread hands back to the recorder. Every message carries the session id of
/// the capture that produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureMessage {
    Chunk { session: u64, samples: Vec<f32> },
    /// Capture stopped; the partial chunk (if any) was sent just before this
    Finished { session: u64 },
}

impl CaptureMessage {
    pub fn session(&self) -> u64 {
        match self {
            CaptureMessage::Chunk { session, .. } | CaptureMessage::Finished { session } => {
                *session
            }
        }
    }
}

pub fn capture_channel() -> (Sender<CaptureMessage>, Receiver<CaptureMessage>) {
    crossbeam_channel::unbounded()
}

/// Audio-thread end of the recording tap. Copies the bus output into fixed-size chunks while
/// capture is on.
pub struct RecordingTap {
    sender: Sender<CaptureMessage>,
    buffer: Vec<f32>,
    chunk_frames: usize,
    session: u64,
    capturing: bool,
}

impl RecordingTap {
    pub fn new(sender: Sender<CaptureMessage>) -> Self {
        Self {
            sender,
            buffer: Vec::new(),
            chunk_frames: 0,
            session: 0,
            capturing: false,
        }
    }

    pub fn is_capturing(&self) -> bool {
        self.capturing
    }

    /// Begin a capture session. A session still running is finished first.
    pub fn start(&mut self, chunk_frames: usize, session: u64) {
        self.stop();
        self.session = session;
        self.chunk_frames = chunk_frames.max(1);
        self.buffer = Vec::with_capacity(self.chunk_frames);
        self.capturing = true;
    }

    /// Flush the partial chunk and signal the end of the capture
    pub fn stop(&mut self) {
        if !self.capturing {
            return;
        }
        self.capturing = false;
        if !self.buffer.is_empty() {
            let samples = std::mem::take(&mut self.buffer);
            let _ = self.sender.send(CaptureMessage::Chunk {
                session: self.session,
                samples,
            });
        }
        let _ = self.sender.send(CaptureMessage::Finished {
            session: self.session,
        });
    }

    pub fn push(&mut self, sample: f32) {
        if !self.capturing {
            return;
        }
        self.buffer.push(sample);
        if self.buffer.len() >= self.chunk_frames {
            let samples =
                std::mem::replace(&mut self.buffer, Vec::with_capacity(self.chunk_frames));
            let msg = CaptureMessage::Chunk {
                session: self.session,
                samples,
            };
            // Receiver gone means nobody is recording any more
            if self.sender.send(msg).is_err() {
                self.capturing = false;
            }
        }
    }
}
