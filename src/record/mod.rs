pub mod recorder;
pub mod sink;
pub mod tap;

pub use recorder::{encode_wav, EncodedRecording, Recorder, RecorderState};
pub use sink::{DirectorySink, RecordingSink};
pub use tap::{capture_channel, CaptureMessage, RecordingTap, DEFAULT_CHUNK_SECS};
