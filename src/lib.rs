//! Chiptune step sequencer: a lookahead scheduler driving a small voice synthesizer, an
//! effects bus and a recorder, rendered to the default output device or offline.

pub mod audio;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod fx;
pub mod pitch;
pub mod record;
pub mod sequencer;
pub mod synth;

pub use config::{EngineConfig, OutputMode, ScaleConfig};
pub use engine::Engine;
pub use error::{EngineError, EngineResult};
pub use record::{DirectorySink, EncodedRecording, RecordingSink};
pub use sequencer::{StepValue, TrackKind, TEMPLATES};
pub use synth::SOUNDBOARD;
