use thiserror::Error;

/// Errors crossing the engine API. None of them abort the scheduling loop; callers log them
/// and carry on with the affected feature disabled.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No usable output device or host
    #[error("Audio output unsupported: {0}")]
    UnsupportedPlatform(String),

    /// The output stream failed to build or start
    #[error("Audio stream error: {0}")]
    Stream(String),

    /// Sample bytes could not be decoded
    #[error("Sample decode failed: {0}")]
    DecodeFailure(String),

    /// No capture path to record from
    #[error("Recording unavailable: {0}")]
    RecordingUnavailable(String),

    /// WAV encoding of a recording failed
    #[error("WAV encode error: {0}")]
    Encode(#[from] hound::Error),
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
