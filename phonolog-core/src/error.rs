use thiserror::Error;

/// All errors produced by phonolog-core.
#[derive(Debug, Error)]
pub enum PhonologError {
    #[error("audio capture is not supported on this system")]
    CaptureUnsupported,

    #[error("microphone access denied, allow microphone access and retry")]
    MicAccessDenied,

    #[error("no audio input device found, connect a microphone")]
    NoInputDevice,

    #[error("audio device error: {0}")]
    AudioDevice(String),

    #[error("audio stream error: {0}")]
    AudioStream(String),

    #[error("a recording is already in progress")]
    AlreadyRecording,

    #[error("audio encoding error: {0}")]
    Encode(String),

    #[error("word \"{word}\" not found in dictionary")]
    WordNotFound { word: String },

    #[error("no pronunciation data available for this word")]
    NoPronunciationData,

    #[error("dictionary request failed: {0}")]
    Dictionary(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, PhonologError>;
