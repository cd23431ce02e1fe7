//! Error types for the audio-to-score pipeline

use std::fmt;

/// Custom error type for audio-to-score processing
#[derive(Debug, Clone)]
pub enum ScoreError {
    /// E001: Invalid or unsupported audio format
    InvalidAudioFormat(String),
    /// E002: Unsupported sample rate
    UnsupportedSampleRate(u32),
    /// E003: Configuration validation failed
    ConfigValidationFailed(String),
    /// E004: Audio file I/O error
    AudioFileError(String),
    /// E005: Resampling error
    ResampleError(String),
    /// E006: Transcription error (model inference on a loaded model)
    TranscriptionError(String),
    /// E007: MIDI parse error
    MidiParseError(String),
    /// E008: Invalid instrument selection
    InvalidInstrument(String),
    /// E009: MIDI export error
    MidiExportError(String),
    /// E010: MusicXML export error
    MusicXmlExportError(String),
    /// E011: Input validation error
    InputValidationError(String),
    /// E012: Report generation error
    ReportError(String),
}

impl fmt::Display for ScoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreError::InvalidAudioFormat(msg) => {
                write!(f, "E001: Invalid audio format - {}", msg)
            }
            ScoreError::UnsupportedSampleRate(sr) => {
                write!(f, "E002: Unsupported sample rate {} Hz", sr)
            }
            ScoreError::ConfigValidationFailed(msg) => {
                write!(f, "E003: Configuration validation failed - {}", msg)
            }
            ScoreError::AudioFileError(msg) => {
                write!(f, "E004: Audio file I/O error - {}", msg)
            }
            ScoreError::ResampleError(msg) => {
                write!(f, "E005: Resampling error - {}", msg)
            }
            ScoreError::TranscriptionError(msg) => {
                write!(f, "E006: Transcription error - {}", msg)
            }
            ScoreError::MidiParseError(msg) => {
                write!(f, "E007: MIDI parse error - {}", msg)
            }
            ScoreError::InvalidInstrument(msg) => {
                write!(f, "E008: Invalid instrument selection - {}", msg)
            }
            ScoreError::MidiExportError(msg) => {
                write!(f, "E009: MIDI export error - {}", msg)
            }
            ScoreError::MusicXmlExportError(msg) => {
                write!(f, "E010: MusicXML export error - {}", msg)
            }
            ScoreError::InputValidationError(msg) => {
                write!(f, "E011: Input validation error - {}", msg)
            }
            ScoreError::ReportError(msg) => {
                write!(f, "E012: Report generation error - {}", msg)
            }
        }
    }
}

impl std::error::Error for ScoreError {}

// From implementations for common error types
impl From<std::io::Error> for ScoreError {
    fn from(err: std::io::Error) -> Self {
        ScoreError::AudioFileError(format!("File I/O error: {}", err))
    }
}

impl From<serde_json::Error> for ScoreError {
    fn from(err: serde_json::Error) -> Self {
        ScoreError::ReportError(format!("JSON serialization error: {}", err))
    }
}

/// Result type alias for audio-to-score operations
pub type Result<T> = std::result::Result<T, ScoreError>;
