//! Configuration system for the audio-to-score pipeline

use crate::error::{Result, ScoreError};
use crate::score::Instrument;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub version: String,
    pub audio: AudioConfig,
    pub transcription: TranscriptionConfig,
    pub score: ScoreConfig,
    pub export: ExportConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            audio: AudioConfig::default(),
            transcription: TranscriptionConfig::default(),
            score: ScoreConfig::default(),
            export: ExportConfig::default(),
        }
    }
}

/// Audio loading configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Sample rate every input is resampled to before transcription
    pub target_sample_rate: u32,
    /// Sinc interpolation length for the resampler
    pub resample_sinc_len: usize,
    /// Resampler anti-aliasing cutoff (fraction of Nyquist)
    pub resample_cutoff: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: 16000,
            resample_sinc_len: 256,
            resample_cutoff: 0.95,
        }
    }
}

/// Transcription configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    /// Path to the ONNX pitch-detection model
    pub model_path: String,
    /// Skip model probing and always use the fixed fallback sequence
    pub force_fallback: bool,
    /// Samples per inference window
    pub window_samples: usize,
    /// Activation frames produced per second of audio
    pub frames_per_second: f32,
    /// Onset activation threshold for starting a note
    pub onset_threshold: f32,
    /// Frame activation threshold for sustaining a note
    pub frame_threshold: f32,
    /// Lowest MIDI note the model reports (A0 for an 88-key range)
    pub min_midi_note: u8,
    /// Minimum note length in frames; shorter detections are discarded
    pub min_note_frames: usize,
    /// MIDI note numbers of the fallback sequence
    pub fallback_notes: Vec<u8>,
    /// Quarter-note duration of each fallback note
    pub fallback_duration_quarters: f64,
    /// Velocity attached to fallback notes
    pub fallback_velocity: u8,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            model_path: "models/pitch_detection.onnx".to_string(),
            force_fallback: false,
            window_samples: 32768,
            frames_per_second: 86.0,
            onset_threshold: 0.5,
            frame_threshold: 0.3,
            min_midi_note: 21,
            min_note_frames: 5,
            // C major chord arpeggio: C4 E4 G4 C5
            fallback_notes: vec![60, 64, 67, 72],
            fallback_duration_quarters: 1.0,
            fallback_velocity: 80,
        }
    }
}

/// Score annotation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreConfig {
    /// Instrument voice assigned to every retained part
    pub instrument: Instrument,
    pub title: String,
    pub composer: String,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            instrument: Instrument::Piano,
            title: "Generated by audio2score".to_string(),
            composer: "audio2score".to_string(),
        }
    }
}

/// Export configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// MIDI pulses per quarter note
    pub ppq: u16,
    /// Tempo written into exported files
    pub tempo_bpm: f32,
    /// Beats per measure for MusicXML engraving
    pub beats_per_measure: u32,
    /// External renderer command used for PDF/PNG (MuseScore-compatible)
    pub renderer_command: String,
    pub write_pdf: bool,
    pub write_png: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            ppq: 480,
            tempo_bpm: 120.0,
            beats_per_measure: 4,
            renderer_command: "mscore".to_string(),
            write_pdf: true,
            write_png: true,
        }
    }
}

/// Load configuration from a JSON file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
        ScoreError::ConfigValidationFailed(format!(
            "Cannot read config file {}: {}",
            path.as_ref().display(),
            e
        ))
    })?;
    let config: Config = serde_json::from_str(&contents)
        .map_err(|e| ScoreError::ConfigValidationFailed(format!("Invalid config JSON: {}", e)))?;
    validate_config(&config)?;
    Ok(config)
}

/// Validate configuration parameter ranges
pub fn validate_config(config: &Config) -> Result<()> {
    if !(8000..=192000).contains(&config.audio.target_sample_rate) {
        return Err(ScoreError::ConfigValidationFailed(format!(
            "target_sample_rate {} outside supported range 8000-192000",
            config.audio.target_sample_rate
        )));
    }
    if config.transcription.window_samples == 0 {
        return Err(ScoreError::ConfigValidationFailed(
            "window_samples must be non-zero".to_string(),
        ));
    }
    if config.transcription.frames_per_second <= 0.0 {
        return Err(ScoreError::ConfigValidationFailed(
            "frames_per_second must be positive".to_string(),
        ));
    }
    if !(0.0..=1.0).contains(&config.transcription.onset_threshold)
        || !(0.0..=1.0).contains(&config.transcription.frame_threshold)
    {
        return Err(ScoreError::ConfigValidationFailed(
            "activation thresholds must be in [0, 1]".to_string(),
        ));
    }
    if config.transcription.fallback_notes.is_empty() {
        return Err(ScoreError::ConfigValidationFailed(
            "fallback_notes must contain at least one note".to_string(),
        ));
    }
    if let Some(&n) = config
        .transcription
        .fallback_notes
        .iter()
        .find(|&&n| n > 127)
    {
        return Err(ScoreError::ConfigValidationFailed(format!(
            "fallback note {} outside MIDI range 0-127",
            n
        )));
    }
    if config.transcription.fallback_duration_quarters <= 0.0 {
        return Err(ScoreError::ConfigValidationFailed(
            "fallback_duration_quarters must be positive".to_string(),
        ));
    }
    if config.export.ppq == 0 {
        return Err(ScoreError::ConfigValidationFailed(
            "ppq must be non-zero".to_string(),
        ));
    }
    // MIDI metrical timing is a 15-bit field
    if config.export.ppq > 32767 {
        return Err(ScoreError::ConfigValidationFailed(format!(
            "ppq {} exceeds the MIDI maximum of 32767",
            config.export.ppq
        )));
    }
    if config.export.tempo_bpm <= 0.0 {
        return Err(ScoreError::ConfigValidationFailed(
            "tempo_bpm must be positive".to_string(),
        ));
    }
    if config.export.beats_per_measure == 0 {
        return Err(ScoreError::ConfigValidationFailed(
            "beats_per_measure must be non-zero".to_string(),
        ));
    }
    Ok(())
}
