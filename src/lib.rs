//! Audio2Score Conversion Pipeline
//!
//! Converts an audio recording into an engraved score: decode and resample
//! the audio, transcribe it to MIDI (ML model or fixed fallback), build a
//! score from the MIDI, annotate it with an instrument voice and metadata,
//! and export MIDI/MusicXML plus optional PDF/PNG renderings.

pub mod audio;
pub mod config;
pub mod error;
pub mod midi;
pub mod musicxml;
pub mod render;
pub mod report;
pub mod score;
pub mod transcribe;

pub use config::Config;
pub use error::{Result as ScoreErrorResult, ScoreError};
pub use score::{Instrument, Score};

use crate::report::ScoreReport;
use crate::transcribe::TranscriptionStrategy;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tempfile::TempDir;

/// Outcome of one pipeline run
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Which transcription strategy produced the notes ("model" or "fallback")
    pub strategy: &'static str,
    pub midi_path: PathBuf,
    pub musicxml_path: PathBuf,
    pub pdf_path: Option<PathBuf>,
    pub png_path: Option<PathBuf>,
    pub report: ScoreReport,
}

/// Main processing pipeline for audio-to-score conversion
pub struct Audio2Score {
    config: Config,
}

impl Audio2Score {
    /// Create a new processor with the given configuration
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Create a processor with the instrument voice parsed from user input.
    ///
    /// An invalid selection fails here, before any pipeline stage runs and
    /// before any output file is written.
    pub fn with_instrument(mut config: Config, instrument: &str) -> ScoreErrorResult<Self> {
        config.score.instrument = Instrument::from_str(instrument)?;
        Ok(Self { config })
    }

    /// Convert an audio file, writing outputs next to `output_base`
    /// (`<base>.mid`, `<base>.musicxml`, optionally `<base>.pdf`/`.png`)
    pub fn process<P: AsRef<Path>>(
        &self,
        input_path: P,
        output_base: P,
    ) -> ScoreErrorResult<RunSummary> {
        let input_path = input_path.as_ref();
        let output_base = output_base.as_ref();

        // Scoped working directory, deleted on all exit paths
        let workdir = TempDir::new()?;

        log::info!("Loading audio from {}", input_path.display());
        let waveform = audio::load_audio_file(input_path, &self.config)?;
        log::info!(
            "Loaded {:.1}s of audio at {} Hz ({} samples)",
            waveform.duration_sec(),
            waveform.sample_rate,
            waveform.n_samples()
        );

        let strategy = TranscriptionStrategy::select(&self.config);
        log::info!("Transcribing ({} strategy)", strategy.name());
        let notes = strategy.transcribe(&waveform, &self.config)?;
        let transcribed_midi = workdir.path().join("transcribed.mid");
        transcribe::write_midi_file(&notes, &transcribed_midi, &self.config)?;

        log::info!("Building score from {} transcribed notes", notes.len());
        let parsed = score::parse_midi_file(&transcribed_midi)?;
        let mut built = score::filter_pitched_parts(parsed);
        built.assign_instrument(self.config.score.instrument);
        built.attach_metadata(&self.config.score.title, &self.config.score.composer);

        self.export_results(&built, output_base, strategy.name())
    }

    /// Export MIDI and MusicXML (mandatory), then PDF/PNG (optional)
    fn export_results(
        &self,
        score: &Score,
        output_base: &Path,
        strategy: &'static str,
    ) -> ScoreErrorResult<RunSummary> {
        if let Some(parent) = output_base.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let midi_path = output_base.with_extension("mid");
        midi::export_midi(score, &midi_path, &self.config)?;

        let musicxml_path = output_base.with_extension("musicxml");
        musicxml::export_musicxml(score, &musicxml_path, &self.config)?;

        let pdf_path = if self.config.export.write_pdf {
            render::render_optional(
                &musicxml_path,
                &output_base.with_extension("pdf"),
                &self.config,
            )
        } else {
            None
        };
        let png_path = if self.config.export.write_png {
            render::render_optional(
                &musicxml_path,
                &output_base.with_extension("png"),
                &self.config,
            )
        } else {
            None
        };

        Ok(RunSummary {
            strategy,
            midi_path,
            musicxml_path,
            pdf_path,
            png_path,
            report: ScoreReport::from_score(score),
        })
    }
}

/// Validate configuration and input file before processing
pub fn validate_input<P: AsRef<Path>>(input_path: P, config: &Config) -> ScoreErrorResult<()> {
    audio::validate_audio_file(input_path)?;
    config::validate_config(config)?;
    Ok(())
}
