//! End-to-end pipeline tests using the fallback transcription strategy

use audio2score::config::{validate_config, Config};
use audio2score::score::parse_midi_file;
use audio2score::transcribe::{fallback_notes, write_midi_file, TranscriptionStrategy};
use audio2score::{validate_input, Audio2Score};
use std::path::Path;

/// Write a one-second 440 Hz sine WAV at the given sample rate
fn write_test_wav(path: &Path, sample_rate: u32) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for i in 0..sample_rate {
        let t = i as f32 / sample_rate as f32;
        let sample = (t * 440.0 * 2.0 * std::f32::consts::PI).sin() * 0.5;
        writer.write_sample((sample * i16::MAX as f32) as i16).unwrap();
    }
    writer.finalize().unwrap();
}

/// Pipeline config that always uses the fallback sequence and a renderer
/// command that cannot exist on the test machine
fn fallback_config() -> Config {
    let mut config = Config::default();
    config.transcription.force_fallback = true;
    config.export.renderer_command = "audio2score-no-such-renderer".to_string();
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_sequence_contract() {
        let config = Config::default();
        let notes = fallback_notes(&config);

        let midis: Vec<u8> = notes.iter().map(|n| n.midi).collect();
        assert_eq!(midis, vec![60, 64, 67, 72], "C4 E4 G4 C5");

        // Back to back quarter notes at 120 BPM
        for (i, note) in notes.iter().enumerate() {
            assert!((note.onset_sec - i as f32 * 0.5).abs() < 1e-6);
            assert!((note.duration_sec - 0.5).abs() < 1e-6);
            assert_eq!(note.velocity, 80);
        }
    }

    #[test]
    fn test_fallback_strategy_selected_when_model_missing() {
        let mut config = Config::default();
        config.transcription.model_path = "/nonexistent/model.onnx".to_string();
        let strategy = TranscriptionStrategy::select(&config);
        assert_eq!(strategy.name(), "fallback");
    }

    #[test]
    fn test_transcribed_midi_parses_back() {
        let config = Config::default();
        let dir = tempfile::tempdir().unwrap();
        let midi_path = dir.path().join("transcribed.mid");

        let notes = fallback_notes(&config);
        write_midi_file(&notes, &midi_path, &config).unwrap();

        let score = parse_midi_file(&midi_path).unwrap();
        assert_eq!(score.parts.len(), 1);
        let names: Vec<String> = score.parts[0]
            .notes()
            .map(|n| n.pitch.class_name())
            .collect();
        assert_eq!(names, vec!["C", "E", "G", "C"]);
    }

    #[test]
    fn test_pipeline_produces_mandatory_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let wav_path = dir.path().join("input.wav");
        write_test_wav(&wav_path, 16000);
        let output_base = dir.path().join("out").join("song");

        let processor = Audio2Score::new(fallback_config());
        let summary = processor.process(&wav_path, &output_base).unwrap();

        assert_eq!(summary.strategy, "fallback");
        let midi_meta = std::fs::metadata(&summary.midi_path).unwrap();
        assert!(midi_meta.len() > 0, "MIDI output must be non-empty");
        let xml_meta = std::fs::metadata(&summary.musicxml_path).unwrap();
        assert!(xml_meta.len() > 0, "MusicXML output must be non-empty");
    }

    #[test]
    fn test_renderer_failure_does_not_affect_mandatory_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let wav_path = dir.path().join("input.wav");
        write_test_wav(&wav_path, 16000);
        let output_base = dir.path().join("song");

        // PDF/PNG requested but the renderer command does not exist
        let processor = Audio2Score::new(fallback_config());
        let summary = processor.process(&wav_path, &output_base).unwrap();

        assert!(summary.pdf_path.is_none());
        assert!(summary.png_path.is_none());
        assert!(summary.midi_path.exists());
        assert!(summary.musicxml_path.exists());
    }

    #[test]
    fn test_fallback_pitches_reach_the_musicxml() {
        let dir = tempfile::tempdir().unwrap();
        let wav_path = dir.path().join("input.wav");
        write_test_wav(&wav_path, 16000);
        let output_base = dir.path().join("song");

        let processor = Audio2Score::new(fallback_config());
        let summary = processor.process(&wav_path, &output_base).unwrap();

        let xml = std::fs::read_to_string(&summary.musicxml_path).unwrap();
        let steps: Vec<&str> = xml
            .match_indices("<step>")
            .map(|(i, _)| &xml[i + 6..i + 7])
            .collect();
        assert_eq!(steps, vec!["C", "E", "G", "C"]);

        // And the parsed MIDI output agrees
        let score = parse_midi_file(&summary.midi_path).unwrap();
        let names: Vec<String> = score.parts[0]
            .notes()
            .map(|n| n.pitch.to_string())
            .collect();
        assert_eq!(names, vec!["C4", "E4", "G4", "C5"]);
    }

    #[test]
    fn test_pipeline_resamples_non_target_rates() {
        let dir = tempfile::tempdir().unwrap();
        let wav_path = dir.path().join("input.wav");
        write_test_wav(&wav_path, 22050);
        let output_base = dir.path().join("song");

        let processor = Audio2Score::new(fallback_config());
        let summary = processor.process(&wav_path, &output_base).unwrap();
        assert!(summary.midi_path.exists());
    }

    #[test]
    fn test_invalid_instrument_writes_no_files() {
        let dir = tempfile::tempdir().unwrap();
        let wav_path = dir.path().join("input.wav");
        write_test_wav(&wav_path, 16000);
        let output_base = dir.path().join("out").join("song");

        // Same ordering as the CLI: selection is parsed before processing
        let result = Audio2Score::with_instrument(fallback_config(), "Theremin")
            .and_then(|p| p.process(&wav_path, &output_base));

        let err = result.unwrap_err();
        assert!(err.to_string().starts_with("E008"), "got: {}", err);
        assert!(!output_base.with_extension("mid").exists());
        assert!(!output_base.with_extension("musicxml").exists());
        assert!(
            !dir.path().join("out").exists(),
            "rejection must happen before any output is created"
        );
    }

    #[test]
    fn test_resampler_drains_trailing_audio() {
        let dir = tempfile::tempdir().unwrap();
        let wav_path = dir.path().join("input.wav");
        write_test_wav(&wav_path, 22050);

        let waveform =
            audio2score::audio::load_audio_file(&wav_path, &fallback_config()).unwrap();
        assert_eq!(waveform.sample_rate, 16000);
        // One second of input must stay close to one second after resampling
        let n = waveform.n_samples();
        assert!(
            (15900..=16300).contains(&n),
            "resampled length {} drifted from the input duration",
            n
        );
    }

    #[test]
    fn test_missing_input_is_rejected_before_processing() {
        let config = fallback_config();
        let err = validate_input("/nonexistent/input.wav", &config).unwrap_err();
        assert!(err.to_string().starts_with("E011"), "got: {}", err);
    }

    #[test]
    fn test_unsupported_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.ogg");
        std::fs::write(&path, b"not audio").unwrap();

        let err = validate_input(&path, &fallback_config()).unwrap_err();
        assert!(err.to_string().starts_with("E001"), "got: {}", err);
    }

    #[test]
    fn test_config_validation_catches_bad_values() {
        let mut config = Config::default();
        config.transcription.fallback_notes.clear();
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.export.tempo_bpm = 0.0;
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.audio.target_sample_rate = 1000;
        assert!(validate_config(&config).is_err());

        // ppq above the 15-bit MIDI limit would silently wrap in export
        let mut config = Config::default();
        config.export.ppq = 40000;
        assert!(validate_config(&config).is_err());

        assert!(validate_config(&Config::default()).is_ok());
    }
}
