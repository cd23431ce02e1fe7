//! Audio-to-MIDI transcription strategies
//!
//! Transcription is an explicit strategy choice rather than an
//! exception-driven branch: `Model` runs the ONNX pitch-detection network,
//! `Fallback` substitutes a fixed, documented note sequence so every
//! downstream stage stays exercisable when the model is unavailable.

use crate::audio::Waveform;
use crate::config::Config;
use crate::error::{Result, ScoreError};
use midly::num::{u15, u24, u28, u4, u7};
use midly::{
    Format, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind,
};
use ndarray::{Axis, Ix2};
use ort::{GraphOptimizationLevel, Session, Tensor};
use std::path::Path;

/// A note detected by transcription, in wall-clock time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TranscribedNote {
    pub midi: u8,
    pub onset_sec: f32,
    pub duration_sec: f32,
    pub velocity: u8,
}

/// ONNX model wrapper for pitch detection
pub struct ModelTranscriber {
    session: Session,
}

impl ModelTranscriber {
    /// Load the model; failure here means the capability is unavailable
    pub fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let path = model_path.as_ref();
        if !path.exists() {
            return Err(ScoreError::TranscriptionError(format!(
                "Model file not found: {}",
                path.display()
            )));
        }
        let session = Session::builder()
            .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
            .and_then(|b| b.with_intra_threads(4))
            .and_then(|b| b.commit_from_file(path))
            .map_err(|e| ScoreError::TranscriptionError(format!("Cannot load model: {}", e)))?;
        Ok(Self { session })
    }

    /// Run windowed inference and decode activations into note events
    fn transcribe(&self, waveform: &Waveform, config: &Config) -> Result<Vec<TranscribedNote>> {
        let window_samples = config.transcription.window_samples;
        let mut frames: Vec<Vec<f32>> = Vec::new();
        let mut onsets: Vec<Vec<f32>> = Vec::new();

        for chunk in waveform.samples.chunks(window_samples) {
            let mut window = chunk.to_vec();
            window.resize(window_samples, 0.0);

            let input_shape: Vec<i64> = vec![1, window_samples as i64, 1];
            let input_tensor = Tensor::from_array((input_shape, window))
                .map_err(|e| ScoreError::TranscriptionError(format!("Bad input tensor: {}", e)))?;
            let inputs = ort::inputs![input_tensor]
                .map_err(|e| ScoreError::TranscriptionError(format!("Bad inputs: {}", e)))?;
            let outputs = self
                .session
                .run(inputs)
                .map_err(|e| ScoreError::TranscriptionError(format!("Inference failed: {}", e)))?;

            for (&key, value) in outputs.iter() {
                let activations = value
                    .try_extract_tensor::<f32>()
                    .map_err(|e| {
                        ScoreError::TranscriptionError(format!("Bad output tensor: {}", e))
                    })?
                    .index_axis(Axis(0), 0)
                    .into_dimensionality::<Ix2>()
                    .map_err(|e| {
                        ScoreError::TranscriptionError(format!("Bad output shape: {}", e))
                    })?
                    .to_owned();
                let rows: Vec<Vec<f32>> =
                    activations.outer_iter().map(|row| row.to_vec()).collect();
                match key {
                    "frames" => frames.extend(rows),
                    "onsets" => onsets.extend(rows),
                    _ => {}
                }
            }
        }

        if frames.is_empty() || onsets.is_empty() {
            return Err(ScoreError::TranscriptionError(
                "Model produced no frame/onset activations".to_string(),
            ));
        }

        Ok(activations_to_notes(&frames, &onsets, config))
    }
}

/// How a waveform is turned into a note sequence
pub enum TranscriptionStrategy {
    /// Real ML transcription via the configured ONNX model
    Model(ModelTranscriber),
    /// Fixed placeholder sequence from the configuration
    Fallback,
}

impl TranscriptionStrategy {
    /// Pick a strategy for this run, probing model availability once.
    ///
    /// An unavailable model is recoverable and selects the fallback; once a
    /// model is loaded, inference errors are fatal.
    pub fn select(config: &Config) -> Self {
        if config.transcription.force_fallback {
            log::info!("Transcription forced to fallback sequence by configuration");
            return TranscriptionStrategy::Fallback;
        }
        match ModelTranscriber::new(&config.transcription.model_path) {
            Ok(model) => TranscriptionStrategy::Model(model),
            Err(e) => {
                log::warn!("Transcription model unavailable ({}); using fallback sequence", e);
                TranscriptionStrategy::Fallback
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TranscriptionStrategy::Model(_) => "model",
            TranscriptionStrategy::Fallback => "fallback",
        }
    }

    /// Produce note events for the waveform
    pub fn transcribe(
        &self,
        waveform: &Waveform,
        config: &Config,
    ) -> Result<Vec<TranscribedNote>> {
        match self {
            TranscriptionStrategy::Model(model) => model.transcribe(waveform, config),
            TranscriptionStrategy::Fallback => Ok(fallback_notes(config)),
        }
    }
}

/// The documented fallback contract: the configured note sequence played
/// back to back at the export tempo
pub fn fallback_notes(config: &Config) -> Vec<TranscribedNote> {
    let seconds_per_quarter = 60.0 / config.export.tempo_bpm;
    let duration_sec =
        (config.transcription.fallback_duration_quarters as f32) * seconds_per_quarter;
    config
        .transcription
        .fallback_notes
        .iter()
        .enumerate()
        .map(|(i, &midi)| TranscribedNote {
            midi,
            onset_sec: i as f32 * duration_sec,
            duration_sec,
            velocity: config.transcription.fallback_velocity,
        })
        .collect()
}

/// Threshold frame/onset activation matrices into note events.
///
/// A note starts where the onset activation crosses the onset threshold and
/// extends while the frame activation stays above the frame threshold.
fn activations_to_notes(
    frames: &[Vec<f32>],
    onsets: &[Vec<f32>],
    config: &Config,
) -> Vec<TranscribedNote> {
    let tc = &config.transcription;
    let n_frames = frames.len().min(onsets.len());
    let n_pitches = frames.first().map(|row| row.len()).unwrap_or(0);
    let fps = tc.frames_per_second;

    let mut notes = Vec::new();
    for p in 0..n_pitches {
        let mut t = 0;
        while t < n_frames {
            if onsets[t][p] < tc.onset_threshold {
                t += 1;
                continue;
            }

            let start = t;
            let mut energy = 0.0_f32;
            while t < n_frames && frames[t][p] >= tc.frame_threshold {
                energy += frames[t][p];
                t += 1;
            }
            let length = t - start;
            if length >= tc.min_note_frames {
                let velocity = ((energy / length as f32) * 127.0).clamp(1.0, 127.0) as u8;
                notes.push(TranscribedNote {
                    midi: tc.min_midi_note.saturating_add(p as u8),
                    onset_sec: start as f32 / fps,
                    duration_sec: length as f32 / fps,
                    velocity,
                });
            } else {
                t = start + 1;
            }
        }
    }

    notes.sort_by(|a, b| {
        a.onset_sec
            .partial_cmp(&b.onset_sec)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.midi.cmp(&b.midi))
    });
    notes
}

/// Write transcribed notes as a single-track standard MIDI file
pub fn write_midi_file<P: AsRef<Path>>(
    notes: &[TranscribedNote],
    path: P,
    config: &Config,
) -> Result<()> {
    let ppq = config.export.ppq;
    let tempo_bpm = config.export.tempo_bpm;
    let ticks_per_sec = ppq as f32 * tempo_bpm / 60.0;

    // Absolute-tick on/off events, then delta encoding
    let mut events: Vec<(u32, bool, u8, u8)> = Vec::new();
    for note in notes {
        let on_tick = (note.onset_sec * ticks_per_sec) as u32;
        let off_tick = ((note.onset_sec + note.duration_sec) * ticks_per_sec).max(1.0) as u32;
        events.push((on_tick, true, note.midi, note.velocity));
        events.push((off_tick.max(on_tick + 1), false, note.midi, 0));
    }
    // Note-offs sort before note-ons at the same tick
    events.sort_by_key(|&(tick, is_on, key, _)| (tick, is_on, key));

    let tempo_uspq = (60_000_000.0 / tempo_bpm) as u32;
    let mut track_events = vec![TrackEvent {
        delta: u28::from(0),
        kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::from(tempo_uspq))),
    }];

    let mut current_tick = 0u32;
    for (tick, is_on, key, vel) in events {
        let delta = tick - current_tick;
        current_tick = tick;
        let message = if is_on {
            MidiMessage::NoteOn {
                key: u7::from(key),
                vel: u7::from(vel),
            }
        } else {
            MidiMessage::NoteOff {
                key: u7::from(key),
                vel: u7::from(0),
            }
        };
        track_events.push(TrackEvent {
            delta: u28::from(delta),
            kind: TrackEventKind::Midi {
                channel: u4::from(0),
                message,
            },
        });
    }

    track_events.push(TrackEvent {
        delta: u28::from(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });

    let smf = Smf {
        header: Header {
            format: Format::SingleTrack,
            timing: Timing::Metrical(u15::from(ppq)),
        },
        tracks: vec![track_events],
    };

    let mut bytes = Vec::new();
    smf.write(&mut bytes)
        .map_err(|e| ScoreError::TranscriptionError(format!("Cannot encode MIDI: {:?}", e)))?;
    std::fs::write(path.as_ref(), &bytes)?;
    Ok(())
}
