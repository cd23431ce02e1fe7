//! MIDI export for annotated scores

use crate::config::Config;
use crate::error::{Result, ScoreError};
use crate::score::{Part, PartElement, Score};
use midly::num::{u15, u24, u28, u4, u7};
use midly::{
    Format, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind,
};
use std::path::Path;

const DEFAULT_VELOCITY: u8 = 64;

/// Export a score as a format-1 MIDI file
pub fn export_midi<P: AsRef<Path>>(score: &Score, path: P, config: &Config) -> Result<()> {
    let bytes = score_to_midi_bytes(score, config)?;
    std::fs::write(path.as_ref(), &bytes)
        .map_err(|e| ScoreError::MidiExportError(e.to_string()))?;
    log::info!(
        "Exported {} parts / {} notes to {}",
        score.parts.len(),
        score.total_notes(),
        path.as_ref().display()
    );
    Ok(())
}

/// Serialize a score to MIDI bytes: a conductor track with tempo and time
/// signature, then one track per part
pub fn score_to_midi_bytes(score: &Score, config: &Config) -> Result<Vec<u8>> {
    let ppq = config.export.ppq;
    let tempo_uspq = (60_000_000.0 / config.export.tempo_bpm) as u32;

    let mut conductor = Vec::new();
    if let Some(title) = &score.title {
        conductor.push(TrackEvent {
            delta: u28::from(0),
            kind: TrackEventKind::Meta(MetaMessage::TrackName(title.as_bytes())),
        });
    }
    conductor.push(TrackEvent {
        delta: u28::from(0),
        kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::from(tempo_uspq))),
    });
    conductor.push(TrackEvent {
        delta: u28::from(0),
        kind: TrackEventKind::Meta(MetaMessage::TimeSignature(
            config.export.beats_per_measure as u8,
            2, // denominator as log2: x/4 meter
            24,
            8,
        )),
    });
    conductor.push(TrackEvent {
        delta: u28::from(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });

    let mut tracks = vec![conductor];
    for (index, part) in score.parts.iter().enumerate() {
        tracks.push(part_to_track(part, index, ppq));
    }

    let smf = Smf {
        header: Header {
            format: Format::Parallel,
            timing: Timing::Metrical(u15::from(ppq)),
        },
        tracks,
    };

    let mut bytes = Vec::new();
    smf.write(&mut bytes)
        .map_err(|e| ScoreError::MidiExportError(format!("Cannot encode MIDI: {:?}", e)))?;
    Ok(bytes)
}

/// Serialize one part as a MIDI track.
///
/// Elements are sequential, so rests advance the running delta and every
/// note emits an on/off pair.
fn part_to_track(part: &Part, index: usize, ppq: u16) -> Vec<TrackEvent<'_>> {
    // Percussion hits keep channel 10, pitched material round-robins the rest
    let channel = (index % 9) as u8;
    let mut events = Vec::new();

    if let Some(instrument) = part.instrument {
        events.push(TrackEvent {
            delta: u28::from(0),
            kind: TrackEventKind::Meta(MetaMessage::TrackName(instrument.name().as_bytes())),
        });
        events.push(TrackEvent {
            delta: u28::from(0),
            kind: TrackEventKind::Midi {
                channel: u4::from(channel),
                message: MidiMessage::ProgramChange {
                    program: u7::from(instrument.midi_program()),
                },
            },
        });
    }

    let mut pending_delta = 0u32;
    for element in &part.elements {
        let duration_ticks = (element.duration_quarters() * ppq as f64).round() as u32;
        match element {
            PartElement::Rest { .. } => {
                pending_delta += duration_ticks;
            }
            PartElement::Note(note) => {
                let velocity = note.velocity.unwrap_or(DEFAULT_VELOCITY);
                events.push(TrackEvent {
                    delta: u28::from(pending_delta),
                    kind: TrackEventKind::Midi {
                        channel: u4::from(channel),
                        message: MidiMessage::NoteOn {
                            key: u7::from(note.pitch.midi()),
                            vel: u7::from(velocity),
                        },
                    },
                });
                events.push(TrackEvent {
                    delta: u28::from(duration_ticks),
                    kind: TrackEventKind::Midi {
                        channel: u4::from(channel),
                        message: MidiMessage::NoteOff {
                            key: u7::from(note.pitch.midi()),
                            vel: u7::from(0),
                        },
                    },
                });
                pending_delta = 0;
            }
            PartElement::Unpitched { key, .. } => {
                events.push(TrackEvent {
                    delta: u28::from(pending_delta),
                    kind: TrackEventKind::Midi {
                        channel: u4::from(9),
                        message: MidiMessage::NoteOn {
                            key: u7::from(*key),
                            vel: u7::from(DEFAULT_VELOCITY),
                        },
                    },
                });
                events.push(TrackEvent {
                    delta: u28::from(duration_ticks),
                    kind: TrackEventKind::Midi {
                        channel: u4::from(9),
                        message: MidiMessage::NoteOff {
                            key: u7::from(*key),
                            vel: u7::from(0),
                        },
                    },
                });
                pending_delta = 0;
            }
        }
    }

    events.push(TrackEvent {
        delta: u28::from(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });
    events
}
