//! Score data model and MIDI-to-score building
//!
//! A score is constructed fresh per pipeline run from a parsed MIDI source,
//! annotated in place (instrument, metadata) and handed to the exporters.

use crate::error::{Result, ScoreError};
use midly::{MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// MIDI channel reserved for percussion (channel 10, zero-indexed 9)
const PERCUSSION_CHANNEL: u8 = 9;

/// Gaps shorter than this (in quarter notes) are not rendered as rests
const REST_EPSILON: f64 = 1.0 / 64.0;

/// Symbolic pitch backed by a MIDI note number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pitch {
    midi: u8,
}

const STEP_TABLE: [(&str, i8); 12] = [
    ("C", 0),
    ("C", 1),
    ("D", 0),
    ("D", 1),
    ("E", 0),
    ("F", 0),
    ("F", 1),
    ("G", 0),
    ("G", 1),
    ("A", 0),
    ("A", 1),
    ("B", 0),
];

impl Pitch {
    pub fn from_midi(midi: u8) -> Result<Self> {
        if midi > 127 {
            return Err(ScoreError::MidiParseError(format!(
                "MIDI note {} outside range 0-127",
                midi
            )));
        }
        Ok(Self { midi })
    }

    pub fn midi(&self) -> u8 {
        self.midi
    }

    /// Diatonic step letter (sharp spelling)
    pub fn step(&self) -> &'static str {
        STEP_TABLE[(self.midi % 12) as usize].0
    }

    /// Chromatic alteration in semitones (0 or 1 with sharp spelling)
    pub fn alter(&self) -> i8 {
        STEP_TABLE[(self.midi % 12) as usize].1
    }

    /// Scientific pitch notation octave (middle C = C4 = MIDI 60)
    pub fn octave(&self) -> i8 {
        (self.midi / 12) as i8 - 1
    }

    /// Pitch class name without octave, e.g. "C#"
    pub fn class_name(&self) -> String {
        if self.alter() > 0 {
            format!("{}#", self.step())
        } else {
            self.step().to_string()
        }
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.class_name(), self.octave())
    }
}

/// A single pitched note; immutable once created
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoteEvent {
    pub pitch: Pitch,
    /// Duration in quarter-note units
    pub duration_quarters: f64,
    pub velocity: Option<u8>,
}

impl NoteEvent {
    pub fn new(pitch: Pitch, duration_quarters: f64, velocity: Option<u8>) -> Self {
        Self {
            pitch,
            duration_quarters,
            velocity,
        }
    }
}

/// One element in a part's ordered sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PartElement {
    Note(NoteEvent),
    Rest {
        duration_quarters: f64,
    },
    /// Percussion-channel hit without a symbolic pitch
    Unpitched {
        key: u8,
        duration_quarters: f64,
    },
}

impl PartElement {
    pub fn duration_quarters(&self) -> f64 {
        match self {
            PartElement::Note(n) => n.duration_quarters,
            PartElement::Rest { duration_quarters } => *duration_quarters,
            PartElement::Unpitched {
                duration_quarters, ..
            } => *duration_quarters,
        }
    }
}

/// Ordered sequence of notes and rests, optionally tagged with a voice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    pub elements: Vec<PartElement>,
    pub instrument: Option<Instrument>,
}

impl Part {
    pub fn new() -> Self {
        Self {
            elements: Vec::new(),
            instrument: None,
        }
    }

    /// A part is pitched if it contains at least one note event
    pub fn is_pitched(&self) -> bool {
        self.elements
            .iter()
            .any(|e| matches!(e, PartElement::Note(_)))
    }

    /// Iterate over the pitched note events in order
    pub fn notes(&self) -> impl Iterator<Item = &NoteEvent> {
        self.elements.iter().filter_map(|e| match e {
            PartElement::Note(n) => Some(n),
            _ => None,
        })
    }

    pub fn note_count(&self) -> usize {
        self.notes().count()
    }

    pub fn rest_count(&self) -> usize {
        self.elements
            .iter()
            .filter(|e| matches!(e, PartElement::Rest { .. }))
            .count()
    }

    /// Total duration in quarter notes
    pub fn duration_quarters(&self) -> f64 {
        self.elements.iter().map(|e| e.duration_quarters()).sum()
    }
}

impl Default for Part {
    fn default() -> Self {
        Self::new()
    }
}

/// Ordered collection of parts plus score-level metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub parts: Vec<Part>,
    pub title: Option<String>,
    pub composer: Option<String>,
}

impl Score {
    pub fn new() -> Self {
        Self {
            parts: Vec::new(),
            title: None,
            composer: None,
        }
    }

    /// Assign the chosen voice to every part of the score
    pub fn assign_instrument(&mut self, instrument: Instrument) {
        for part in &mut self.parts {
            part.instrument = Some(instrument);
        }
    }

    /// Set or overwrite score-level title and composer; idempotent
    pub fn attach_metadata(&mut self, title: &str, composer: &str) {
        self.title = Some(title.to_string());
        self.composer = Some(composer.to_string());
    }

    pub fn total_notes(&self) -> usize {
        self.parts.iter().map(|p| p.note_count()).sum()
    }
}

impl Default for Score {
    fn default() -> Self {
        Self::new()
    }
}

/// Supported instrument voices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instrument {
    Piano,
    Violin,
    Cello,
}

impl Instrument {
    pub fn name(&self) -> &'static str {
        match self {
            Instrument::Piano => "Piano",
            Instrument::Violin => "Violin",
            Instrument::Cello => "Cello",
        }
    }

    /// General MIDI program number
    pub fn midi_program(&self) -> u8 {
        match self {
            Instrument::Piano => 0,
            Instrument::Violin => 40,
            Instrument::Cello => 42,
        }
    }

    /// MusicXML standard sound identifier
    pub fn sound_id(&self) -> &'static str {
        match self {
            Instrument::Piano => "keyboard.piano",
            Instrument::Violin => "strings.violin",
            Instrument::Cello => "strings.cello",
        }
    }

    pub fn all() -> [Instrument; 3] {
        [Instrument::Piano, Instrument::Violin, Instrument::Cello]
    }
}

impl FromStr for Instrument {
    type Err = ScoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "piano" => Ok(Instrument::Piano),
            "violin" => Ok(Instrument::Violin),
            "cello" => Ok(Instrument::Cello),
            _ => Err(ScoreError::InvalidInstrument(format!(
                "'{}' is not one of Piano, Violin, Cello",
                s
            ))),
        }
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Raw note span extracted from a MIDI track before sequencing
#[derive(Debug, Clone, Copy)]
struct RawNote {
    onset_ticks: u64,
    duration_ticks: u64,
    key: u8,
    velocity: u8,
    channel: u8,
}

/// Parse a MIDI file into a score
pub fn parse_midi_file<P: AsRef<Path>>(path: P) -> Result<Score> {
    let bytes = std::fs::read(path.as_ref()).map_err(|e| {
        ScoreError::MidiParseError(format!("Cannot read {}: {}", path.as_ref().display(), e))
    })?;
    parse_midi_bytes(&bytes)
}

/// Parse MIDI bytes into a score: one part per track carrying note events,
/// with gaps between notes rendered as rests
pub fn parse_midi_bytes(bytes: &[u8]) -> Result<Score> {
    let smf = Smf::parse(bytes)
        .map_err(|e| ScoreError::MidiParseError(format!("Invalid MIDI data: {}", e)))?;

    let ppq = match smf.header.timing {
        Timing::Metrical(ppq) => ppq.as_int() as f64,
        Timing::Timecode(..) => {
            return Err(ScoreError::MidiParseError(
                "SMPTE timecode timing not supported".to_string(),
            ))
        }
    };

    let mut score = Score::new();
    for track in &smf.tracks {
        let raw_notes = collect_track_notes(track)?;
        if raw_notes.is_empty() {
            // Meta-only track (tempo map, markers), not a musical part
            continue;
        }
        score.parts.push(sequence_part(raw_notes, ppq));
    }

    if score.parts.is_empty() {
        return Err(ScoreError::MidiParseError(
            "MIDI source contains no note events".to_string(),
        ));
    }

    Ok(score)
}

/// Pair note-on/note-off events into raw note spans
fn collect_track_notes(track: &[midly::TrackEvent]) -> Result<Vec<RawNote>> {
    // (channel, key) -> (onset_ticks, velocity)
    let mut active: Vec<((u8, u8), (u64, u8))> = Vec::new();
    let mut notes = Vec::new();
    let mut tick: u64 = 0;

    for event in track {
        tick += event.delta.as_int() as u64;
        if let TrackEventKind::Midi { channel, message } = event.kind {
            let channel = channel.as_int();
            match message {
                MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                    active.push(((channel, key.as_int()), (tick, vel.as_int())));
                }
                MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                    let id = (channel, key.as_int());
                    if let Some(pos) = active.iter().position(|(k, _)| *k == id) {
                        let (_, (onset, velocity)) = active.remove(pos);
                        notes.push(RawNote {
                            onset_ticks: onset,
                            duration_ticks: tick.saturating_sub(onset),
                            key: id.1,
                            velocity,
                            channel,
                        });
                    }
                    // Unmatched note-off is ignored
                }
                _ => {}
            }
        } else if let TrackEventKind::Meta(MetaMessage::EndOfTrack) = event.kind {
            break;
        }
    }

    // Notes left hanging at end of track get their remaining length
    for ((channel, key), (onset, velocity)) in active {
        notes.push(RawNote {
            onset_ticks: onset,
            duration_ticks: tick.saturating_sub(onset),
            key,
            velocity,
            channel,
        });
    }

    notes.sort_by_key(|n| (n.onset_ticks, n.key));
    Ok(notes)
}

/// Flatten raw note spans into an ordered element sequence.
///
/// Overlapping notes are truncated at the next onset; notes starting inside
/// an already-emitted span are dropped (monophonic flattening).
fn sequence_part(raw_notes: Vec<RawNote>, ppq: f64) -> Part {
    let mut part = Part::new();
    let mut cursor_q = 0.0_f64;

    for (i, raw) in raw_notes.iter().enumerate() {
        let onset_q = raw.onset_ticks as f64 / ppq;
        if onset_q < cursor_q - REST_EPSILON {
            continue;
        }

        let gap = onset_q - cursor_q;
        if gap > REST_EPSILON {
            part.elements.push(PartElement::Rest {
                duration_quarters: gap,
            });
            cursor_q += gap;
        }

        let mut duration_q = raw.duration_ticks as f64 / ppq;
        if let Some(next) = raw_notes.get(i + 1) {
            let next_onset_q = next.onset_ticks as f64 / ppq;
            if next_onset_q > onset_q && next_onset_q - onset_q < duration_q {
                duration_q = next_onset_q - onset_q;
            }
        }
        if duration_q <= 0.0 {
            continue;
        }

        if raw.channel == PERCUSSION_CHANNEL {
            part.elements.push(PartElement::Unpitched {
                key: raw.key,
                duration_quarters: duration_q,
            });
        } else {
            // Key comes from a u7, always a valid pitch
            let pitch = Pitch::from_midi(raw.key).unwrap_or(Pitch { midi: 60 });
            part.elements.push(PartElement::Note(NoteEvent::new(
                pitch,
                duration_q,
                Some(raw.velocity),
            )));
        }
        cursor_q += duration_q;
    }

    part
}

/// Keep only parts with at least one pitched note event.
///
/// If filtering would remove every part, the original part set is retained:
/// keeping percussive content beats producing an empty score.
pub fn filter_pitched_parts(score: Score) -> Score {
    let pitched: Vec<&Part> = score.parts.iter().filter(|p| p.is_pitched()).collect();
    if pitched.is_empty() {
        if !score.parts.is_empty() {
            log::warn!(
                "No pitched parts found; keeping all {} original parts",
                score.parts.len()
            );
        }
        return score;
    }

    let parts = score
        .parts
        .iter()
        .filter(|p| p.is_pitched())
        .cloned()
        .collect();
    Score {
        parts,
        title: score.title,
        composer: score.composer,
    }
}
