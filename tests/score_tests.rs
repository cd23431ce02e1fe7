//! Validation tests for the score model and builder operations

use audio2score::score::{
    filter_pitched_parts, Instrument, NoteEvent, Part, PartElement, Pitch, Score,
};
use std::str::FromStr;

/// Build a part holding the given MIDI note numbers as quarter notes
fn pitched_part(midi_notes: &[u8]) -> Part {
    let mut part = Part::new();
    for &midi in midi_notes {
        let pitch = Pitch::from_midi(midi).unwrap();
        part.elements
            .push(PartElement::Note(NoteEvent::new(pitch, 1.0, Some(64))));
    }
    part
}

/// Build a part with only percussion hits and rests
fn percussion_part() -> Part {
    let mut part = Part::new();
    part.elements.push(PartElement::Unpitched {
        key: 36,
        duration_quarters: 1.0,
    });
    part.elements.push(PartElement::Rest {
        duration_quarters: 1.0,
    });
    part.elements.push(PartElement::Unpitched {
        key: 38,
        duration_quarters: 1.0,
    });
    part
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pitch_naming() {
        assert_eq!(Pitch::from_midi(60).unwrap().to_string(), "C4");
        assert_eq!(Pitch::from_midi(61).unwrap().to_string(), "C#4");
        assert_eq!(Pitch::from_midi(69).unwrap().to_string(), "A4");
        assert_eq!(Pitch::from_midi(21).unwrap().to_string(), "A0");
        assert_eq!(Pitch::from_midi(72).unwrap().to_string(), "C5");

        let e4 = Pitch::from_midi(64).unwrap();
        assert_eq!(e4.step(), "E");
        assert_eq!(e4.alter(), 0);
        assert_eq!(e4.octave(), 4);
    }

    #[test]
    fn test_part_pitched_detection() {
        assert!(pitched_part(&[60]).is_pitched());
        assert!(!percussion_part().is_pitched());
        assert!(!Part::new().is_pitched());
    }

    #[test]
    fn test_filter_removes_unpitched_parts() {
        let mut score = Score::new();
        score.parts.push(pitched_part(&[60, 64, 67]));
        score.parts.push(percussion_part());

        let filtered = filter_pitched_parts(score);
        assert_eq!(filtered.parts.len(), 1);
        assert!(filtered.parts[0].is_pitched());
    }

    #[test]
    fn test_filter_keeps_original_when_nothing_pitched() {
        let mut score = Score::new();
        score.parts.push(percussion_part());
        score.parts.push(percussion_part());

        let filtered = filter_pitched_parts(score.clone());
        assert_eq!(filtered, score, "unfiltered part set must be retained");
        assert_eq!(filtered.parts.len(), 2);
    }

    #[test]
    fn test_filter_is_idempotent() {
        let mut score = Score::new();
        score.parts.push(pitched_part(&[60, 62]));
        score.parts.push(percussion_part());
        score.parts.push(pitched_part(&[72]));

        let once = filter_pitched_parts(score);
        let twice = filter_pitched_parts(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_instrument_assignment_is_total() {
        let mut score = Score::new();
        score.parts.push(pitched_part(&[60]));
        score.parts.push(percussion_part());
        score.parts.push(pitched_part(&[64, 67]));

        score.assign_instrument(Instrument::Violin);
        assert!(score
            .parts
            .iter()
            .all(|p| p.instrument == Some(Instrument::Violin)));
    }

    #[test]
    fn test_metadata_attachment_is_idempotent() {
        let mut score = Score::new();
        score.parts.push(pitched_part(&[60]));

        score.attach_metadata("My Title", "Composer");
        score.attach_metadata("My Title", "Composer");
        assert_eq!(score.title.as_deref(), Some("My Title"));
        assert_eq!(score.composer.as_deref(), Some("Composer"));

        // Overwrites rather than appending
        score.attach_metadata("Other", "Someone Else");
        assert_eq!(score.title.as_deref(), Some("Other"));
        assert_eq!(score.composer.as_deref(), Some("Someone Else"));
    }

    #[test]
    fn test_instrument_parsing() {
        assert_eq!(Instrument::from_str("Piano").unwrap(), Instrument::Piano);
        assert_eq!(Instrument::from_str("violin").unwrap(), Instrument::Violin);
        assert_eq!(Instrument::from_str("CELLO").unwrap(), Instrument::Cello);
    }

    #[test]
    fn test_invalid_instrument_is_rejected() {
        let err = Instrument::from_str("Guitar").unwrap_err();
        let msg = err.to_string();
        assert!(msg.starts_with("E008"), "unexpected error: {}", msg);
        assert!(msg.contains("Guitar"));
    }

    #[test]
    fn test_instrument_programs() {
        assert_eq!(Instrument::Piano.midi_program(), 0);
        assert_eq!(Instrument::Violin.midi_program(), 40);
        assert_eq!(Instrument::Cello.midi_program(), 42);
        assert_eq!(Instrument::all().len(), 3);
    }

    #[test]
    fn test_part_statistics() {
        let mut part = pitched_part(&[60, 64]);
        part.elements.push(PartElement::Rest {
            duration_quarters: 2.0,
        });
        assert_eq!(part.note_count(), 2);
        assert_eq!(part.rest_count(), 1);
        assert!((part.duration_quarters() - 4.0).abs() < 1e-9);
    }
}
