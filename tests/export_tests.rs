//! Validation tests for MIDI/MusicXML export and score inspection

use audio2score::config::Config;
use audio2score::midi::score_to_midi_bytes;
use audio2score::musicxml::{score_to_musicxml, xml_escape};
use audio2score::report::ScoreReport;
use audio2score::score::{
    parse_midi_bytes, Instrument, NoteEvent, Part, PartElement, Pitch, Score,
};

/// Build a single-part score from MIDI note numbers with the given durations
fn make_score(notes: &[(u8, f64)]) -> Score {
    let mut part = Part::new();
    for &(midi, duration) in notes {
        let pitch = Pitch::from_midi(midi).unwrap();
        part.elements
            .push(PartElement::Note(NoteEvent::new(pitch, duration, Some(80))));
    }
    let mut score = Score::new();
    score.parts.push(part);
    score
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_midi_export_roundtrip() {
        let config = Config::default();
        let mut score = make_score(&[(60, 1.0), (64, 1.0), (67, 2.0)]);
        score.assign_instrument(Instrument::Piano);
        score.attach_metadata("Roundtrip", "Tester");

        let bytes = score_to_midi_bytes(&score, &config).unwrap();
        assert!(!bytes.is_empty());

        let parsed = parse_midi_bytes(&bytes).unwrap();
        // Conductor track carries no notes, so exactly one part comes back
        assert_eq!(parsed.parts.len(), 1);
        let pitches: Vec<String> = parsed.parts[0]
            .notes()
            .map(|n| n.pitch.to_string())
            .collect();
        assert_eq!(pitches, vec!["C4", "E4", "G4"]);

        let durations: Vec<f64> = parsed.parts[0]
            .notes()
            .map(|n| n.duration_quarters)
            .collect();
        assert!((durations[0] - 1.0).abs() < 0.01);
        assert!((durations[2] - 2.0).abs() < 0.01);
    }

    #[test]
    fn test_midi_export_preserves_rests() {
        let config = Config::default();
        let mut score = make_score(&[(60, 1.0)]);
        score.parts[0].elements.push(PartElement::Rest {
            duration_quarters: 1.0,
        });
        score.parts[0].elements.push(PartElement::Note(NoteEvent::new(
            Pitch::from_midi(62).unwrap(),
            1.0,
            Some(80),
        )));

        let bytes = score_to_midi_bytes(&score, &config).unwrap();
        let parsed = parse_midi_bytes(&bytes).unwrap();
        assert_eq!(parsed.parts[0].rest_count(), 1);
        assert_eq!(parsed.parts[0].note_count(), 2);
    }

    #[test]
    fn test_musicxml_structure() {
        let config = Config::default();
        let mut score = make_score(&[(60, 1.0), (64, 1.0)]);
        score.assign_instrument(Instrument::Violin);
        score.attach_metadata("Structure Test", "Nobody");

        let xml = score_to_musicxml(&score, &config);
        assert!(xml.contains("<score-partwise version=\"3.1\">"));
        assert!(xml.contains("<work-title>Structure Test</work-title>"));
        assert!(xml.contains("<creator type=\"composer\">Nobody</creator>"));
        assert!(xml.contains("<score-part id=\"P1\">"));
        assert!(xml.contains("<part-name>Violin</part-name>"));
        assert!(xml.contains("<instrument-sound>strings.violin</instrument-sound>"));
        assert!(xml.contains("<step>C</step>"));
        assert!(xml.contains("<octave>4</octave>"));
        assert!(xml.contains("<type>quarter</type>"));
        assert!(xml.ends_with("</score-partwise>\n"));
    }

    #[test]
    fn test_musicxml_escapes_metadata() {
        let config = Config::default();
        let mut score = make_score(&[(60, 1.0)]);
        score.attach_metadata("Fish & <Chips>", "\"Q\" O'Brien");

        let xml = score_to_musicxml(&score, &config);
        assert!(xml.contains("Fish &amp; &lt;Chips&gt;"));
        assert!(xml.contains("&quot;Q&quot; O&apos;Brien"));
        assert!(!xml.contains("Fish & <"));
    }

    #[test]
    fn test_musicxml_splits_notes_across_barlines() {
        let config = Config::default();
        // 3 quarters, then 2 quarters: the second note crosses the 4/4 barline
        let score = make_score(&[(60, 3.0), (62, 2.0)]);

        let xml = score_to_musicxml(&score, &config);
        assert!(xml.contains("<tie type=\"start\"/>"));
        assert!(xml.contains("<tie type=\"stop\"/>"));
        assert!(xml.contains("<measure number=\"2\">"));
        // Split chunks: 1 quarter before the barline, 1 after
        assert_eq!(xml.matches("<step>D</step>").count(), 2);
    }

    #[test]
    fn test_musicxml_middle_tie_chunks_carry_both_marks() {
        let config = Config::default();
        // 9 quarters in 4/4 split into chunks of 4, 4 and 1: the middle
        // chunk both ends one tie and starts the next
        let score = make_score(&[(60, 9.0)]);

        let xml = score_to_musicxml(&score, &config);
        assert_eq!(xml.matches("<tie type=\"stop\"/>").count(), 2);
        assert_eq!(xml.matches("<tie type=\"start\"/>").count(), 2);
        assert_eq!(xml.matches("<tied type=\"stop\"/>").count(), 2);
        assert_eq!(xml.matches("<tied type=\"start\"/>").count(), 2);
        assert!(
            xml.contains("<tied type=\"stop\"/>\n          <tied type=\"start\"/>"),
            "middle chunk must carry both tied marks in one notations block"
        );
    }

    #[test]
    fn test_musicxml_pads_final_measure() {
        let config = Config::default();
        let score = make_score(&[(60, 1.0)]);

        let xml = score_to_musicxml(&score, &config);
        // 1 quarter of content plus a 3-quarter padding rest
        assert!(xml.contains("<rest/>"));
        assert!(xml.contains("<duration>1440</duration>"));
    }

    #[test]
    fn test_musicxml_cello_gets_bass_clef() {
        let config = Config::default();
        let mut score = make_score(&[(48, 1.0)]);
        score.assign_instrument(Instrument::Cello);

        let xml = score_to_musicxml(&score, &config);
        assert!(xml.contains("<sign>F</sign>"));
    }

    #[test]
    fn test_xml_escape() {
        assert_eq!(xml_escape("a&b"), "a&amp;b");
        assert_eq!(xml_escape("<tag>"), "&lt;tag&gt;");
        assert_eq!(xml_escape("plain"), "plain");
    }

    #[test]
    fn test_score_report() {
        let mut score = make_score(&[(60, 1.0), (64, 1.0), (67, 1.0), (72, 1.0)]);
        score.parts[0].elements.push(PartElement::Rest {
            duration_quarters: 1.0,
        });
        score.assign_instrument(Instrument::Piano);
        score.attach_metadata("Report", "R");

        let report = ScoreReport::from_score(&score);
        assert_eq!(report.part_count, 1);
        assert_eq!(report.total_notes, 4);
        let part = &report.parts[0];
        assert_eq!(part.instrument.as_deref(), Some("Piano"));
        assert_eq!(part.note_count, 4);
        assert_eq!(part.rest_count, 1);
        assert_eq!(part.lowest.as_deref(), Some("C4"));
        assert_eq!(part.highest.as_deref(), Some("C5"));
        // Intervals: C4->E4 = 4, E4->G4 = 3, G4->C5 = 5
        assert_eq!(part.interval_histogram.get(&4), Some(&1));
        assert_eq!(part.interval_histogram.get(&3), Some(&1));
        assert_eq!(part.interval_histogram.get(&5), Some(&1));

        let text = report.to_text();
        assert!(text.contains("Range: C4 - C5"));
    }

    #[test]
    fn test_score_report_json_export() {
        let mut score = make_score(&[(60, 1.0), (64, 1.0)]);
        score.assign_instrument(Instrument::Piano);

        let dir = tempfile::tempdir().unwrap();
        let json_path = dir.path().join("report.json");
        ScoreReport::from_score(&score).write_json(&json_path).unwrap();

        let contents = std::fs::read_to_string(&json_path).unwrap();
        let parsed: ScoreReport = serde_json::from_str(&contents).unwrap();
        assert_eq!(parsed.total_notes, 2);
    }
}
