//! MusicXML emitter: serializes an annotated score as score-partwise 3.1
//!
//! Notes are laid out into fixed-meter measures; events crossing a barline
//! are split and tied.

use crate::config::Config;
use crate::error::{Result, ScoreError};
use crate::score::{Instrument, Part, PartElement, Pitch, Score};
use std::fmt::Write as _;
use std::path::Path;

/// Divisions per quarter note in emitted documents
const DIVISIONS: u32 = 480;

/// Export a score as a MusicXML file
pub fn export_musicxml<P: AsRef<Path>>(score: &Score, path: P, config: &Config) -> Result<()> {
    let xml = score_to_musicxml(score, config);
    std::fs::write(path.as_ref(), xml.as_bytes())
        .map_err(|e| ScoreError::MusicXmlExportError(e.to_string()))?;
    log::info!("Exported MusicXML to {}", path.as_ref().display());
    Ok(())
}

/// Emit a complete score-partwise document
pub fn score_to_musicxml(score: &Score, config: &Config) -> String {
    let mut xml = String::new();
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str("<!DOCTYPE score-partwise PUBLIC \"-//Recordare//DTD MusicXML 3.1 Partwise//EN\" \"http://www.musicxml.org/dtds/partwise.dtd\">\n");
    xml.push_str("<score-partwise version=\"3.1\">\n");

    if let Some(title) = &score.title {
        if !title.is_empty() {
            let _ = writeln!(
                xml,
                "  <work>\n    <work-title>{}</work-title>\n  </work>",
                xml_escape(title)
            );
        }
    }
    if let Some(composer) = &score.composer {
        if !composer.is_empty() {
            let _ = writeln!(
                xml,
                "  <identification>\n    <creator type=\"composer\">{}</creator>\n  </identification>",
                xml_escape(composer)
            );
        }
    }

    xml.push_str("  <part-list>\n");
    for (i, part) in score.parts.iter().enumerate() {
        emit_score_part(&mut xml, part, i + 1);
    }
    xml.push_str("  </part-list>\n");

    for (i, part) in score.parts.iter().enumerate() {
        emit_part(&mut xml, part, i + 1, config);
    }

    xml.push_str("</score-partwise>\n");
    xml
}

/// Emit one part-list entry with its instrument binding
fn emit_score_part(xml: &mut String, part: &Part, number: usize) {
    let name = part
        .instrument
        .map(|ins| ins.name().to_string())
        .unwrap_or_else(|| format!("Part {}", number));

    let _ = writeln!(xml, "    <score-part id=\"P{}\">", number);
    let _ = writeln!(xml, "      <part-name>{}</part-name>", xml_escape(&name));
    if let Some(instrument) = part.instrument {
        let _ = writeln!(
            xml,
            "      <score-instrument id=\"P{}-I1\">",
            number
        );
        let _ = writeln!(
            xml,
            "        <instrument-name>{}</instrument-name>",
            instrument.name()
        );
        let _ = writeln!(
            xml,
            "        <instrument-sound>{}</instrument-sound>",
            instrument.sound_id()
        );
        xml.push_str("      </score-instrument>\n");
        let _ = writeln!(xml, "      <midi-instrument id=\"P{}-I1\">", number);
        let _ = writeln!(
            xml,
            "        <midi-program>{}</midi-program>",
            instrument.midi_program() + 1
        );
        xml.push_str("      </midi-instrument>\n");
    }
    xml.push_str("    </score-part>\n");
}

/// Emit one part body: measures with barline splitting and ties
fn emit_part(xml: &mut String, part: &Part, number: usize, config: &Config) {
    let capacity = DIVISIONS * config.export.beats_per_measure;
    let _ = writeln!(xml, "  <part id=\"P{}\">", number);

    let mut measure_number = 0u32;
    let mut position = 0u32;
    let mut measure_open = false;

    for element in &part.elements {
        let total = (element.duration_quarters() * DIVISIONS as f64).round() as u32;
        if total == 0 {
            continue;
        }

        let mut remaining = total;
        let mut continued = false;
        while remaining > 0 {
            if !measure_open {
                measure_number += 1;
                open_measure(xml, measure_number, part.instrument, config);
                measure_open = true;
            }

            let chunk = remaining.min(capacity - position);
            let tie_start = remaining > chunk;

            match element {
                PartElement::Note(note) => {
                    emit_note(xml, Some(note.pitch), chunk, continued, tie_start, false);
                }
                PartElement::Rest { .. } => {
                    emit_note(xml, None, chunk, false, false, false);
                }
                PartElement::Unpitched { key, .. } => {
                    let display = Pitch::from_midi((*key).min(127)).ok();
                    emit_note(xml, display, chunk, continued, tie_start, true);
                }
            }

            position += chunk;
            remaining -= chunk;
            continued = tie_start;
            if position == capacity {
                xml.push_str("    </measure>\n");
                measure_open = false;
                position = 0;
            }
        }
    }

    if measure_open {
        // Pad the trailing partial measure with a rest
        emit_note(xml, None, capacity - position, false, false, false);
        xml.push_str("    </measure>\n");
    } else if measure_number == 0 {
        // Empty part still needs one whole-measure rest
        open_measure(xml, 1, part.instrument, config);
        emit_note(xml, None, capacity, false, false, false);
        xml.push_str("    </measure>\n");
    }

    let _ = writeln!(xml, "  </part>");
}

/// Open a measure; the first one carries the attributes block
fn open_measure(
    xml: &mut String,
    number: u32,
    instrument: Option<Instrument>,
    config: &Config,
) {
    let _ = writeln!(xml, "    <measure number=\"{}\">", number);
    if number == 1 {
        xml.push_str("      <attributes>\n");
        let _ = writeln!(xml, "        <divisions>{}</divisions>", DIVISIONS);
        xml.push_str("        <key>\n          <fifths>0</fifths>\n        </key>\n");
        let _ = writeln!(
            xml,
            "        <time>\n          <beats>{}</beats>\n          <beat-type>4</beat-type>\n        </time>",
            config.export.beats_per_measure
        );
        let (sign, line) = clef_for(instrument);
        let _ = writeln!(
            xml,
            "        <clef>\n          <sign>{}</sign>\n          <line>{}</line>\n        </clef>",
            sign, line
        );
        xml.push_str("      </attributes>\n");
    }
}

fn clef_for(instrument: Option<Instrument>) -> (&'static str, u8) {
    match instrument {
        Some(Instrument::Cello) => ("F", 4),
        _ => ("G", 2),
    }
}

/// Emit one note, rest or unpitched hit
fn emit_note(
    xml: &mut String,
    pitch: Option<Pitch>,
    duration: u32,
    tie_stop: bool,
    tie_start: bool,
    unpitched: bool,
) {
    xml.push_str("      <note>\n");
    match (pitch, unpitched) {
        (Some(p), false) => {
            xml.push_str("        <pitch>\n");
            let _ = writeln!(xml, "          <step>{}</step>", p.step());
            if p.alter() != 0 {
                let _ = writeln!(xml, "          <alter>{}</alter>", p.alter());
            }
            let _ = writeln!(xml, "          <octave>{}</octave>", p.octave());
            xml.push_str("        </pitch>\n");
        }
        (Some(p), true) => {
            xml.push_str("        <unpitched>\n");
            let _ = writeln!(xml, "          <display-step>{}</display-step>", p.step());
            let _ = writeln!(
                xml,
                "          <display-octave>{}</display-octave>",
                p.octave()
            );
            xml.push_str("        </unpitched>\n");
        }
        (None, _) => {
            xml.push_str("        <rest/>\n");
        }
    }
    let _ = writeln!(xml, "        <duration>{}</duration>", duration);
    if tie_stop {
        xml.push_str("        <tie type=\"stop\"/>\n");
    }
    if tie_start {
        xml.push_str("        <tie type=\"start\"/>\n");
    }
    if let Some((type_name, dotted)) = duration_to_type(duration) {
        let _ = writeln!(xml, "        <type>{}</type>", type_name);
        if dotted {
            xml.push_str("        <dot/>\n");
        }
    }
    if tie_stop || tie_start {
        xml.push_str("        <notations>\n");
        if tie_stop {
            xml.push_str("          <tied type=\"stop\"/>\n");
        }
        if tie_start {
            xml.push_str("          <tied type=\"start\"/>\n");
        }
        xml.push_str("        </notations>\n");
    }
    xml.push_str("      </note>\n");
}

/// Map a duration in divisions to a note type, if it is a clean value
fn duration_to_type(duration: u32) -> Option<(&'static str, bool)> {
    let plain: &[(u32, &str)] = &[
        (DIVISIONS * 4, "whole"),
        (DIVISIONS * 2, "half"),
        (DIVISIONS, "quarter"),
        (DIVISIONS / 2, "eighth"),
        (DIVISIONS / 4, "16th"),
        (DIVISIONS / 8, "32nd"),
    ];
    for &(divs, name) in plain {
        if duration == divs {
            return Some((name, false));
        }
        if duration == divs + divs / 2 {
            return Some((name, true));
        }
    }
    None
}

/// Escape text content for XML
pub fn xml_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
