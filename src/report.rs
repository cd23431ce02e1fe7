//! Score inspection: human-readable statistics and JSON artifacts

use crate::error::Result;
use crate::score::{Part, Score};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Statistics for one part
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartReport {
    pub instrument: Option<String>,
    pub note_count: usize,
    pub rest_count: usize,
    pub duration_quarters: f64,
    /// Lowest pitch, e.g. "C4"
    pub lowest: Option<String>,
    /// Highest pitch, e.g. "G5"
    pub highest: Option<String>,
    /// Melodic interval distribution in semitones (absolute)
    pub interval_histogram: BTreeMap<u8, usize>,
}

/// Statistics for a whole score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreReport {
    pub title: Option<String>,
    pub composer: Option<String>,
    pub part_count: usize,
    pub total_notes: usize,
    pub parts: Vec<PartReport>,
}

impl ScoreReport {
    pub fn from_score(score: &Score) -> Self {
        Self {
            title: score.title.clone(),
            composer: score.composer.clone(),
            part_count: score.parts.len(),
            total_notes: score.total_notes(),
            parts: score.parts.iter().map(part_report).collect(),
        }
    }

    /// Write the report as pretty-printed JSON
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }

    /// Render a human-readable summary
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "Title: {}\n",
            self.title.as_deref().unwrap_or("N/A")
        ));
        out.push_str(&format!(
            "Composer: {}\n",
            self.composer.as_deref().unwrap_or("N/A")
        ));
        out.push_str(&format!("Parts: {}\n", self.part_count));
        for (i, part) in self.parts.iter().enumerate() {
            out.push_str(&format!("\nPart {}:\n", i + 1));
            out.push_str(&format!(
                "  Instrument: {}\n",
                part.instrument.as_deref().unwrap_or("(none)")
            ));
            out.push_str(&format!("  Notes: {}\n", part.note_count));
            out.push_str(&format!("  Rests: {}\n", part.rest_count));
            out.push_str(&format!(
                "  Duration: {} quarter notes\n",
                part.duration_quarters
            ));
            if let (Some(lo), Some(hi)) = (&part.lowest, &part.highest) {
                out.push_str(&format!("  Range: {} - {}\n", lo, hi));
            }
        }
        out
    }
}

fn part_report(part: &Part) -> PartReport {
    let notes: Vec<_> = part.notes().collect();

    let lowest = notes
        .iter()
        .min_by_key(|n| n.pitch.midi())
        .map(|n| n.pitch.to_string());
    let highest = notes
        .iter()
        .max_by_key(|n| n.pitch.midi())
        .map(|n| n.pitch.to_string());

    let mut interval_histogram = BTreeMap::new();
    for pair in notes.windows(2) {
        let interval = pair[1].pitch.midi().abs_diff(pair[0].pitch.midi());
        *interval_histogram.entry(interval).or_insert(0) += 1;
    }

    PartReport {
        instrument: part.instrument.map(|i| i.name().to_string()),
        note_count: notes.len(),
        rest_count: part.rest_count(),
        duration_quarters: part.duration_quarters(),
        lowest,
        highest,
        interval_histogram,
    }
}
