//! Optional PDF/PNG rendering through an external engraver
//!
//! Rendering shells out to a MuseScore-compatible command on the exported
//! MusicXML file. These formats are optional: any failure is reported as a
//! warning and the pipeline continues.

use crate::config::Config;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Render the MusicXML file to the given output path.
///
/// Returns the output path on success, `None` on any failure (missing
/// renderer, non-zero exit, missing output file).
pub fn render_optional(
    musicxml_path: &Path,
    output_path: &Path,
    config: &Config,
) -> Option<PathBuf> {
    let renderer = &config.export.renderer_command;

    let result = Command::new(renderer)
        .arg(musicxml_path)
        .arg("-o")
        .arg(output_path)
        .output();

    match result {
        Ok(output) if output.status.success() && output_path.exists() => {
            log::info!("Rendered {}", output_path.display());
            Some(output_path.to_path_buf())
        }
        Ok(output) => {
            log::warn!(
                "Renderer '{}' failed for {} (status {}); continuing without it",
                renderer,
                output_path.display(),
                output.status
            );
            None
        }
        Err(e) => {
            log::warn!(
                "Renderer '{}' unavailable ({}); skipping {}",
                renderer,
                e,
                output_path.display()
            );
            None
        }
    }
}
