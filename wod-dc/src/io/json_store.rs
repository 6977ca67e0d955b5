//! JSON catalog files
//!
//! The working catalog, enriched batches, and published output are all
//! pretty-printed JSON arrays of workout records. Reports keep a JSON
//! artifact next to the rendered markdown.

use std::path::Path;

use wod_common::record::Workout;
use wod_common::{Error, Result};

use crate::services::report::RunReport;

pub fn read_workouts(path: &Path) -> Result<Vec<Workout>> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| Error::NotFound(format!("{}: {e}", path.display())))?;
    serde_json::from_str(&raw).map_err(|e| Error::Parse(format!("{}: {e}", path.display())))
}

pub fn write_workouts(path: &Path, workouts: &[Workout]) -> Result<()> {
    let raw = serde_json::to_string_pretty(workouts)?;
    std::fs::write(path, raw)?;
    tracing::info!(path = %path.display(), rows = workouts.len(), "Wrote catalog");
    Ok(())
}

/// Write the run report as both markdown and a JSON artifact. `base`
/// names the markdown file; the artifact lands next to it with a `.json`
/// extension.
pub fn write_report(base: &Path, report: &RunReport) -> Result<()> {
    std::fs::write(base, report.render_markdown())?;
    let artifact = base.with_extension("json");
    std::fs::write(&artifact, serde_json::to_string_pretty(report)?)?;
    tracing::info!(path = %base.display(), "Wrote run report");
    Ok(())
}
