//! Augmented table export
//!
//! Serializes original columns plus the appended result column to CSV.
//! Used for both checkpoint artifacts and the final export; only the
//! caller decides whether a write failure is fatal.

use crate::batch::RowOutcome;
use crate::error::{Error, Result};
use std::path::Path;
use tracing::info;

/// Name of the appended column holding model output.
pub const RESULT_COLUMN: &str = "大模型处理结果";

/// Final artifact name derived from the input file's stem.
pub fn final_artifact_name(stem: &str) -> String {
    format!("{stem}_处理后.csv")
}

/// Write `rows` with `outcomes` appended as the result column.
///
/// `rows` and `outcomes` must be the same length; the header row is
/// always written, so an empty slice produces a header-only artifact.
pub fn write_augmented(
    path: &Path,
    headers: &[String],
    rows: &[Vec<String>],
    outcomes: &[RowOutcome],
) -> Result<()> {
    debug_assert_eq!(rows.len(), outcomes.len());

    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| Error::Export(format!("Failed to create {}: {}", path.display(), e)))?;

    let mut header_row: Vec<&str> = headers.iter().map(|h| h.as_str()).collect();
    header_row.push(RESULT_COLUMN);
    writer
        .write_record(&header_row)
        .map_err(|e| Error::Export(format!("Failed to write header row: {}", e)))?;

    for (row, outcome) in rows.iter().zip(outcomes) {
        let mut record: Vec<&str> = row.iter().map(|c| c.as_str()).collect();
        record.push(outcome.render_cell());
        writer
            .write_record(&record)
            .map_err(|e| Error::Export(format!("Failed to write row: {}", e)))?;
    }

    writer
        .flush()
        .map_err(|e| Error::Export(format!("Failed to flush {}: {}", path.display(), e)))?;

    info!("Wrote {} rows to {}", rows.len(), path.display());

    Ok(())
}
