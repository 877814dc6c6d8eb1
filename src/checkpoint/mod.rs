//! Checkpoint persistence for batch runs
//!
//! After each processed row (or a configured stride) the rows processed so
//! far, plus the result column, are written to a progress-labeled CSV
//! artifact. Each artifact supersedes the previous one for the same run;
//! removal of the superseded file is advisory cleanup, never required for
//! correctness. Checkpoint write failures do not stop the run.

use crate::batch::RowOutcome;
use crate::error::Result;
use crate::table::export;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// How often a checkpoint artifact is written.
///
/// The final row of a bounded run always checkpoints regardless of cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointCadence {
    /// After every processed row.
    EveryRow,
    /// After every `n` processed rows.
    EveryN(usize),
    /// Only once, when the run completes.
    OnCompletion,
}

impl Default for CheckpointCadence {
    fn default() -> Self {
        CheckpointCadence::EveryRow
    }
}

/// Writes superseding checkpoint artifacts for one run.
pub struct CheckpointWriter {
    stem: String,
    dir: PathBuf,
    cadence: CheckpointCadence,
    latest: Option<PathBuf>,
}

impl CheckpointWriter {
    pub fn new(stem: &str, dir: &Path, cadence: CheckpointCadence) -> Self {
        Self {
            stem: stem.to_string(),
            dir: dir.to_path_buf(),
            cadence,
            latest: None,
        }
    }

    /// Artifact path for a given processed-row count.
    pub fn checkpoint_path(&self, processed: usize) -> PathBuf {
        self.dir
            .join(format!("{}_处理到第{}行.csv", self.stem, processed))
    }

    /// The most recent artifact written by this run, if any.
    pub fn latest(&self) -> Option<&Path> {
        self.latest.as_deref()
    }

    fn due(&self, processed: usize, is_final: bool) -> bool {
        if is_final {
            return true;
        }
        match self.cadence {
            CheckpointCadence::EveryRow => true,
            CheckpointCadence::EveryN(n) => n > 0 && processed % n == 0,
            CheckpointCadence::OnCompletion => false,
        }
    }

    /// Write a checkpoint if the cadence says one is due.
    ///
    /// Failures are advisory: logged and swallowed, the batch continues.
    pub fn record(
        &mut self,
        headers: &[String],
        rows: &[Vec<String>],
        outcomes: &[RowOutcome],
        is_final: bool,
    ) {
        let processed = outcomes.len();
        if processed == 0 || !self.due(processed, is_final) {
            return;
        }

        if let Err(e) = self.write(headers, rows, outcomes) {
            warn!("Checkpoint write failed after row {}: {}", processed, e);
        }
    }

    fn write(
        &mut self,
        headers: &[String],
        rows: &[Vec<String>],
        outcomes: &[RowOutcome],
    ) -> Result<()> {
        let processed = outcomes.len();
        let path = self.checkpoint_path(processed);

        export::write_augmented(&path, headers, &rows[..processed], outcomes)?;
        debug!("Saved checkpoint covering {} rows: {}", processed, path.display());

        // Supersede the previous artifact; a failed removal is ignored.
        if let Some(previous) = self.latest.replace(path) {
            if Some(previous.as_path()) != self.latest.as_deref() {
                if let Err(e) = fs::remove_file(&previous) {
                    debug!(
                        "Could not remove superseded checkpoint {}: {}",
                        previous.display(),
                        e
                    );
                }
            }
        }

        Ok(())
    }
}
