//! Batch processing pipeline
//!
//! Drives rows strictly sequentially through the completion backend, one
//! outstanding request at a time: the completion call is the only await
//! point of the loop. Results are appended index-aligned with the input,
//! progress is reported after every row, and the checkpoint writer is
//! offered the processed slice in-line with the loop.

use crate::checkpoint::CheckpointWriter;
use crate::client::{CompletionBackend, CompletionClient};
use crate::config::RunConfig;
use crate::error::Result;
use crate::table::{export, InputTable};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use tracing::info;
use uuid::Uuid;

pub mod processor;
pub mod progress;

pub use progress::{DisplayMode, ProgressReporter};

/// Result of processing one row. Exactly one is produced per row; failed
/// rows render as a fixed marker in the output column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    Ok(String),
    Failed { message: String },
}

impl RowOutcome {
    /// Marker text written to the result column for failed rows.
    pub const ERROR_MARKER: &'static str = "Error: Unable to process this row.";

    pub fn is_ok(&self) -> bool {
        matches!(self, RowOutcome::Ok(_))
    }

    /// Cell text for the result column.
    pub fn render_cell(&self) -> &str {
        match self {
            RowOutcome::Ok(text) => text,
            RowOutcome::Failed { .. } => Self::ERROR_MARKER,
        }
    }
}

/// One batch run: the parameters decided before the run starts plus the
/// append-only result sequence. Run state itself is never persisted, only
/// the output tables derived from it.
#[derive(Debug)]
pub struct BatchRun {
    pub id: Uuid,
    pub target_column: String,
    pub template: String,
    pub model: String,
    pub row_limit: Option<usize>,
    pub results: Vec<RowOutcome>,
    pub started_at: DateTime<Utc>,
}

impl BatchRun {
    pub fn new(config: &RunConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            target_column: config.target_column.clone(),
            template: config.template.clone(),
            model: config.model.clone(),
            row_limit: config.row_limit,
            results: Vec::new(),
            started_at: Utc::now(),
        }
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }
}

/// The processed row slice plus its result column, ready for export.
#[derive(Debug)]
pub struct BatchOutput {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub outcomes: Vec<RowOutcome>,
}

/// Summary returned to the caller after a completed run.
#[derive(Debug)]
pub struct RunSummary {
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub output_path: PathBuf,
}

/// Sequences row processing over a bounded or unbounded row range.
pub struct BatchDriver<'a> {
    backend: &'a dyn CompletionBackend,
    reporter: &'a dyn ProgressReporter,
}

impl<'a> BatchDriver<'a> {
    pub fn new(backend: &'a dyn CompletionBackend, reporter: &'a dyn ProgressReporter) -> Self {
        Self { backend, reporter }
    }

    /// Process the configured row range in input order.
    ///
    /// Never retries a row and never aborts early except by exhausting the
    /// range; a failing row is recorded and the loop proceeds to the next.
    pub async fn run(
        &self,
        table: &InputTable,
        run: &mut BatchRun,
        checkpoints: &mut CheckpointWriter,
    ) -> Result<BatchOutput> {
        let column = table.column_index(&run.target_column)?;
        let total = run
            .row_limit
            .map_or(table.len(), |limit| limit.min(table.len()));

        info!(
            "Starting batch run {}: {} of {} rows, model {}",
            run.id,
            total,
            table.len(),
            run.model
        );

        self.reporter.start(total);

        for index in 0..total {
            let value = table.cell(index, column);
            let outcome =
                processor::process_row(self.backend, &run.model, &run.template, value, index)
                    .await;
            let success = outcome.is_ok();
            run.results.push(outcome);

            let processed = run.results.len();
            let percent = (processed as f64 / total as f64 * 100.0) as u32;
            self.reporter.row_completed(index, percent, success);

            checkpoints.record(
                table.headers(),
                table.rows(),
                &run.results,
                processed == total,
            );
        }

        self.reporter.finish(run.succeeded(), run.failed());

        Ok(BatchOutput {
            headers: table.headers().to_vec(),
            rows: table.rows()[..total].to_vec(),
            outcomes: run.results.clone(),
        })
    }
}

/// Run the full pipeline for one configuration: load, process, export.
pub async fn run(config: &RunConfig) -> Result<RunSummary> {
    let table = InputTable::load(&config.input)?;
    table.column_index(&config.target_column)?;

    let client = CompletionClient::new(&config.api_key)?;
    let reporter = progress::reporter_for(config.progress);

    let stem = table.source_stem();
    let mut checkpoints =
        CheckpointWriter::new(&stem, &config.output_dir(), config.cadence);

    let mut batch = BatchRun::new(config);
    let driver = BatchDriver::new(&client, reporter.as_ref());
    let output = driver.run(&table, &mut batch, &mut checkpoints).await?;

    let output_path = config.final_artifact_path(&stem);
    export::write_augmented(&output_path, &output.headers, &output.rows, &output.outcomes)?;

    info!(
        "Batch run {} complete: {} rows, {} failed",
        batch.id,
        batch.results.len(),
        batch.failed()
    );

    Ok(RunSummary {
        processed: batch.results.len(),
        succeeded: batch.succeeded(),
        failed: batch.failed(),
        output_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::CheckpointCadence;
    use crate::client::CompletionError;
    use crate::config::DEFAULT_MODEL;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Scripted backend: fails on the listed row indices, counts calls.
    struct ScriptedBackend {
        fail_on: Vec<usize>,
        calls: AtomicUsize,
    }

    impl ScriptedBackend {
        fn new(fail_on: Vec<usize>) -> Self {
            Self {
                fail_on,
                calls: AtomicUsize::new(0),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CompletionBackend for ScriptedBackend {
        async fn complete(
            &self,
            _model: &str,
            prompt: &str,
        ) -> std::result::Result<String, CompletionError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_on.contains(&call) {
                Err(CompletionError::Transport("connection reset".to_string()))
            } else {
                Ok(format!("processed: {}", prompt))
            }
        }
    }

    /// Records every percent value the driver reports.
    struct RecordingReporter {
        percents: Mutex<Vec<u32>>,
    }

    impl RecordingReporter {
        fn new() -> Self {
            Self {
                percents: Mutex::new(Vec::new()),
            }
        }
    }

    impl ProgressReporter for RecordingReporter {
        fn start(&self, _total_rows: usize) {}
        fn row_completed(&self, _index: usize, percent: u32, _success: bool) {
            self.percents.lock().unwrap().push(percent);
        }
        fn finish(&self, _succeeded: usize, _failed: usize) {}
    }

    fn three_row_table() -> InputTable {
        InputTable::from_parts(
            vec!["text".to_string()],
            vec![
                vec!["合同条款一".to_string()],
                vec!["合同条款二".to_string()],
                vec!["合同条款三".to_string()],
            ],
            PathBuf::from("contracts.csv"),
        )
    }

    fn test_run(row_limit: Option<usize>) -> BatchRun {
        BatchRun {
            id: Uuid::new_v4(),
            target_column: "text".to_string(),
            template: "请总结".to_string(),
            model: DEFAULT_MODEL.to_string(),
            row_limit,
            results: Vec::new(),
            started_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_row_limit_bounds_processing() {
        let dir = TempDir::new().unwrap();
        let backend = ScriptedBackend::new(vec![]);
        let reporter = RecordingReporter::new();
        let driver = BatchDriver::new(&backend, &reporter);
        let mut run = test_run(Some(1));
        let mut checkpoints =
            CheckpointWriter::new("contracts", dir.path(), CheckpointCadence::EveryRow);

        let output = driver
            .run(&three_row_table(), &mut run, &mut checkpoints)
            .await
            .unwrap();

        assert_eq!(output.outcomes.len(), 1);
        assert_eq!(output.rows.len(), 1);
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn test_limit_larger_than_table() {
        let dir = TempDir::new().unwrap();
        let backend = ScriptedBackend::new(vec![]);
        let reporter = RecordingReporter::new();
        let driver = BatchDriver::new(&backend, &reporter);
        let mut run = test_run(Some(10));
        let mut checkpoints =
            CheckpointWriter::new("contracts", dir.path(), CheckpointCadence::EveryRow);

        let output = driver
            .run(&three_row_table(), &mut run, &mut checkpoints)
            .await
            .unwrap();

        assert_eq!(output.outcomes.len(), 3);
        assert_eq!(backend.call_count(), 3);
    }

    #[tokio::test]
    async fn test_failure_is_isolated_to_one_row() {
        let dir = TempDir::new().unwrap();
        let backend = ScriptedBackend::new(vec![1]);
        let reporter = RecordingReporter::new();
        let driver = BatchDriver::new(&backend, &reporter);
        let mut run = test_run(None);
        let mut checkpoints =
            CheckpointWriter::new("contracts", dir.path(), CheckpointCadence::EveryRow);

        let output = driver
            .run(&three_row_table(), &mut run, &mut checkpoints)
            .await
            .unwrap();

        assert_eq!(output.outcomes.len(), 3);
        assert!(output.outcomes[0].is_ok());
        assert!(!output.outcomes[1].is_ok());
        assert!(output.outcomes[2].is_ok());
        assert_eq!(backend.call_count(), 3, "driver must proceed past a failure");
    }

    #[tokio::test]
    async fn test_empty_table_makes_no_calls() {
        let dir = TempDir::new().unwrap();
        let backend = ScriptedBackend::new(vec![]);
        let reporter = RecordingReporter::new();
        let driver = BatchDriver::new(&backend, &reporter);
        let mut run = test_run(None);
        let mut checkpoints =
            CheckpointWriter::new("empty", dir.path(), CheckpointCadence::EveryRow);

        let table =
            InputTable::from_parts(vec!["text".to_string()], vec![], PathBuf::from("empty.csv"));
        let output = driver.run(&table, &mut run, &mut checkpoints).await.unwrap();

        assert!(output.outcomes.is_empty());
        assert_eq!(backend.call_count(), 0);
        assert!(checkpoints.latest().is_none());
    }

    #[tokio::test]
    async fn test_progress_percentages_are_floored() {
        let dir = TempDir::new().unwrap();
        let backend = ScriptedBackend::new(vec![]);
        let reporter = RecordingReporter::new();
        let driver = BatchDriver::new(&backend, &reporter);
        let mut run = test_run(None);
        let mut checkpoints =
            CheckpointWriter::new("contracts", dir.path(), CheckpointCadence::OnCompletion);

        driver
            .run(&three_row_table(), &mut run, &mut checkpoints)
            .await
            .unwrap();

        let percents = reporter.percents.lock().unwrap().clone();
        assert_eq!(percents, vec![33, 66, 100]);
    }

    #[tokio::test]
    async fn test_final_row_always_checkpoints() {
        let dir = TempDir::new().unwrap();
        let backend = ScriptedBackend::new(vec![]);
        let reporter = RecordingReporter::new();
        let driver = BatchDriver::new(&backend, &reporter);
        let mut run = test_run(Some(2));
        let mut checkpoints =
            CheckpointWriter::new("contracts", dir.path(), CheckpointCadence::OnCompletion);

        driver
            .run(&three_row_table(), &mut run, &mut checkpoints)
            .await
            .unwrap();

        let expected = dir.path().join("contracts_处理到第2行.csv");
        assert_eq!(checkpoints.latest(), Some(expected.as_path()));
        assert!(expected.exists());
    }

    #[tokio::test]
    async fn test_missing_target_column_fails_before_any_call() {
        let dir = TempDir::new().unwrap();
        let backend = ScriptedBackend::new(vec![]);
        let reporter = RecordingReporter::new();
        let driver = BatchDriver::new(&backend, &reporter);
        let mut run = test_run(None);
        run.target_column = "missing".to_string();
        let mut checkpoints =
            CheckpointWriter::new("contracts", dir.path(), CheckpointCadence::EveryRow);

        let err = driver
            .run(&three_row_table(), &mut run, &mut checkpoints)
            .await
            .unwrap_err();

        assert!(matches!(err, crate::error::Error::Input(_)));
        assert_eq!(backend.call_count(), 0);
    }
}
