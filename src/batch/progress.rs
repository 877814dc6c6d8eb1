//! Progress reporting for batch runs
//!
//! Three renderers behind one trait: a rich indicatif bar for terminals,
//! a JSON-lines event stream for structured consumers, and a no-op
//! reporter for tests. Reporting is synchronous and in-line with the
//! processing loop.

use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum DisplayMode {
    Rich,
    Json,
    None,
}

pub trait ProgressReporter: Send + Sync {
    fn start(&self, total_rows: usize);
    /// Called after each row with the floored percentage of the range.
    fn row_completed(&self, index: usize, percent: u32, success: bool);
    fn finish(&self, succeeded: usize, failed: usize);
}

pub fn reporter_for(mode: DisplayMode) -> Box<dyn ProgressReporter> {
    match mode {
        DisplayMode::Rich => Box::new(RichProgress::new()),
        DisplayMode::Json => Box::new(JsonProgress),
        DisplayMode::None => Box::new(NullProgress),
    }
}

/// Terminal progress bar tracking the percentage of processed rows.
pub struct RichProgress {
    bar: ProgressBar,
}

impl RichProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}% {msg}")
                .unwrap()
                .progress_chars("#>-"),
        );
        Self { bar }
    }
}

impl Default for RichProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for RichProgress {
    fn start(&self, total_rows: usize) {
        self.bar.set_message(format!("0/{} rows", total_rows));
    }

    fn row_completed(&self, index: usize, percent: u32, success: bool) {
        self.bar.set_position(percent as u64);
        let status = if success { "ok" } else { "failed" };
        self.bar.set_message(format!("row {} {}", index + 1, status));
    }

    fn finish(&self, succeeded: usize, failed: usize) {
        self.bar.set_position(100);
        self.bar
            .finish_with_message(format!("{} succeeded, {} failed", succeeded, failed));
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    RunStarted {
        total_rows: usize,
        timestamp: String,
    },
    RowCompleted {
        index: usize,
        percent: u32,
        success: bool,
    },
    RunCompleted {
        succeeded: usize,
        failed: usize,
        timestamp: String,
    },
}

/// Emits one JSON object per line on stdout.
pub struct JsonProgress;

impl JsonProgress {
    fn emit(&self, event: &ProgressEvent) {
        if let Ok(json) = serde_json::to_string(event) {
            println!("{}", json);
        }
    }
}

impl ProgressReporter for JsonProgress {
    fn start(&self, total_rows: usize) {
        self.emit(&ProgressEvent::RunStarted {
            total_rows,
            timestamp: Utc::now().to_rfc3339(),
        });
    }

    fn row_completed(&self, index: usize, percent: u32, success: bool) {
        self.emit(&ProgressEvent::RowCompleted {
            index,
            percent,
            success,
        });
    }

    fn finish(&self, succeeded: usize, failed: usize) {
        self.emit(&ProgressEvent::RunCompleted {
            succeeded,
            failed,
            timestamp: Utc::now().to_rfc3339(),
        });
    }
}

pub struct NullProgress;

impl ProgressReporter for NullProgress {
    fn start(&self, _total_rows: usize) {}
    fn row_completed(&self, _index: usize, _percent: u32, _success: bool) {}
    fn finish(&self, _succeeded: usize, _failed: usize) {}
}
