//! # Promptsheet
//!
//! Batch-process rows of a tabular dataset through LLM chat completions.
//!
//! ## Usage
//!
//! ```bash
//! promptsheet process --input contracts.csv --column text --template "请总结" [--limit 3]
//! ```
//!
//! ## Modules
//!
//! - `batch` - Sequential batch driver, row processor, and progress reporting
//! - `checkpoint` - Superseding per-run checkpoint artifacts
//! - `client` - Completion client adapter for the OpenRouter chat API
//! - `config` - Immutable run configuration and the model allow-list
//! - `prompt` - Template composer joining instruction and row text
//! - `table` - Tabular input loading (CSV/XLSX) and augmented export
pub mod batch;
pub mod checkpoint;
pub mod client;
pub mod config;
pub mod error;
pub mod prompt;
pub mod table;

pub use error::{Error, Result};
