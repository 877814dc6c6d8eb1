//! Run configuration
//!
//! An immutable [`RunConfig`] is assembled once from CLI arguments and the
//! environment, then passed into the batch driver; there is no ambient
//! state. The credential is carried for the duration of the run only and
//! is redacted from debug output.

use crate::batch::DisplayMode;
use crate::checkpoint::CheckpointCadence;
use crate::error::{Error, Result};
use crate::table::export;
use std::fmt;
use std::path::{Path, PathBuf};

/// Selectable backend models, ordered roughly by cost.
///
/// Selection is a pass-through parameter; membership is the only check.
pub const AVAILABLE_MODELS: &[&str] = &[
    "mistralai/mistral-7b-instruct:free",
    "anthropic/claude-3-haiku:beta",
    "anthropic/claude-3-sonnet:beta",
    "openai/gpt-4-turbo",
    "anthropic/claude-3-opus:beta",
];

/// The free tier entry; the sensible default for dry runs.
pub const DEFAULT_MODEL: &str = "mistralai/mistral-7b-instruct:free";

/// Environment fallback for the API credential.
pub const API_KEY_ENV: &str = "PROMPTSHEET_API_KEY";

/// Instruction presets carried over from the original tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Preset {
    /// Translate the row text into English.
    Translate,
    /// Extract key legal terms from the row text.
    Keywords,
    /// Summarize the row text and distill the main points.
    Summarize,
}

impl Preset {
    pub fn template(&self) -> &'static str {
        match self {
            Preset::Translate => "作为专业的语言翻译家，请将以下新闻内容翻译成英文。",
            Preset::Keywords => "作为经验丰富的法律顾问，请从以下文本中提取关键的法律术语。",
            Preset::Summarize => "作为资深的新闻编辑，请对以下新闻内容进行总结，并提炼出主要观点。",
        }
    }
}

/// Everything a batch run needs, decided before the run starts.
#[derive(Clone)]
pub struct RunConfig {
    pub input: PathBuf,
    pub target_column: String,
    pub template: String,
    pub model: String,
    pub api_key: String,
    pub row_limit: Option<usize>,
    pub cadence: CheckpointCadence,
    pub output: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub progress: DisplayMode,
}

impl fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunConfig")
            .field("input", &self.input)
            .field("target_column", &self.target_column)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .field("row_limit", &self.row_limit)
            .field("cadence", &self.cadence)
            .field("output", &self.output)
            .field("output_dir", &self.output_dir)
            .finish()
    }
}

impl RunConfig {
    /// Directory checkpoint and export artifacts are written to.
    ///
    /// Defaults to the input file's directory.
    pub fn output_dir(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(|| {
            self.input
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."))
        })
    }

    /// Path of the final export artifact.
    pub fn final_artifact_path(&self, stem: &str) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| self.output_dir().join(export::final_artifact_name(stem)))
    }
}

/// Check a model identifier against the allow-list.
pub fn validate_model(model: &str) -> Result<()> {
    if AVAILABLE_MODELS.contains(&model) {
        return Ok(());
    }
    Err(Error::Config(format!(
        "Unknown model '{}'. Available models: {}",
        model,
        AVAILABLE_MODELS.join(", ")
    )))
}

/// Resolve the API credential: CLI argument first, then the environment.
pub fn resolve_api_key(cli_key: Option<String>) -> Result<String> {
    if let Some(key) = cli_key {
        return Ok(key);
    }
    std::env::var(API_KEY_ENV).map_err(|_| {
        Error::Config(format!(
            "API key required: pass --api-key or set {}",
            API_KEY_ENV
        ))
    })
}

/// Resolve the instruction template from the mutually-layered sources:
/// inline text wins over a template file, which wins over a preset.
pub fn resolve_template(
    inline: Option<String>,
    file: Option<&Path>,
    preset: Option<Preset>,
) -> Result<String> {
    if let Some(text) = inline {
        return Ok(text);
    }
    if let Some(path) = file {
        return std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read template file {}: {}",
                path.display(),
                e
            ))
        });
    }
    if let Some(preset) = preset {
        return Ok(preset.template().to_string());
    }
    Err(Error::Config(
        "No template provided: use --template, --template-file, or --preset".to_string(),
    ))
}

/// Translate the CLI checkpoint flags into a cadence.
pub fn resolve_cadence(every: Option<usize>, at_end: bool) -> Result<CheckpointCadence> {
    if at_end {
        return Ok(CheckpointCadence::OnCompletion);
    }
    match every {
        None | Some(1) => Ok(CheckpointCadence::EveryRow),
        Some(0) => Err(Error::Config(
            "--checkpoint-every must be at least 1".to_string(),
        )),
        Some(n) => Ok(CheckpointCadence::EveryN(n)),
    }
}
