use clap::{Parser, Subcommand};
use promptsheet::batch::DisplayMode;
use promptsheet::config::{self, Preset, RunConfig, AVAILABLE_MODELS, DEFAULT_MODEL};
use std::path::PathBuf;
use tracing::{debug, error};

/// Batch-process spreadsheet rows through LLM completions
#[derive(Parser)]
#[command(name = "promptsheet")]
#[command(about = "Batch-process spreadsheet rows through LLM completions", long_about = None)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process a tabular file row by row through a completion model
    Process {
        /// Input table (.csv or .xlsx)
        #[arg(short, long)]
        input: PathBuf,

        /// Column whose text feeds the prompt
        #[arg(short, long)]
        column: String,

        /// Instruction template combined with each row's text
        #[arg(short, long)]
        template: Option<String>,

        /// Read the instruction template from a file
        #[arg(long, conflicts_with = "template")]
        template_file: Option<PathBuf>,

        /// Use a built-in instruction preset
        #[arg(long, value_enum)]
        preset: Option<Preset>,

        /// Model identifier (see `promptsheet models`)
        #[arg(short, long, default_value = DEFAULT_MODEL)]
        model: String,

        /// API key (falls back to PROMPTSHEET_API_KEY)
        #[arg(long)]
        api_key: Option<String>,

        /// Process only the first N rows (dry run before a full, metered run)
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Write a checkpoint every N rows (default: every row)
        #[arg(long)]
        checkpoint_every: Option<usize>,

        /// Only checkpoint once, when the run completes
        #[arg(long, conflicts_with = "checkpoint_every")]
        checkpoint_at_end: bool,

        /// Path of the final export artifact
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Directory for checkpoint and export artifacts
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Progress display mode
        #[arg(long, value_enum, default_value = "rich")]
        progress: DisplayMode,
    },
    /// List the selectable models, ordered roughly by cost
    Models,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_target(cli.verbose >= 2)
        .init();

    debug!("promptsheet started with verbosity level: {}", cli.verbose);

    let result = match cli.command {
        Commands::Process {
            input,
            column,
            template,
            template_file,
            preset,
            model,
            api_key,
            limit,
            checkpoint_every,
            checkpoint_at_end,
            output,
            output_dir,
            progress,
        } => {
            run_process(
                input,
                column,
                template,
                template_file,
                preset,
                model,
                api_key,
                limit,
                checkpoint_every,
                checkpoint_at_end,
                output,
                output_dir,
                progress,
            )
            .await
        }
        Commands::Models => {
            run_models();
            Ok(())
        }
    };

    if let Err(e) = result {
        error!("Fatal error: {}", e);
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_process(
    input: PathBuf,
    column: String,
    template: Option<String>,
    template_file: Option<PathBuf>,
    preset: Option<Preset>,
    model: String,
    api_key: Option<String>,
    limit: Option<usize>,
    checkpoint_every: Option<usize>,
    checkpoint_at_end: bool,
    output: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    progress: DisplayMode,
) -> promptsheet::Result<()> {
    config::validate_model(&model)?;

    let config = RunConfig {
        input,
        target_column: column,
        template: config::resolve_template(template, template_file.as_deref(), preset)?,
        model,
        api_key: config::resolve_api_key(api_key)?,
        row_limit: limit,
        cadence: config::resolve_cadence(checkpoint_every, checkpoint_at_end)?,
        output,
        output_dir,
        progress,
    };

    let summary = promptsheet::batch::run(&config).await?;

    println!(
        "✅ Processed {} rows: {} succeeded, {} failed",
        summary.processed, summary.succeeded, summary.failed
    );
    println!("Output written to {}", summary.output_path.display());

    Ok(())
}

fn run_models() {
    println!("Available models (roughly by cost):");
    for model in AVAILABLE_MODELS {
        if *model == DEFAULT_MODEL {
            println!("  {} (default)", model);
        } else {
            println!("  {}", model);
        }
    }
    println!("\nTry the free model on a --limit run before committing to a paid one.");
}
