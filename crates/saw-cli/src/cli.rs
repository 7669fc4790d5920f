//! CLI argument definitions for the survey analysis workbench.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;
use saw_model::AnalysisKind;

#[derive(Parser)]
#[command(
    name = "saw",
    version,
    about = "Survey Analysis Workbench - guided analysis of survey datasets",
    long_about = "Walk a survey dataset through the guided analysis workflow.\n\n\
                  Checks missing data, suggests variable groups and research roles,\n\
                  and runs the selected analysis on the remote statistics engine."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags and RUST_LOG).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for humans, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Settings file (default: the platform config folder).
    #[arg(long = "config", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Report missing data per column, worst first.
    Health(DatasetArgs),

    /// Suggest groups of related variables (multi-item scales).
    Groups(GroupsArgs),

    /// Suggest demographic classifications and research roles.
    Roles(DatasetArgs),

    /// Run the complete workflow and submit the analysis.
    Run(RunArgs),

    /// Show where a saved project is in the workflow.
    Resume(ResumeArgs),
}

#[derive(Args)]
pub struct DatasetArgs {
    /// CSV file with a header row.
    #[arg(value_name = "CSV")]
    pub csv: PathBuf,
}

#[derive(Args)]
pub struct GroupsArgs {
    #[command(flatten)]
    pub dataset: DatasetArgs,

    /// Hide suggestions below this confidence (overrides settings).
    #[arg(long = "min-confidence", value_name = "SCORE")]
    pub min_confidence: Option<f32>,
}

#[derive(Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub dataset: DatasetArgs,

    /// Project identifier used for saved progress.
    #[arg(long = "project", value_name = "ID")]
    pub project: String,

    /// Analysis to run (default: chosen from the assigned roles).
    #[arg(long = "analysis", value_name = "KIND")]
    pub analysis: Option<AnalysisKind>,

    /// Directory for saved progress (default: the platform data folder).
    #[arg(long = "state-dir", value_name = "DIR")]
    pub state_dir: Option<PathBuf>,

    /// Analytics engine base URL (overrides settings).
    #[arg(long = "engine-url", value_name = "URL")]
    pub engine_url: Option<String>,
}

#[derive(Args)]
pub struct ResumeArgs {
    /// Project identifier used for saved progress.
    #[arg(long = "project", value_name = "ID")]
    pub project: String,

    /// Directory for saved progress (default: the platform data folder).
    #[arg(long = "state-dir", value_name = "DIR")]
    pub state_dir: Option<PathBuf>,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
