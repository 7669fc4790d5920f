//! Survey Analysis Workbench CLI.

use clap::{ColorChoice, Parser};
use saw_cli::logging::{LogConfig, LogFormat, init_logging};
use saw_cli::settings::load_settings;
use saw_cli::summary::{groups_table, health_table, role_suggestions_table, workflow_table};
use std::io::{self, IsTerminal};
use tracing::level_filters::LevelFilter;

mod cli;
mod commands;

use crate::cli::{Cli, Command, LogFormatArg, LogLevelArg};
use crate::commands::{
    health_status_line, run_groups, run_health, run_resume, run_roles, run_workflow,
};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }
    let settings = load_settings(cli.config.as_deref());

    let exit_code = match cli.command {
        Command::Health(args) => match run_health(&args) {
            Ok(report) => {
                println!("{}", health_status_line(&report.status()));
                println!("{}", health_table(&report));
                0
            }
            Err(error) => {
                eprintln!("error: {error:#}");
                1
            }
        },
        Command::Groups(args) => match run_groups(&args, &settings) {
            Ok(groups) if groups.is_empty() => {
                println!("No variable groups suggested.");
                0
            }
            Ok(groups) => {
                println!("{}", groups_table(&groups));
                0
            }
            Err(error) => {
                eprintln!("error: {error:#}");
                1
            }
        },
        Command::Roles(args) => match run_roles(&args, &settings) {
            Ok(suggestions) => {
                println!("{}", role_suggestions_table(&suggestions));
                0
            }
            Err(error) => {
                eprintln!("error: {error:#}");
                1
            }
        },
        Command::Run(args) => match run_workflow(&args, &settings).await {
            Ok(true) => 0,
            Ok(false) => 1,
            Err(error) => {
                eprintln!("error: {error:#}");
                1
            }
        },
        Command::Resume(args) => match run_resume(&args).await {
            Ok(state) => {
                println!(
                    "Project {} is at {} ({}% complete)",
                    args.project,
                    state.current_step.label(),
                    state.progress_percent
                );
                println!("{}", workflow_table(&state));
                0
            }
            Err(error) => {
                eprintln!("error: {error:#}");
                1
            }
        },
    };
    std::process::exit(exit_code);
}

/// Build logging configuration from CLI flags with consistent precedence.
fn log_config_from_cli(cli: &Cli) -> LogConfig {
    let mut config = LogConfig {
        level_filter: cli.verbosity.tracing_level_filter(),
        ..LogConfig::default()
    };
    config.use_env_filter = !(cli.verbosity.is_present() || cli.log_level.is_some());
    if let Some(level) = cli.log_level {
        config.level_filter = match level {
            LogLevelArg::Error => LevelFilter::ERROR,
            LogLevelArg::Warn => LevelFilter::WARN,
            LogLevelArg::Info => LevelFilter::INFO,
            LogLevelArg::Debug => LevelFilter::DEBUG,
            LogLevelArg::Trace => LevelFilter::TRACE,
        };
    }
    config.format = match cli.log_format {
        LogFormatArg::Pretty => LogFormat::Pretty,
        LogFormatArg::Compact => LogFormat::Compact,
        LogFormatArg::Json => LogFormat::Json,
    };
    config.log_file = cli.log_file.clone();
    config.with_ansi = match cli.color.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => cli.log_file.is_none() && io::stderr().is_terminal(),
    };
    config
}
