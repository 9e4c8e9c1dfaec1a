//! reqcheck - validator and updater for pip requirements manifests
//!
//! Subcommands:
//! - check: parse and lint requirements files
//! - list: print every declaration
//! - update: rewrite constraints to the newest eligible releases

use clap::Parser;
use reqcheck::cli::{Cli, Command, UpdateArgs};
use reqcheck::commands;
use reqcheck::config::Config;
use reqcheck::logging;
use reqcheck::orchestrator::Orchestrator;
use reqcheck::output::{create_formatter, write_check, write_list, OutputConfig};
use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;
use tracing::debug;

/// Exit status for partial failures, and for fatal errors in `check` / `list`
const EXIT_PARTIAL: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.global.verbose, cli.global.quiet);

    if !cli.use_color() {
        colored::control::set_override(false);
    }

    let fatal = fatal_exit_code(&cli.command);
    match run(cli).await {
        Ok(exit_code) => exit_code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            fatal
        }
    }
}

/// `check` and `list` reserve 1 for findings, so their fatal errors exit 2
fn fatal_exit_code(command: &Command) -> ExitCode {
    match command {
        Command::Check(_) | Command::List(_) => ExitCode::from(EXIT_PARTIAL),
        Command::Update(_) => ExitCode::FAILURE,
    }
}

/// Main application logic
async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    cli.validate()?;

    let config = Config::load(cli.global.config.as_deref(), cli.target())?;
    debug!(target = %cli.target().display(), "configuration loaded");

    match &cli.command {
        Command::Check(args) => run_check(&cli, &args.path, &config),
        Command::List(args) => run_list(&cli, &args.path, &config),
        Command::Update(args) => run_update(&cli, args.clone(), config).await,
    }
}

fn output_config(cli: &Cli, diff: bool, dry_run: bool) -> OutputConfig {
    let global = &cli.global;
    OutputConfig::from_cli(global.json, diff, global.verbose, global.quiet, dry_run)
        .with_color(cli.use_color())
}

/// Exit 0 when clean, 1 when any error-severity finding exists
fn run_check(cli: &Cli, target: &Path, config: &Config) -> anyhow::Result<ExitCode> {
    let report = commands::check(target, config)?;

    let mut stdout = io::stdout().lock();
    write_check(&report, &output_config(cli, false, false), &mut stdout)?;
    stdout.flush()?;

    if report.has_errors() {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn run_list(cli: &Cli, target: &Path, config: &Config) -> anyhow::Result<ExitCode> {
    let declarations = commands::list(target, config)?;

    let mut stdout = io::stdout().lock();
    write_list(&declarations, &output_config(cli, false, false), &mut stdout)?;
    stdout.flush()?;
    Ok(ExitCode::SUCCESS)
}

/// Exit 0 on success, 2 when some packages or files failed, 1 when nothing could run
async fn run_update(cli: &Cli, args: UpdateArgs, config: Config) -> anyhow::Result<ExitCode> {
    let output = output_config(cli, args.diff, args.dry_run);
    let show_progress = !cli.global.quiet && !cli.global.json;

    if cli.global.verbose {
        eprintln!("reqcheck v{}", env!("CARGO_PKG_VERSION"));
        eprintln!("Target: {}", args.path.display());
        eprintln!("Index: {}", config.index_url());
        if args.dry_run {
            eprintln!("Mode: dry-run");
        }
    }

    let orchestrator = Orchestrator::new(args, config)?;
    let result = orchestrator.run_with_progress(show_progress).await?;

    let formatter = create_formatter(output);
    let mut stdout = io::stdout().lock();
    formatter.format(&result, &mut stdout)?;
    stdout.flush()?;

    if result.has_errors() {
        Ok(ExitCode::from(EXIT_PARTIAL))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
