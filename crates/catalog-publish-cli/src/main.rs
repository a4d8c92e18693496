// crates/catalog-publish-cli/src/main.rs
// ============================================================================
// Module: Catalog Publish CLI Entry Point
// Description: Command dispatcher for publish runs and config checks.
// Purpose: Run one publish pass per invocation from a scheduler or shell.
// Dependencies: clap, catalog-publish-cli, catalog-publish-config, serde_json
// ============================================================================

//! ## Overview
//! `catalog-publish run` executes one pass and prints the JSON run summary on
//! stdout; audit events go to the configured sink. The exit code is non-zero
//! when any catalog or record failed so schedulers can alert on it.
//! `catalog-publish check-config` validates a config without touching the
//! store or the network.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use catalog_publish_cli::CliError;
use catalog_publish_cli::CliResult;
use catalog_publish_cli::check_config;
use catalog_publish_cli::run_publish;
use catalog_publish_config::CatalogPublishConfig;
use catalog_publish_core::CatalogId;
use clap::Args;
use clap::Parser;
use clap::Subcommand;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Exit code for a run that completed with failures.
const EXIT_RUN_FAILURES: u8 = 2;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "catalog-publish", version, disable_help_subcommand = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one publish pass.
    Run(RunCommand),
    /// Validate a configuration file.
    CheckConfig(ConfigArgs),
}

/// Shared config location argument.
#[derive(Args, Debug)]
struct ConfigArgs {
    /// Config path (defaults to `CATALOG_PUBLISH_CONFIG` or `catalog-publish.toml`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Arguments for `run`.
#[derive(Args, Debug)]
struct RunCommand {
    /// Config location.
    #[command(flatten)]
    config: ConfigArgs,
    /// Only process this catalog.
    #[arg(long, value_name = "ID")]
    catalog: Option<String>,
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Parses arguments and dispatches the selected command.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run(command) => command_run(&command),
        Commands::CheckConfig(args) => command_check_config(&args),
    }
}

/// Executes `run`.
fn command_run(command: &RunCommand) -> CliResult<ExitCode> {
    let config = load_config(&command.config)?;
    let catalog = command.catalog.as_deref().map(CatalogId::new);
    let summary = run_publish(&config, catalog.as_ref())?;
    let output = serde_json::to_string_pretty(&summary)
        .map_err(|err| CliError::new(format!("summary encode failed: {err}")))?;
    write_stdout_line(&output).map_err(|err| CliError::new(format!("stdout: {err}")))?;
    if summary.is_clean() { Ok(ExitCode::SUCCESS) } else { Ok(ExitCode::from(EXIT_RUN_FAILURES)) }
}

/// Executes `check-config`.
fn command_check_config(args: &ConfigArgs) -> CliResult<ExitCode> {
    let config = load_config(args)?;
    check_config(&config)?;
    write_stdout_line(&format!(
        "config ok: {} catalog(s), {} schema(s)",
        config.catalogs.len(),
        config.schemas.len()
    ))
    .map_err(|err| CliError::new(format!("stdout: {err}")))?;
    Ok(ExitCode::SUCCESS)
}

/// Loads and validates configuration.
fn load_config(args: &ConfigArgs) -> CliResult<CatalogPublishConfig> {
    CatalogPublishConfig::load(args.config.as_deref()).map_err(|err| CliError::new(err.to_string()))
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
