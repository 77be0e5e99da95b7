#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

mod commands;
mod logging;

use clap::{CommandFactory, Parser};
use minnow_core::Config;
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "minnow")]
#[command(author, version, about = "A minimal npm package installer", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON formatted output (stable, machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Override the working directory
    #[arg(long, global = true, value_name = "PATH")]
    cwd: Option<PathBuf>,

    /// Registry URL (overrides MINNOW_NPM_REGISTRY and .npmrc)
    #[arg(long, global = true, value_name = "URL")]
    registry: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Add a dependency to package.json (does not install)
    Add {
        /// Package spec: name, name@range, @scope/name@range
        spec: String,
    },

    /// Install every dependency in package.json, recursively
    Install,

    /// Print version and registry information
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let cwd = cli
        .cwd
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    let config = Config::new(cwd)
        .with_verbosity(cli.verbose)
        .with_json_logs(cli.json)
        .with_registry(cli.registry);

    let Some(command) = cli.command else {
        Cli::command().print_help().into_diagnostic()?;
        println!();
        return Ok(());
    };

    logging::init(config.verbosity, config.json_logs);

    match command {
        Commands::Add { spec } => {
            let span = tracing::info_span!("add", cmd = "add", cwd = %config.cwd.display());
            let _guard = span.enter();
            commands::add::run(&config, &spec, cli.json)
        }
        Commands::Install => {
            let span = tracing::info_span!("install", cmd = "install", cwd = %config.cwd.display());
            let _guard = span.enter();
            commands::install::run(&config, cli.json)
        }
        Commands::Version => commands::version::run(&config, cli.json),
    }
}
