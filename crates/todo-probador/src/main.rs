//! todo-probador: API suites and load tests for the ToDo service
//!
//! ## Usage
//!
//! ```bash
//! todo-probador login                          # Save a token to .auth/token.json
//! todo-probador crud                           # CRUD flow with the saved token
//! todo-probador run --output report.json       # login + all suites
//! todo-probador load mixed --duration-scale 0.1
//! todo-probador report --input load.json       # Append to performance.md
//! ```

use clap::Parser;
use std::future::Future;
use std::process::ExitCode;
use todo_probador::handlers::{self, SuiteKind};
use todo_probador::{Cli, CliConfig, CliError, CliResult, Commands, Verbosity};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();
    let config = build_config(&cli);
    config.init_tracing();
    console::set_colors_enabled(config.color.should_color());

    match cli.command {
        Commands::Login => block_on(handlers::execute_login(&config)),
        Commands::Crud => block_on(handlers::execute_suite(&config, SuiteKind::Crud)),
        Commands::Negative => block_on(handlers::execute_suite(&config, SuiteKind::Negative)),
        Commands::Properties => {
            block_on(handlers::execute_suite(&config, SuiteKind::Properties))
        }
        Commands::Run => block_on(handlers::execute_run(&config)),
        Commands::Load(ref args) => block_on(handlers::execute_load(&config, args)),
        Commands::Report(ref args) => handlers::execute_report(&config, args),
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    CliConfig::new()
        .with_verbosity(Verbosity::from_flags(cli.quiet, cli.verbose))
        .with_color(cli.color.into())
        .with_log_json(cli.log_json)
        .with_output(cli.output.clone())
}

fn block_on<F>(future: F) -> CliResult<()>
where
    F: Future<Output = CliResult<()>>,
{
    let rt = tokio::runtime::Runtime::new().map_err(|e| CliError::Runtime(e.to_string()))?;
    rt.block_on(future)
}
