//! CLI command definitions using clap

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// todo-probador: API suites and load tests against a ToDo REST service
///
/// Connection settings come from the environment (or a `.env` file):
/// BASE_URL, API_EMAIL, API_PASSWORD, TOKEN_PATH, TEST_TIMEOUT_MS,
/// STEP_TIMEOUT_MS, ACCEPT_INVALID_CERTS.
#[derive(Parser, Debug)]
#[command(name = "todo-probador")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (only warnings and errors are logged)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, value_enum, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "LOG_JSON")]
    pub log_json: bool,

    /// Write the run's report as JSON to this path
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in once and persist the token for later runs
    Login,

    /// Run the CRUD flow
    Crud,

    /// Run the negative-path checks concurrently
    Negative,

    /// Run the behavioral properties sequentially
    Properties,

    /// Log in, run CRUD and negative checks concurrently, then properties
    Run,

    /// Run a load profile
    Load(LoadArgs),

    /// Append a saved load result to a performance table
    Report(ReportArgs),
}

/// Built-in load profiles
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadKind {
    /// Ramp to 100 readers, hold, ramp down
    Read,
    /// 15 readers and 5 writers for a minute
    Mixed,
}

/// Arguments for the load command
#[derive(Args, Debug)]
pub struct LoadArgs {
    /// Built-in profile to run
    #[arg(value_enum, default_value = "read")]
    pub kind: LoadKind,

    /// YAML profile to run instead of the built-in one
    #[arg(long)]
    pub profile: Option<PathBuf>,

    /// Multiply every stage duration (0.1 runs a tenth as long)
    #[arg(long, default_value_t = 1.0)]
    pub duration_scale: f64,

    /// Append the result to this Markdown performance table
    #[arg(long)]
    pub performance_md: Option<PathBuf>,
}

/// Arguments for the report command
#[derive(Args, Debug)]
pub struct ReportArgs {
    /// Load result JSON written by `load --output`
    #[arg(long)]
    pub input: PathBuf,

    /// Markdown performance table to update
    #[arg(long, default_value = "performance.md")]
    pub performance_md: PathBuf,
}

/// Color argument for CLI
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorArg {
    /// Detect from terminal
    #[default]
    Auto,
    /// Always color
    Always,
    /// Never color
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_verify() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_with_globals() {
        let cli = Cli::try_parse_from(["todo-probador", "-vv", "--output", "r.json", "run"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.output, Some(PathBuf::from("r.json")));
        assert!(matches!(cli.command, Commands::Run));
    }

    #[test]
    fn test_parse_load_defaults() {
        let cli = Cli::try_parse_from(["todo-probador", "load"]).unwrap();
        match cli.command {
            Commands::Load(args) => {
                assert_eq!(args.kind, LoadKind::Read);
                assert_eq!(args.duration_scale, 1.0);
                assert!(args.profile.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_load_mixed_scaled() {
        let cli = Cli::try_parse_from([
            "todo-probador",
            "load",
            "mixed",
            "--duration-scale",
            "0.1",
        ])
        .unwrap();
        match cli.command {
            Commands::Load(args) => {
                assert_eq!(args.kind, LoadKind::Mixed);
                assert!((args.duration_scale - 0.1).abs() < f64::EPSILON);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_report_requires_input() {
        assert!(Cli::try_parse_from(["todo-probador", "report"]).is_err());
    }

    #[test]
    fn test_color_conversion() {
        use crate::config::ColorChoice;
        assert_eq!(ColorChoice::from(ColorArg::Never), ColorChoice::Never);
        assert_eq!(ColorChoice::from(ColorArg::Always), ColorChoice::Always);
    }
}
