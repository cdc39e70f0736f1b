//! todo-probador CLI library
//!
//! Command-line interface for the todo-probar harness: login, the API
//! suites, load profiles and performance reports.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)] // Error types are self-documenting

mod commands;
mod config;
mod error;
pub mod handlers;

pub use commands::{Cli, ColorArg, Commands, LoadArgs, LoadKind, ReportArgs};
pub use config::{CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
