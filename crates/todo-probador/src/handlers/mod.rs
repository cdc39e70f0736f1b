//! Command handlers - extracted from main.rs for testability
//!
//! Each handler module contains the execution logic for one group of
//! commands, its pure helpers and their tests.

pub mod auth;
pub mod load;
pub mod report;
pub mod suite;

pub use auth::{base_client, execute_login};
pub use load::{execute_load, resolve_profile};
pub use report::execute_report;
pub use suite::{execute_run, execute_suite, summarize_suites, SuiteKind};

use crate::config::CliConfig;

/// Print a summary block and a colored verdict line, unless quiet.
pub(crate) fn print_summary(config: &CliConfig, summary: &str, passed: bool) {
    if config.verbosity.is_quiet() {
        return;
    }
    print!("{summary}");
    let verdict = if passed {
        console::style("PASSED").green().bold()
    } else {
        console::style("FAILED").red().bold()
    };
    println!("{verdict}");
}
