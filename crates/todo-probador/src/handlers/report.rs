//! Report command handler

use crate::commands::ReportArgs;
use crate::config::CliConfig;
use crate::error::CliResult;
use todo_probar::report::{read_load_result, update_performance_md};

/// Execute `todo-probador report`: append a saved load result to the table.
pub fn execute_report(config: &CliConfig, args: &ReportArgs) -> CliResult<()> {
    let result = read_load_result(&args.input)?;
    update_performance_md(&args.performance_md, std::slice::from_ref(&result))?;
    if !config.verbosity.is_quiet() {
        println!(
            "Appended {} ({}) to {}",
            result.profile_name,
            result.timestamp,
            args.performance_md.display()
        );
    }
    Ok(())
}
