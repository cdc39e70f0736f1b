//! Suite command handlers: `crud`, `negative`, `properties` and `run`

use super::auth::login_with;
use super::print_summary;
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use std::time::Instant;
use todo_probar::report::{suite_summary, write_json};
use todo_probar::scenario::CRUD_SCENARIO;
use todo_probar::{run_crud, run_negative, run_properties, HarnessConfig, Session, SuiteReport};

/// A suite runnable on its own
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuiteKind {
    /// CRUD flow
    Crud,
    /// Negative-path checks
    Negative,
    /// Behavioral properties
    Properties,
}

impl SuiteKind {
    /// Run this suite in an open session
    pub async fn run(self, session: &Session) -> SuiteReport {
        match self {
            Self::Crud => crud_suite(session).await,
            Self::Negative => run_negative(session).await,
            Self::Properties => run_properties(session).await,
        }
    }
}

async fn crud_suite(session: &Session) -> SuiteReport {
    let start = Instant::now();
    let report = run_crud(session).await;
    SuiteReport::new(CRUD_SCENARIO, vec![report], start.elapsed())
}

/// Execute a single suite using the token saved by `login`.
pub async fn execute_suite(config: &CliConfig, kind: SuiteKind) -> CliResult<()> {
    let session = Session::open(HarnessConfig::from_env()?)?;
    let report = kind.run(&session).await;
    session.close(&report.suite);
    summarize_suites(config, &[report])
}

/// Execute `run`: login, then CRUD and negative checks concurrently, then properties.
pub async fn execute_run(config: &CliConfig) -> CliResult<()> {
    let harness = HarnessConfig::from_env()?;
    login_with(&harness).await?;
    let session = Session::open(harness)?;

    let (crud, negative) = tokio::join!(
        SuiteKind::Crud.run(&session),
        SuiteKind::Negative.run(&session)
    );
    let properties = SuiteKind::Properties.run(&session).await;
    session.close("run");

    summarize_suites(config, &[crud, negative, properties])
}

/// Print, optionally save, and turn failures into an error.
pub fn summarize_suites(config: &CliConfig, reports: &[SuiteReport]) -> CliResult<()> {
    for report in reports {
        print_summary(config, &suite_summary(report), report.all_passed());
    }
    if let Some(path) = &config.output {
        write_json(path, &reports)?;
        tracing::info!(path = %path.display(), "report written");
    }

    let total: usize = reports.iter().map(|r| r.scenarios.len()).sum();
    let failed: usize = reports.iter().map(SuiteReport::failed_count).sum();
    if failed == 0 {
        Ok(())
    } else {
        Err(CliError::SuiteFailed { failed, total })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::Verbosity;
    use std::time::Duration;
    use tempfile::TempDir;
    use todo_probar::{ScenarioReport, StepReport};

    fn scenario(name: &str, passed: bool) -> ScenarioReport {
        ScenarioReport {
            name: name.to_string(),
            steps: vec![StepReport {
                name: name.to_string(),
                passed,
                duration_ms: 1.0,
                error: (!passed).then(|| "expected status 404, got 200".to_string()),
            }],
            error: (!passed).then(|| "expected status 404, got 200".to_string()),
            warnings: vec![],
            state: None,
            duration_ms: 1.0,
        }
    }

    fn quiet() -> CliConfig {
        CliConfig::new().with_verbosity(Verbosity::Quiet)
    }

    #[test]
    fn test_all_passed_is_ok() {
        let report = SuiteReport::new("s", vec![scenario("a", true)], Duration::ZERO);
        assert!(summarize_suites(&quiet(), &[report]).is_ok());
    }

    #[test]
    fn test_failures_are_counted_across_suites() {
        let first = SuiteReport::new("s1", vec![scenario("a", true)], Duration::ZERO);
        let second = SuiteReport::new(
            "s2",
            vec![scenario("b", false), scenario("c", true)],
            Duration::ZERO,
        );
        let err = summarize_suites(&quiet(), &[first, second]).unwrap_err();
        assert!(matches!(err, CliError::SuiteFailed { failed: 1, total: 3 }));
    }

    #[test]
    fn test_report_written_to_output() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reports/run.json");
        let config = quiet().with_output(Some(path.clone()));
        let report = SuiteReport::new("s", vec![scenario("a", true)], Duration::ZERO);
        summarize_suites(&config, &[report]).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(json[0]["suite"], "s");
        assert_eq!(json[0]["scenarios"][0]["name"], "a");
    }
}
