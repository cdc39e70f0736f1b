//! Report generation for suite and load test results.
//!
//! Produces console summaries, JSON output, and can update a historical
//! `performance.md` table with new load test results.

use crate::loadtest::LoadTestResult;
use crate::result::ProbeResult;
use crate::scenario::SuiteReport;
use serde::Serialize;
use std::fmt::Write as _;
use std::path::Path;

/// Write any report value as pretty JSON, creating parent directories.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> ProbeResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Read a load test result previously written with [`write_json`].
pub fn read_load_result(path: &Path) -> ProbeResult<LoadTestResult> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Title written at the top of a fresh `performance.md`.
const DOCUMENT_TITLE: &str = "# ToDo API Performance";

/// Heading for a table added below unrelated content.
const SECTION_TITLE: &str = "## Load Test Results";

const COLUMNS: [&str; 10] = [
    "Date",
    "Profile",
    "Requests",
    "RPS",
    "P50 (ms)",
    "P90 (ms)",
    "P95 (ms)",
    "P99 (ms)",
    "Check fail %",
    "Thresholds",
];

fn table_line<S: AsRef<str>>(cells: &[S]) -> String {
    let cells: Vec<&str> = cells.iter().map(AsRef::as_ref).collect();
    format!("| {} |", cells.join(" | "))
}

fn header_line() -> String {
    table_line(&COLUMNS)
}

fn rule_line() -> String {
    table_line(&COLUMNS.map(|c| "-".repeat(c.len())))
}

/// One Markdown table row for a load test result.
pub fn to_markdown_row(result: &LoadTestResult) -> String {
    let date = result
        .timestamp
        .split_once('T')
        .map_or(result.timestamp.as_str(), |(date, _)| date);
    let ms = |value: f64| format!("{value:.1}");
    table_line(&[
        date.to_string(),
        result.profile_name.clone(),
        result.total_requests.to_string(),
        ms(result.throughput_rps),
        ms(result.latency_p50_ms),
        ms(result.latency_p90_ms),
        ms(result.latency_p95_ms),
        ms(result.latency_p99_ms),
        ms(result.check_failure_rate()),
        (if result.passed() { "pass" } else { "FAIL" }).to_string(),
    ])
}

fn table_lines(results: &[LoadTestResult]) -> Vec<String> {
    let mut lines = vec![header_line(), rule_line()];
    lines.extend(results.iter().map(to_markdown_row));
    lines
}

/// A headed table holding `results`, one row each.
pub fn to_markdown_table(results: &[LoadTestResult]) -> String {
    format!("{SECTION_TITLE}\n\n{}\n", table_lines(results).join("\n"))
}

/// Record `results` in a `performance.md` history.
///
/// Rows are inserted directly after the last row of the existing table, so
/// text following the table stays where it is. A file without the table gets
/// one appended as a new section; a missing file is created.
pub fn update_performance_md(path: &Path, results: &[LoadTestResult]) -> std::io::Result<()> {
    let existing = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e),
    };
    let header = header_line();
    let mut lines: Vec<String> = existing.lines().map(str::to_string).collect();

    let content = if let Some(start) = lines.iter().position(|l| l.trim() == header) {
        let end = lines[start..]
            .iter()
            .position(|l| !l.trim_start().starts_with('|'))
            .map_or(lines.len(), |offset| start + offset);
        let tail = lines.split_off(end);
        lines.extend(results.iter().map(to_markdown_row));
        lines.extend(tail);
        lines.join("\n") + "\n"
    } else if existing.trim().is_empty() {
        format!("{DOCUMENT_TITLE}\n\n{}\n", table_lines(results).join("\n"))
    } else {
        format!("{}\n\n{}", existing.trim_end(), to_markdown_table(results))
    };
    std::fs::write(path, content)
}

/// End-of-run text summary for a load test.
pub fn load_summary(result: &LoadTestResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Load test: {}", result.profile_name);
    if !result.token_acquired {
        let _ = writeln!(out, "  no token was obtained; virtual users did not run");
    }
    let _ = writeln!(
        out,
        "  requests: {} ({:.1}/s over {:.1}s), transport errors: {}",
        result.total_requests, result.throughput_rps, result.elapsed_secs, result.transport_errors
    );
    let _ = writeln!(
        out,
        "  checks: {} passed, {} failed ({:.2}%)",
        result.checks_passed,
        result.checks_failed,
        result.check_failure_rate()
    );
    let _ = writeln!(
        out,
        "  latency ms: p50={:.1} p90={:.1} p95={:.1} p99={:.1} max={:.1}",
        result.latency_p50_ms,
        result.latency_p90_ms,
        result.latency_p95_ms,
        result.latency_p99_ms,
        result.latency_max_ms
    );
    for population in &result.populations {
        let _ = writeln!(
            out,
            "  {}: {} requests, {} check failures, max {} VUs, p95={:.1}ms",
            population.name,
            population.requests,
            population.checks_failed,
            population.max_vus,
            population.latency_p95_ms
        );
    }
    for threshold in &result.thresholds {
        let mark = if threshold.passed { "✓" } else { "✗" };
        let _ = writeln!(
            out,
            "  {mark} {} (actual {:.1}ms)",
            threshold.description, threshold.actual_ms
        );
    }
    out
}

/// List-style text summary for a suite.
pub fn suite_summary(report: &SuiteReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", report.suite);
    for scenario in &report.scenarios {
        let mark = if scenario.passed() { "✓" } else { "✗" };
        let _ = writeln!(
            out,
            "  {mark} {} ({:.0}ms)",
            scenario.name, scenario.duration_ms
        );
        if let Some(state) = &scenario.state {
            let _ = writeln!(out, "      state: {state}");
        }
        if let Some(step) = scenario.failed_step() {
            let _ = writeln!(
                out,
                "      failed at {}: {}",
                step.name,
                step.error.as_deref().unwrap_or("unknown error")
            );
        } else if let Some(error) = &scenario.error {
            let _ = writeln!(out, "      {error}");
        }
        for warning in &scenario.warnings {
            let _ = writeln!(out, "      warning: {warning}");
        }
    }
    let _ = writeln!(
        out,
        "  {} passed, {} failed ({:.0}ms)",
        report.passed_count(),
        report.failed_count(),
        report.duration_ms
    );
    out
}
