//! End-of-run report
//!
//! Produces `summary.html` and `summary.json` from a metrics snapshot and the
//! run configuration, plus a console summary. Failures here are reported to
//! the caller and never influence the outcome of the run itself.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::config::RunConfig;
use crate::metrics::{CallSummary, MetricsSnapshot};

pub const HTML_FILE: &str = "summary.html";
pub const JSON_FILE: &str = "summary.json";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to write {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to format report: {0}")]
    Format(#[from] std::fmt::Error),
}

/// Deployment environment inferred from the base URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Environment {
    Dev,
    Staging,
    Production,
}

impl Environment {
    pub fn classify(base_url: &str) -> Self {
        let url = base_url.to_lowercase();
        if url.contains("dev") {
            Environment::Dev
        } else if url.contains("stage") || url.contains("staging") {
            Environment::Staging
        } else {
            Environment::Production
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Environment::Dev => "DEV",
            Environment::Staging => "STAGING",
            Environment::Production => "PRODUCTION",
        }
    }
}

/// Run parameters echoed into the report
#[derive(Debug, Clone, Serialize)]
pub struct RunInfo {
    pub base_url: String,
    pub environment: Environment,
    pub generated_at: String,
    pub vus: usize,
    pub duration_secs: f64,
    pub pacing_ms: u64,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    run: &'a RunInfo,
    metrics: &'a MetricsSnapshot,
}

/// Rendered report documents
#[derive(Debug, Clone)]
pub struct Report {
    pub run: RunInfo,
    pub html: String,
    pub json: String,
}

impl Report {
    /// Write both documents into `dir`, returning the written paths
    pub fn write_to(&self, dir: &Path) -> Result<Vec<PathBuf>, ReportError> {
        std::fs::create_dir_all(dir).map_err(|source| ReportError::Write {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut written = Vec::with_capacity(2);
        for (name, content) in [(HTML_FILE, &self.html), (JSON_FILE, &self.json)] {
            let path = dir.join(name);
            std::fs::write(&path, content).map_err(|source| ReportError::Write {
                path: path.clone(),
                source,
            })?;
            info!("Report written to {:?}", path);
            written.push(path);
        }
        Ok(written)
    }
}

/// Format as "September 3, 2025 09:39:14"
pub fn format_timestamp(at: &DateTime<Local>) -> String {
    at.format("%B %-d, %Y %H:%M:%S").to_string()
}

/// Render the report with the current local time
pub fn render(snapshot: &MetricsSnapshot, config: &RunConfig) -> Result<Report, ReportError> {
    render_at(snapshot, config, Local::now())
}

pub fn render_at(
    snapshot: &MetricsSnapshot,
    config: &RunConfig,
    at: DateTime<Local>,
) -> Result<Report, ReportError> {
    let run = RunInfo {
        base_url: config.base_url.clone(),
        environment: Environment::classify(&config.base_url),
        generated_at: format_timestamp(&at),
        vus: config.vus,
        duration_secs: config.duration.as_secs_f64(),
        pacing_ms: config.pacing.as_millis() as u64,
    };

    let json = serde_json::to_string_pretty(&JsonReport {
        run: &run,
        metrics: snapshot,
    })?;
    let html = render_html(&run, snapshot)?;

    Ok(Report { run, html, json })
}

fn render_html(run: &RunInfo, snapshot: &MetricsSnapshot) -> Result<String, std::fmt::Error> {
    let mut out = String::new();
    let env_class = run.environment.label().to_lowercase();

    writeln!(out, "<!DOCTYPE html>")?;
    writeln!(out, "<html>")?;
    writeln!(out, "<head>")?;
    writeln!(out, "    <meta charset=\"utf-8\">")?;
    writeln!(
        out,
        "    <title>Load Test Report - {}</title>",
        escape_html(&run.generated_at)
    )?;
    writeln!(out, "    <style>{}</style>", STYLE)?;
    writeln!(out, "</head>")?;
    writeln!(out, "<body>")?;

    writeln!(out, "<div class=\"header\">")?;
    writeln!(out, "    <h1>Load Test Report</h1>")?;
    writeln!(
        out,
        "    <p><strong>Generated:</strong> {}</p>",
        escape_html(&run.generated_at)
    )?;
    writeln!(out, "</div>")?;

    writeln!(out, "<div class=\"config\">")?;
    writeln!(out, "    <h3>Test Configuration</h3>")?;
    writeln!(
        out,
        "    <p><strong>Base URL:</strong> {}</p>",
        escape_html(&run.base_url)
    )?;
    writeln!(
        out,
        "    <p><strong>Environment:</strong> <span class=\"env-badge env-{}\">{}</span></p>",
        env_class,
        run.environment.label()
    )?;
    writeln!(
        out,
        "    <p><strong>Virtual users:</strong> {} &middot; <strong>Duration:</strong> {:.0}s &middot; <strong>Pacing:</strong> {}ms</p>",
        run.vus, run.duration_secs, run.pacing_ms
    )?;
    writeln!(out, "</div>")?;

    writeln!(out, "<h2>Overview</h2>")?;
    writeln!(out, "<table>")?;
    row(&mut out, "Iterations", &snapshot.iterations.to_string())?;
    row(
        &mut out,
        "Iterations / s",
        &format!("{:.2}", snapshot.iteration_rate()),
    )?;
    row(
        &mut out,
        "Scenario executions",
        &snapshot.scenario_executions.to_string(),
    )?;
    row(&mut out, "Failed logins", &snapshot.login_failures.to_string())?;
    row(&mut out, "Checks passed", &snapshot.checks_passed().to_string())?;
    row(&mut out, "Checks failed", &snapshot.checks_failed().to_string())?;
    writeln!(out, "</table>")?;

    writeln!(out, "<h2>Checks</h2>")?;
    writeln!(
        out,
        "<table>\n<tr><th>Check</th><th>Passed</th><th>Failed</th><th>Pass rate</th></tr>"
    )?;
    for check in &snapshot.checks {
        let class = if check.failed == 0 { "pass" } else { "fail" };
        writeln!(
            out,
            "<tr class=\"{}\"><td>{}</td><td>{}</td><td>{}</td><td>{:.2}%</td></tr>",
            class,
            escape_html(&check.name),
            check.passed,
            check.failed,
            check.pass_rate() * 100.0
        )?;
    }
    writeln!(out, "</table>")?;

    writeln!(out, "<h2>Calls</h2>")?;
    writeln!(
        out,
        "<table>\n<tr><th>Call</th><th>Executions</th><th>Checks failed</th><th>Min</th><th>Mean</th><th>P50</th><th>P90</th><th>P95</th><th>P99</th><th>Max</th></tr>"
    )?;
    for call in snapshot.login.iter().chain(snapshot.scenarios.iter()) {
        call_row(&mut out, call)?;
    }
    writeln!(out, "</table>")?;

    writeln!(out, "<h2>Errors</h2>")?;
    writeln!(out, "<table>")?;
    row(
        &mut out,
        "Authentication rejected",
        &snapshot.errors.authentication.to_string(),
    )?;
    row(
        &mut out,
        "Token missing",
        &snapshot.errors.token_missing.to_string(),
    )?;
    row(&mut out, "Network", &snapshot.errors.network.to_string())?;
    row(&mut out, "Timeout", &snapshot.errors.timeout.to_string())?;
    writeln!(out, "</table>")?;

    writeln!(out, "</body>")?;
    writeln!(out, "</html>")?;
    Ok(out)
}

fn row(out: &mut String, label: &str, value: &str) -> std::fmt::Result {
    writeln!(
        out,
        "<tr><th>{}</th><td>{}</td></tr>",
        escape_html(label),
        escape_html(value)
    )
}

fn call_row(out: &mut String, call: &CallSummary) -> std::fmt::Result {
    let l = &call.latency;
    writeln!(
        out,
        "<tr><td>{}</td><td>{}</td><td>{}</td><td>{:.1}ms</td><td>{:.1}ms</td><td>{:.1}ms</td><td>{:.1}ms</td><td>{:.1}ms</td><td>{:.1}ms</td><td>{:.1}ms</td></tr>",
        escape_html(&call.name),
        call.executions,
        call.checks_failed,
        l.min_ms,
        l.mean_ms,
        l.p50_ms,
        l.p90_ms,
        l.p95_ms,
        l.p99_ms,
        l.max_ms
    )
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

const STYLE: &str = "
        body { font-family: Arial, sans-serif; margin: 20px; }
        .header { background: #f5f5f5; padding: 20px; border-radius: 5px; margin-bottom: 20px; }
        .config { background: #e8f4fd; padding: 15px; border-radius: 5px; margin-bottom: 20px; }
        .config h3 { margin-top: 0; color: #2c5aa0; }
        .env-badge { display: inline-block; padding: 4px 8px; border-radius: 4px; font-size: 12px; font-weight: bold; text-transform: uppercase; }
        .env-dev { background: #d4edda; color: #155724; }
        .env-staging { background: #fff3cd; color: #856404; }
        .env-production { background: #f8d7da; color: #721c24; }
        table { border-collapse: collapse; margin-bottom: 20px; }
        th, td { border: 1px solid #ddd; padding: 6px 10px; text-align: left; }
        tr.fail td { background: #f8d7da; }
    ";

/// Print the end-of-run summary to stdout
#[allow(clippy::print_literal)]
pub fn print_summary(run: &RunInfo, snapshot: &MetricsSnapshot) {
    println!();
    println!("═══════════════════════════════════════════════════════════════");
    println!(
        " RESULTS: {} ({}) - {} VUs, {:.0}s",
        run.base_url,
        run.environment.label(),
        run.vus,
        run.duration_secs
    );
    println!("═══════════════════════════════════════════════════════════════");
    println!();
    println!(
        "   Iterations:   {} ({:.2}/s)",
        snapshot.iterations,
        snapshot.iteration_rate()
    );
    println!("   Scenarios:    {}", snapshot.scenario_executions);
    println!("   Failed login: {}", snapshot.login_failures);
    println!();
    println!(" ─── Checks ──────────────────────────────────────────────────");
    println!();
    for check in &snapshot.checks {
        let mark = if check.failed == 0 { "✓" } else { "✗" };
        println!(
            "   {} {:30} {:>6.2}%  ✓ {} / ✗ {}",
            mark,
            check.name,
            check.pass_rate() * 100.0,
            check.passed,
            check.failed
        );
    }
    println!();
    println!(" ─── Latency ─────────────────────────────────────────────────");
    println!();
    println!(
        "   {:14} {:>8} {:>10} {:>10} {:>10} {:>10}",
        "Call", "Count", "P50", "P95", "P99", "Max"
    );
    for call in snapshot.login.iter().chain(snapshot.scenarios.iter()) {
        let l = &call.latency;
        println!(
            "   {:14} {:>8} {:>8.1}ms {:>8.1}ms {:>8.1}ms {:>8.1}ms",
            call.name, call.executions, l.p50_ms, l.p95_ms, l.p99_ms, l.max_ms
        );
    }
    if snapshot.errors.total() > 0 {
        println!();
        println!(
            "   Errors: authentication={} token_missing={} network={} timeout={}",
            snapshot.errors.authentication,
            snapshot.errors.token_missing,
            snapshot.errors.network,
            snapshot.errors.timeout
        );
    }
    println!();
    println!("═══════════════════════════════════════════════════════════════");
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::{CHECK_STATUS, CheckResult};
    use crate::metrics::MetricsAggregator;
    use chrono::TimeZone;
    use std::time::Duration;

    fn snapshot() -> MetricsSnapshot {
        let agg = MetricsAggregator::new();
        agg.record_iteration();
        agg.record_login(
            &[CheckResult::new(CHECK_STATUS, true, Some(200.0))],
            Duration::from_millis(4),
            true,
        );
        agg.record(
            "scroll_feed",
            &[CheckResult::new(CHECK_STATUS, false, Some(500.0))],
            Duration::from_millis(9),
        );
        agg.snapshot()
    }

    #[test]
    fn test_environment_classification() {
        assert_eq!(
            Environment::classify("https://api-dev.alemx.com"),
            Environment::Dev
        );
        assert_eq!(
            Environment::classify("https://API-STAGE.example.com"),
            Environment::Staging
        );
        assert_eq!(
            Environment::classify("https://staging.example.com"),
            Environment::Staging
        );
        assert_eq!(
            Environment::classify("https://api.alemx.com"),
            Environment::Production
        );
        // "dev" wins over "stage"
        assert_eq!(
            Environment::classify("https://stage.devbox.io"),
            Environment::Dev
        );
    }

    #[test]
    fn test_timestamp_format() {
        let at = Local.with_ymd_and_hms(2025, 9, 3, 9, 39, 14).unwrap();
        assert_eq!(format_timestamp(&at), "September 3, 2025 09:39:14");
    }

    #[test]
    fn test_render_embeds_run_info() {
        let config = RunConfig {
            base_url: "https://api-staging.example.com".to_string(),
            vus: 7,
            ..Default::default()
        };
        let at = Local.with_ymd_and_hms(2025, 9, 3, 9, 39, 14).unwrap();
        let report = render_at(&snapshot(), &config, at).unwrap();

        assert_eq!(report.run.environment, Environment::Staging);
        assert!(report.html.contains("https://api-staging.example.com"));
        assert!(report.html.contains("env-staging"));
        assert!(report.html.contains("September 3, 2025 09:39:14"));
        assert!(report.html.contains("scroll_feed"));
        assert!(report.html.contains("<tr class=\"fail\">"));

        let json: serde_json::Value = serde_json::from_str(&report.json).unwrap();
        assert_eq!(json["run"]["environment"], "STAGING");
        assert_eq!(json["run"]["vus"], 7);
        assert_eq!(json["metrics"]["iterations"], 1);
        assert_eq!(json["metrics"]["scenario_executions"], 1);
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html("<a href=\"x\">&'"),
            "&lt;a href=&quot;x&quot;&gt;&amp;&#39;"
        );
    }

    #[test]
    fn test_write_to_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("reports");
        let report = render(&snapshot(), &RunConfig::default()).unwrap();

        let written = report.write_to(&dir).unwrap();
        assert_eq!(written.len(), 2);
        let html = std::fs::read_to_string(dir.join(HTML_FILE)).unwrap();
        assert_eq!(html, report.html);
        let json = std::fs::read_to_string(dir.join(JSON_FILE)).unwrap();
        assert_eq!(json, report.json);
    }

    #[test]
    fn test_write_failure_is_reported() {
        // A regular file cannot be used as the report directory
        let file = tempfile::NamedTempFile::new().unwrap();

        let report = render(&snapshot(), &RunConfig::default()).unwrap();
        let err = report.write_to(file.path()).unwrap_err();
        assert!(matches!(err, ReportError::Write { .. }));
    }
}
