//! Metric types and summaries

use std::time::Duration;

use hdrhistogram::Histogram;
use serde::Serialize;

use crate::checks::RequestError;
use crate::session::AuthError;

/// Significant figures kept by latency histograms
const SIGNIFICANT_FIGURES: u8 = 3;

/// Latency distribution collected during a run.
///
/// Samples are bucketed in microseconds with three significant figures, so
/// memory stays bounded however long the run is.
#[derive(Clone)]
pub struct LatencyStats {
    histogram: Histogram<u64>,
}

impl std::fmt::Debug for LatencyStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LatencyStats")
            .field("count", &self.histogram.len())
            .finish()
    }
}

impl Default for LatencyStats {
    fn default() -> Self {
        Self::new()
    }
}

impl LatencyStats {
    pub fn new() -> Self {
        let mut histogram =
            Histogram::<u64>::new(SIGNIFICANT_FIGURES).expect("3 sigfigs is always valid");
        histogram.auto(true);
        Self { histogram }
    }

    pub fn record(&mut self, latency: Duration) {
        let micros = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX);
        self.histogram.saturating_record(micros);
    }

    pub fn merge(&mut self, other: &LatencyStats) {
        // Auto-resizing histograms accept any range
        let _ = self.histogram.add(&other.histogram);
    }

    pub fn len(&self) -> u64 {
        self.histogram.len()
    }

    pub fn is_empty(&self) -> bool {
        self.histogram.is_empty()
    }

    /// Calculate percentile (0-100)
    pub fn percentile(&self, p: f64) -> Option<Duration> {
        if self.is_empty() {
            return None;
        }
        Some(Duration::from_micros(
            self.histogram.value_at_quantile(p / 100.0),
        ))
    }

    pub fn p99(&self) -> Option<Duration> {
        self.percentile(99.0)
    }

    /// Summarize in milliseconds
    pub fn summary(&self) -> LatencySummary {
        if self.is_empty() {
            return LatencySummary::default();
        }

        let h = &self.histogram;
        let quantile_ms = |q: f64| micros_to_ms(h.value_at_quantile(q) as f64);

        LatencySummary {
            count: h.len(),
            min_ms: micros_to_ms(h.min() as f64),
            max_ms: micros_to_ms(h.max() as f64),
            mean_ms: micros_to_ms(h.mean()),
            p50_ms: quantile_ms(0.50),
            p90_ms: quantile_ms(0.90),
            p95_ms: quantile_ms(0.95),
            p99_ms: quantile_ms(0.99),
        }
    }
}

fn micros_to_ms(micros: f64) -> f64 {
    micros / 1000.0
}

/// Latency distribution in milliseconds
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LatencySummary {
    pub count: u64,
    pub min_ms: f64,
    pub max_ms: f64,
    pub mean_ms: f64,
    pub p50_ms: f64,
    pub p90_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
}

/// Live counters for one call type (login or a scenario)
#[derive(Debug, Default)]
pub struct CallStats {
    pub executions: u64,
    pub checks_passed: u64,
    pub checks_failed: u64,
    pub latencies: LatencyStats,
}

/// Pass/fail tally for one check name
#[derive(Debug, Default, Clone, Copy)]
pub struct CheckCounter {
    pub passed: u64,
    pub failed: u64,
}

/// Category of a non-fatal per-iteration failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Authentication,
    TokenMissing,
    Network,
    Timeout,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Authentication => "authentication",
            ErrorKind::TokenMissing => "token_missing",
            ErrorKind::Network => "network",
            ErrorKind::Timeout => "timeout",
        }
    }
}

impl From<&RequestError> for ErrorKind {
    fn from(err: &RequestError) -> Self {
        match err {
            RequestError::Timeout(_) => ErrorKind::Timeout,
            RequestError::Network(_) => ErrorKind::Network,
        }
    }
}

impl From<&AuthError> for ErrorKind {
    fn from(err: &AuthError) -> Self {
        match err {
            AuthError::Rejected { .. } => ErrorKind::Authentication,
            AuthError::TokenMissing => ErrorKind::TokenMissing,
            AuthError::Request(e) => ErrorKind::from(e),
        }
    }
}

/// Summary of one call type
#[derive(Debug, Clone, Serialize)]
pub struct CallSummary {
    pub name: String,
    pub executions: u64,
    pub checks_passed: u64,
    pub checks_failed: u64,
    pub latency: LatencySummary,
}

/// Summary of one check name across all calls
#[derive(Debug, Clone, Serialize)]
pub struct CheckSummary {
    pub name: String,
    pub passed: u64,
    pub failed: u64,
}

impl CheckSummary {
    /// Fraction of passes (0.0 to 1.0); 1.0 when never evaluated
    pub fn pass_rate(&self) -> f64 {
        let total = self.passed + self.failed;
        if total == 0 {
            1.0
        } else {
            self.passed as f64 / total as f64
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ErrorCounts {
    pub authentication: u64,
    pub token_missing: u64,
    pub network: u64,
    pub timeout: u64,
}

impl ErrorCounts {
    pub fn total(&self) -> u64 {
        self.authentication + self.token_missing + self.network + self.timeout
    }

    /// Iterations that ended without a session
    pub fn auth_failures(&self) -> u64 {
        self.authentication + self.token_missing
    }
}

/// Point-in-time copy of everything the aggregator holds
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub elapsed_secs: f64,
    pub iterations: u64,
    /// Login attempts whose session was unusable; transport failures on
    /// login are counted here and in `errors` under their own kind
    pub login_failures: u64,
    pub scenario_executions: u64,
    pub login: Option<CallSummary>,
    pub scenarios: Vec<CallSummary>,
    pub checks: Vec<CheckSummary>,
    pub errors: ErrorCounts,
    /// Distribution over every call, login included
    pub latency: LatencySummary,
}

impl MetricsSnapshot {
    pub fn checks_passed(&self) -> u64 {
        self.checks.iter().map(|c| c.passed).sum()
    }

    pub fn checks_failed(&self) -> u64 {
        self.checks.iter().map(|c| c.failed).sum()
    }

    pub fn scenario(&self, name: &str) -> Option<&CallSummary> {
        self.scenarios.iter().find(|s| s.name == name)
    }

    pub fn check(&self, name: &str) -> Option<&CheckSummary> {
        self.checks.iter().find(|c| c.name == name)
    }

    /// Iterations completed per second of elapsed time
    pub fn iteration_rate(&self) -> f64 {
        if self.elapsed_secs > 0.0 {
            self.iterations as f64 / self.elapsed_secs
        } else {
            0.0
        }
    }
}
