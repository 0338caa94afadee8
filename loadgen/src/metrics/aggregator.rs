//! Metrics aggregator shared by all virtual users
//!
//! Per-call and per-check tallies live in `DashMap`s; each update holds the
//! shard lock of its key for the whole read-modify-write, so concurrent
//! callers never lose or double-count an update. Run-wide counters are
//! atomics. Every update is mirrored to the `metrics` facade for live export.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use metrics::{counter, histogram};

use super::types::{
    CallStats, CallSummary, CheckCounter, CheckSummary, ErrorCounts, ErrorKind, LatencyStats,
    MetricsSnapshot,
};
use crate::checks::CheckResult;

/// Aggregation key for login calls
pub const LOGIN_CALL: &str = "login";

pub struct MetricsAggregator {
    calls: DashMap<&'static str, CallStats>,
    checks: DashMap<&'static str, CheckCounter>,
    iterations: AtomicU64,
    login_failures: AtomicU64,
    auth_rejected: AtomicU64,
    token_missing: AtomicU64,
    network_errors: AtomicU64,
    timeouts: AtomicU64,
    started: Instant,
}

impl MetricsAggregator {
    pub fn new() -> Self {
        Self {
            calls: DashMap::new(),
            checks: DashMap::new(),
            iterations: AtomicU64::new(0),
            login_failures: AtomicU64::new(0),
            auth_rejected: AtomicU64::new(0),
            token_missing: AtomicU64::new(0),
            network_errors: AtomicU64::new(0),
            timeouts: AtomicU64::new(0),
            started: Instant::now(),
        }
    }

    /// Record one executed call of `scenario` with its checks and latency
    pub fn record(&self, scenario: &'static str, checks: &[CheckResult], latency: Duration) {
        {
            let mut stats = self.calls.entry(scenario).or_default();
            stats.executions += 1;
            for check in checks {
                if check.passed {
                    stats.checks_passed += 1;
                } else {
                    stats.checks_failed += 1;
                }
            }
            stats.latencies.record(latency);
        }

        for check in checks {
            let mut counter = self.checks.entry(check.name).or_default();
            if check.passed {
                counter.passed += 1;
            } else {
                counter.failed += 1;
            }
            let outcome = if check.passed { "pass" } else { "fail" };
            counter!("loadgen_checks_total", "check" => check.name, "outcome" => outcome)
                .increment(1);
        }

        counter!("loadgen_calls_total", "call" => scenario).increment(1);
        histogram!("loadgen_call_duration_seconds", "call" => scenario).record(latency);
    }

    /// Record a login call; its checks count toward the shared check names
    pub fn record_login(&self, checks: &[CheckResult], latency: Duration, succeeded: bool) {
        self.record(LOGIN_CALL, checks, latency);
        if !succeeded {
            self.login_failures.fetch_add(1, Ordering::SeqCst);
            counter!("loadgen_login_failures_total").increment(1);
        }
    }

    pub fn record_iteration(&self) {
        self.iterations.fetch_add(1, Ordering::SeqCst);
        counter!("loadgen_iterations_total").increment(1);
    }

    pub fn record_error(&self, kind: ErrorKind) {
        let slot = match kind {
            ErrorKind::Authentication => &self.auth_rejected,
            ErrorKind::TokenMissing => &self.token_missing,
            ErrorKind::Network => &self.network_errors,
            ErrorKind::Timeout => &self.timeouts,
        };
        slot.fetch_add(1, Ordering::SeqCst);
        counter!("loadgen_errors_total", "kind" => kind.as_str()).increment(1);
    }

    pub fn iterations(&self) -> u64 {
        self.iterations.load(Ordering::SeqCst)
    }

    /// Executions of everything but login
    pub fn scenario_executions(&self) -> u64 {
        self.calls
            .iter()
            .filter(|entry| *entry.key() != LOGIN_CALL)
            .map(|entry| entry.value().executions)
            .sum()
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Copy the current state into a serializable summary
    pub fn snapshot(&self) -> MetricsSnapshot {
        let mut overall = LatencyStats::new();
        let mut login = None;
        let mut scenarios = Vec::new();

        for entry in self.calls.iter() {
            let stats = entry.value();
            overall.merge(&stats.latencies);

            let summary = CallSummary {
                name: entry.key().to_string(),
                executions: stats.executions,
                checks_passed: stats.checks_passed,
                checks_failed: stats.checks_failed,
                latency: stats.latencies.summary(),
            };
            if *entry.key() == LOGIN_CALL {
                login = Some(summary);
            } else {
                scenarios.push(summary);
            }
        }
        scenarios.sort_by(|a, b| a.name.cmp(&b.name));

        let mut checks: Vec<CheckSummary> = self
            .checks
            .iter()
            .map(|entry| CheckSummary {
                name: entry.key().to_string(),
                passed: entry.value().passed,
                failed: entry.value().failed,
            })
            .collect();
        checks.sort_by(|a, b| a.name.cmp(&b.name));

        let scenario_executions = scenarios.iter().map(|s| s.executions).sum();

        MetricsSnapshot {
            elapsed_secs: self.elapsed().as_secs_f64(),
            iterations: self.iterations(),
            login_failures: self.login_failures.load(Ordering::SeqCst),
            scenario_executions,
            login,
            scenarios,
            checks,
            errors: ErrorCounts {
                authentication: self.auth_rejected.load(Ordering::SeqCst),
                token_missing: self.token_missing.load(Ordering::SeqCst),
                network: self.network_errors.load(Ordering::SeqCst),
                timeout: self.timeouts.load(Ordering::SeqCst),
            },
            latency: overall.summary(),
        }
    }
}

impl Default for MetricsAggregator {
    fn default() -> Self {
        Self::new()
    }
}
