//! Metrics collection
//!
//! - `MetricsAggregator`: concurrent tallies shared by all virtual users
//! - `MetricsSnapshot` and friends: serializable summaries for reporting

mod aggregator;
mod types;

pub use aggregator::{LOGIN_CALL, MetricsAggregator};
pub use types::{
    CallSummary, CheckSummary, ErrorCounts, ErrorKind, LatencyStats, LatencySummary,
    MetricsSnapshot,
};
