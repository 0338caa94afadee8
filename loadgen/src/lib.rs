//! Social Loadgen Library
//!
//! Virtual-user load generation against the social feed API: weighted
//! scenario scheduling over many concurrent virtual users with result
//! aggregation and an end-of-run report.

pub mod accounts;
pub mod checks;
pub mod config;
pub mod error;
pub mod metrics;
pub mod multipart;
pub mod report;
pub mod scenario;
pub mod scheduler;
pub mod session;
pub mod target;

// Re-export commonly used types
pub use accounts::{Account, AccountPool};
pub use config::RunConfig;
pub use error::StartupError;
pub use crate::metrics::{MetricsAggregator, MetricsSnapshot};
pub use scenario::{Scenario, ScenarioSelector};
pub use scheduler::{RunOutcome, Scheduler};
pub use session::{Session, SessionClient};
pub use target::Target;
