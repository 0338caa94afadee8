//! Startup error taxonomy
//!
//! Every variant here aborts the run before the first virtual user starts.
//! Per-iteration failures live next to the code that produces them
//! (`AuthError`, `RequestError`) and never reach this type.

use thiserror::Error;

use crate::accounts::AccountError;
use crate::scenario::WeightError;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Failed to load accounts: {0}")]
    DataLoad(#[from] AccountError),

    #[error("Account pool is empty, at least one account is required")]
    EmptyAccountPool,

    #[error("Invalid scenario weights: {0}")]
    InvalidWeightDistribution(#[from] WeightError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}
