//! Scenario trait definition

use async_trait::async_trait;

use crate::checks::CallOutcome;
use crate::session::Session;
use crate::target::Target;

/// A named behavior run once per iteration with a valid session
#[async_trait]
pub trait Scenario: Send + Sync {
    /// Name used as the aggregation key
    fn name(&self) -> &'static str;

    /// Issue the scenario's call(s) against `target`
    async fn execute(&self, target: &Target, session: &Session) -> CallOutcome;
}
