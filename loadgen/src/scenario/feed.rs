use async_trait::async_trait;

use super::types::Scenario;
use crate::checks::{CallOutcome, perform};
use crate::session::Session;
use crate::target::{TOKEN_HEADER, Target};

pub const FEED_PATH: &str = "/feed/";

/// Fetch one page of the feed
#[derive(Debug, Default, Clone, Copy)]
pub struct ScrollFeed;

#[async_trait]
impl Scenario for ScrollFeed {
    fn name(&self) -> &'static str {
        "scroll_feed"
    }

    async fn execute(&self, target: &Target, session: &Session) -> CallOutcome {
        let request = target
            .client()
            .get(target.url(FEED_PATH))
            .header(TOKEN_HEADER, session.token());

        perform(request, target.policy()).await.outcome
    }
}
