//! Scenario set and weighted selection
//!
//! This module provides:
//! - `Scenario` trait implemented by every behavior a virtual user can run
//! - `ScrollFeed`, `CreatePost` and `CreateStory`, the standard behaviors
//! - `ScenarioSelector` for weighted, seedable selection

mod feed;
mod post;
mod selector;
mod story;
mod types;

pub use feed::{FEED_PATH, ScrollFeed};
pub use post::{CreatePost, POSTS_PATH, PostLocation, PostPayload};
pub use selector::{ScenarioSelector, WeightError, WeightedScenario};
pub use story::{CreateStory, STORY_PATH, StoryLocation};
pub use types::Scenario;
