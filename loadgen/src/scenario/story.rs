//! Story creation with a multipart/form-data body

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;

use super::types::Scenario;
use crate::checks::{CallOutcome, perform};
use crate::multipart::MultipartForm;
use crate::session::Session;
use crate::target::{TOKEN_HEADER, Target};

pub const STORY_PATH: &str = "/story";

#[derive(Debug, Clone, Serialize)]
pub struct StoryLocation {
    pub name: String,
    pub city: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Default for StoryLocation {
    fn default() -> Self {
        Self {
            name: "testing loc".to_string(),
            city: "Lviv".to_string(),
            country: "Ukraine".to_string(),
            latitude: 40.678,
            longitude: 45.989,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateStory {
    location: StoryLocation,
    contents: Vec<String>,
    allow_comments: bool,
}

impl Default for CreateStory {
    fn default() -> Self {
        Self {
            location: StoryLocation::default(),
            contents: vec!["1".to_string()],
            allow_comments: true,
        }
    }
}

impl CreateStory {
    /// Form fields of one story upload, under a fresh boundary
    pub fn form(&self) -> MultipartForm {
        // Serializing plain structs and string vectors cannot fail
        let location = serde_json::to_string(&self.location).unwrap_or_default();
        let contents = serde_json::to_string(&self.contents).unwrap_or_default();

        MultipartForm::with_generated_boundary()
            .text("location", location)
            .text("contents", contents)
            .text("allow_comments", self.allow_comments.to_string())
    }
}

#[async_trait]
impl Scenario for CreateStory {
    fn name(&self) -> &'static str {
        "create_story"
    }

    async fn execute(&self, target: &Target, session: &Session) -> CallOutcome {
        let form = self.form();
        let request = target
            .client()
            .post(target.url(STORY_PATH))
            .header(CONTENT_TYPE, form.content_type())
            .header(TOKEN_HEADER, session.token())
            .body(form.build());

        perform(request, target.policy()).await.outcome
    }
}
