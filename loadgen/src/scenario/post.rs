//! Post creation with a JSON body

use async_trait::async_trait;
use serde::Serialize;

use super::types::Scenario;
use crate::checks::{CallOutcome, perform};
use crate::session::Session;
use crate::target::{TOKEN_HEADER, Target};

pub const POSTS_PATH: &str = "/posts";

#[derive(Debug, Clone, Serialize)]
pub struct PostLocation {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Body of `POST /posts`
#[derive(Debug, Clone, Serialize)]
pub struct PostPayload {
    pub caption: String,
    pub hashtags: Vec<String>,
    pub location: PostLocation,
    pub allow_comments: bool,
    pub images: Vec<String>,
}

impl Default for PostPayload {
    fn default() -> Self {
        Self {
            caption: "Some Caption".to_string(),
            hashtags: vec!["nature".to_string()],
            location: PostLocation {
                name: "Test Post".to_string(),
                latitude: 0.0,
                longitude: 0.0,
            },
            allow_comments: true,
            images: Vec::new(),
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct CreatePost {
    payload: PostPayload,
}

impl CreatePost {
    pub fn with_payload(payload: PostPayload) -> Self {
        Self { payload }
    }
}

#[async_trait]
impl Scenario for CreatePost {
    fn name(&self) -> &'static str {
        "create_post"
    }

    async fn execute(&self, target: &Target, session: &Session) -> CallOutcome {
        let request = target
            .client()
            .post(target.url(POSTS_PATH))
            .header(TOKEN_HEADER, session.token())
            .json(&self.payload);

        perform(request, target.policy()).await.outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_payload_shape() {
        let json = serde_json::to_value(PostPayload::default()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "caption": "Some Caption",
                "hashtags": ["nature"],
                "location": {"name": "Test Post", "latitude": 0.0, "longitude": 0.0},
                "allow_comments": true,
                "images": []
            })
        );
    }
}
