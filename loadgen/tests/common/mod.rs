//! Common Test Utilities for Integration Tests
//!
//! An in-process mock of the social feed API, bound to an ephemeral port.

#![allow(dead_code)]

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use social_loadgen::{AccountPool, RunConfig};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// How the mock target responds
#[derive(Debug, Clone)]
pub struct MockBehavior {
    pub login_status: StatusCode,
    pub issue_token: bool,
    pub feed_delay: Duration,
    /// Authenticated calls a token is good for before it answers 401
    pub token_uses: Option<u64>,
}

impl Default for MockBehavior {
    fn default() -> Self {
        Self {
            login_status: StatusCode::OK,
            issue_token: true,
            feed_delay: Duration::ZERO,
            token_uses: None,
        }
    }
}

/// Request counters observed by the mock
#[derive(Clone, Default)]
pub struct MockState {
    behavior: Arc<MockBehavior>,
    pub logins: Arc<AtomicU64>,
    pub feed: Arc<AtomicU64>,
    pub posts: Arc<AtomicU64>,
    pub stories: Arc<AtomicU64>,
    pub rejected: Arc<AtomicU64>,
    pub expired: Arc<AtomicU64>,
    pub identities: Arc<Mutex<HashMap<String, u64>>>,
    token_calls: Arc<Mutex<HashMap<String, u64>>>,
}

impl MockState {
    pub fn count(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::SeqCst)
    }

    pub fn scenario_hits(&self) -> u64 {
        Self::count(&self.feed) + Self::count(&self.posts) + Self::count(&self.stories)
    }

    pub fn identities_seen(&self) -> Vec<String> {
        let mut ids: Vec<_> = self.identities.lock().unwrap().keys().cloned().collect();
        ids.sort();
        ids
    }
}

/// Check the `X-Token` header, answering 401 for missing or used-up tokens
fn authorize(state: &MockState, headers: &HeaderMap) -> Result<(), Response> {
    let Some(token) = headers
        .get("X-Token")
        .and_then(|v| v.to_str().ok())
        .filter(|t| t.starts_with("token-"))
    else {
        state.rejected.fetch_add(1, Ordering::SeqCst);
        return Err(StatusCode::UNAUTHORIZED.into_response());
    };

    let mut calls = state.token_calls.lock().unwrap();
    let used = calls.entry(token.to_string()).or_default();
    *used += 1;
    if state.behavior.token_uses.is_some_and(|limit| *used > limit) {
        state.expired.fetch_add(1, Ordering::SeqCst);
        return Err((StatusCode::UNAUTHORIZED, "token expired").into_response());
    }
    Ok(())
}

async fn login(State(state): State<MockState>, Json(body): Json<Value>) -> Response {
    let login_no = state.logins.fetch_add(1, Ordering::SeqCst) + 1;

    let (Some(identity), Some("someTest")) = (
        body.get("identity").and_then(Value::as_str),
        body.get("password").and_then(Value::as_str),
    ) else {
        state.rejected.fetch_add(1, Ordering::SeqCst);
        return (StatusCode::BAD_REQUEST, "bad login body").into_response();
    };
    *state
        .identities
        .lock()
        .unwrap()
        .entry(identity.to_string())
        .or_default() += 1;

    if state.behavior.login_status != StatusCode::OK {
        return (state.behavior.login_status, "denied").into_response();
    }
    if !state.behavior.issue_token {
        return Json(json!({"ok": true})).into_response();
    }
    (
        StatusCode::OK,
        [("X-Token", format!("token-{}-{}", identity, login_no))],
        Json(json!({"ok": true})),
    )
        .into_response()
}

async fn feed(State(state): State<MockState>, headers: HeaderMap) -> Response {
    if let Err(denied) = authorize(&state, &headers) {
        return denied;
    }
    tokio::time::sleep(state.behavior.feed_delay).await;
    state.feed.fetch_add(1, Ordering::SeqCst);
    Json(json!({"items": [1, 2, 3]})).into_response()
}

async fn create_post(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(denied) = authorize(&state, &headers) {
        return denied;
    }
    if body.get("caption").is_none() {
        state.rejected.fetch_add(1, Ordering::SeqCst);
        return StatusCode::BAD_REQUEST.into_response();
    }
    state.posts.fetch_add(1, Ordering::SeqCst);
    Json(json!({"id": 1})).into_response()
}

async fn create_story(State(state): State<MockState>, headers: HeaderMap, body: Bytes) -> Response {
    let boundary = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|ct| ct.strip_prefix("multipart/form-data; boundary="))
        .map(str::to_string);

    let body = String::from_utf8_lossy(&body);
    let well_formed = boundary.is_some_and(|b| {
        body.starts_with(&format!("--{}\r\n", b))
            && body.ends_with(&format!("--{}--\r\n", b))
            && body.contains("name=\"location\"")
            && body.contains("name=\"contents\"")
    });

    if let Err(denied) = authorize(&state, &headers) {
        return denied;
    }
    if !well_formed {
        state.rejected.fetch_add(1, Ordering::SeqCst);
        return StatusCode::BAD_REQUEST.into_response();
    }
    state.stories.fetch_add(1, Ordering::SeqCst);
    Json(json!({"id": 2})).into_response()
}

/// Start the mock target and return its base URL
pub async fn spawn_mock(behavior: MockBehavior) -> (String, MockState) {
    let state = MockState {
        behavior: Arc::new(behavior),
        ..Default::default()
    };

    let app = Router::new()
        .route("/user/login", post(login))
        .route("/feed/", get(feed))
        .route("/posts", post(create_post))
        .route("/story", post(create_story))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind mock target");
    let addr = listener.local_addr().expect("Failed to read mock address");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    (format!("http://{}", addr), state)
}

/// Run configuration aimed at a mock target
pub fn test_config(base_url: &str, vus: usize, duration: Duration, pacing: Duration) -> RunConfig {
    RunConfig {
        vus,
        duration,
        pacing,
        base_url: base_url.to_string(),
        progress_interval: None,
        ..Default::default()
    }
}

pub fn test_accounts(n: usize) -> AccountPool {
    AccountPool::from_identities((0..n).map(|i| format!("user{}@x.com", i)), "someTest")
}

/// Initialize test logging for detailed output
pub fn init_test_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "social_loadgen=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}
