//! Session client: exchanges an account for a session token

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::accounts::Account;
use crate::checks::{CHECK_TOKEN, CheckResult, RequestError, perform};
use crate::target::{TOKEN_HEADER, Target};

pub const LOGIN_PATH: &str = "/user/login";

/// Why a login did not yield a session
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("login rejected with status {status}")]
    Rejected { status: u16 },

    #[error("login succeeded but the X-Token header is missing")]
    TokenMissing,

    #[error(transparent)]
    Request(#[from] RequestError),
}

/// Token owned by a single virtual user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    token: String,
}

impl Session {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

/// Result of one login call, with the measurements taken on the way
#[derive(Debug)]
pub struct LoginAttempt {
    pub checks: Vec<CheckResult>,
    pub latency: Duration,
    pub result: Result<Session, AuthError>,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    identity: &'a str,
    password: &'a str,
}

#[derive(Debug, Clone)]
pub struct SessionClient {
    target: Target,
}

impl SessionClient {
    pub fn new(target: Target) -> Self {
        Self { target }
    }

    /// Log `account` in and extract the session token
    pub async fn authenticate(&self, account: &Account) -> LoginAttempt {
        let request = self
            .target
            .client()
            .post(self.target.url(LOGIN_PATH))
            .json(&LoginRequest {
                identity: &account.identity,
                password: &account.password,
            });

        let exchange = perform(request, self.target.policy()).await;
        let mut outcome = exchange.outcome;

        let result = if let Some(err) = outcome.error.take() {
            Err(AuthError::from(err))
        } else if !outcome.is_success_status() {
            Err(AuthError::Rejected {
                status: outcome.status.unwrap_or_default(),
            })
        } else {
            exchange
                .headers
                .as_ref()
                .and_then(|h| h.get(TOKEN_HEADER))
                .and_then(|v| v.to_str().ok())
                .filter(|t| !t.is_empty())
                .map(Session::new)
                .ok_or(AuthError::TokenMissing)
        };

        if let Err(ref e) = result {
            debug!("Login for {} failed: {}", account.identity, e);
        }

        // Every failed login shows up as a failed check, even on a clean 200
        outcome
            .checks
            .push(CheckResult::new(CHECK_TOKEN, result.is_ok(), None));

        LoginAttempt {
            checks: outcome.checks,
            latency: outcome.latency,
            result,
        }
    }
}
