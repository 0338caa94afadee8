//! Response checks and the timed HTTP exchange every call goes through

use std::time::{Duration, Instant};

use reqwest::RequestBuilder;
use reqwest::header::HeaderMap;
use thiserror::Error;
use tracing::debug;

use crate::config::HttpConfig;

pub const CHECK_STATUS: &str = "status is 200";
pub const CHECK_LATENCY: &str = "response time < 5s";
pub const CHECK_BODY: &str = "response body is not empty";
/// Login-only check: the response carried a usable session token
pub const CHECK_TOKEN: &str = "token is present";

/// Transport-level failure of a single call
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("network error: {0}")]
    Network(String),
}

impl RequestError {
    fn from_reqwest(err: reqwest::Error, elapsed: Duration) -> Self {
        if err.is_timeout() {
            RequestError::Timeout(elapsed)
        } else {
            RequestError::Network(err.to_string())
        }
    }
}

/// Outcome of a single check
#[derive(Debug, Clone, PartialEq)]
pub struct CheckResult {
    pub name: &'static str,
    pub passed: bool,
    /// Measured value the check was evaluated against, if any
    pub value: Option<f64>,
}

impl CheckResult {
    pub fn new(name: &'static str, passed: bool, value: Option<f64>) -> Self {
        Self {
            name,
            passed,
            value,
        }
    }
}

/// Thresholds every response is checked against
#[derive(Debug, Clone, Copy)]
pub struct CheckPolicy {
    pub expected_status: u16,
    pub latency_ceiling: Duration,
}

impl Default for CheckPolicy {
    fn default() -> Self {
        Self::from(&HttpConfig::default())
    }
}

impl From<&HttpConfig> for CheckPolicy {
    fn from(config: &HttpConfig) -> Self {
        Self {
            expected_status: config.expected_status,
            latency_ceiling: config.latency_ceiling,
        }
    }
}

impl CheckPolicy {
    /// Evaluate the three standard checks against a received response
    pub fn evaluate(&self, status: u16, latency: Duration, body_len: usize) -> Vec<CheckResult> {
        vec![
            CheckResult::new(
                CHECK_STATUS,
                status == self.expected_status,
                Some(f64::from(status)),
            ),
            CheckResult::new(
                CHECK_LATENCY,
                latency < self.latency_ceiling,
                Some(latency.as_secs_f64() * 1000.0),
            ),
            CheckResult::new(CHECK_BODY, body_len > 0, Some(body_len as f64)),
        ]
    }

    /// Checks recorded when no response was received at all
    pub fn failed(&self, latency: Duration) -> Vec<CheckResult> {
        vec![
            CheckResult::new(CHECK_STATUS, false, None),
            CheckResult::new(
                CHECK_LATENCY,
                false,
                Some(latency.as_secs_f64() * 1000.0),
            ),
            CheckResult::new(CHECK_BODY, false, None),
        ]
    }
}

/// Everything measured about one HTTP call
#[derive(Debug)]
pub struct CallOutcome {
    pub checks: Vec<CheckResult>,
    pub latency: Duration,
    /// Response status, `None` when the call failed at the transport level
    pub status: Option<u16>,
    pub error: Option<RequestError>,
}

impl CallOutcome {
    pub fn all_passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    pub fn is_success_status(&self) -> bool {
        self.status.is_some_and(|s| (200..300).contains(&s))
    }
}

/// A completed call plus the response headers when there was a response
#[derive(Debug)]
pub struct Exchange {
    pub outcome: CallOutcome,
    pub headers: Option<HeaderMap>,
}

/// Send `request`, read the full body, and evaluate the checks.
///
/// Latency covers sending the request through reading the last body byte.
pub async fn perform(request: RequestBuilder, policy: &CheckPolicy) -> Exchange {
    let start = Instant::now();

    let response = match request.send().await {
        Ok(response) => response,
        Err(e) => {
            let latency = start.elapsed();
            debug!("Request failed after {:?}: {}", latency, e);
            return Exchange {
                outcome: CallOutcome {
                    checks: policy.failed(latency),
                    latency,
                    status: None,
                    error: Some(RequestError::from_reqwest(e, latency)),
                },
                headers: None,
            };
        }
    };

    let status = response.status().as_u16();
    let headers = response.headers().clone();

    match response.bytes().await {
        Ok(body) => {
            let latency = start.elapsed();
            Exchange {
                outcome: CallOutcome {
                    checks: policy.evaluate(status, latency, body.len()),
                    latency,
                    status: Some(status),
                    error: None,
                },
                headers: Some(headers),
            }
        }
        Err(e) => {
            // Status arrived but the body did not
            let latency = start.elapsed();
            debug!("Reading body failed after {:?}: {}", latency, e);
            let mut checks = policy.evaluate(status, latency, 0);
            if let Some(latency_check) = checks.iter_mut().find(|c| c.name == CHECK_LATENCY) {
                latency_check.passed = false;
            }
            Exchange {
                outcome: CallOutcome {
                    checks,
                    latency,
                    status: Some(status),
                    error: Some(RequestError::from_reqwest(e, latency)),
                },
                headers: Some(headers),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluate_all_pass() {
        let policy = CheckPolicy::default();
        let checks = policy.evaluate(200, Duration::from_millis(120), 17);
        assert_eq!(checks.len(), 3);
        assert!(checks.iter().all(|c| c.passed));
        assert_eq!(checks[0].value, Some(200.0));
        assert_eq!(checks[2].value, Some(17.0));
    }

    #[test]
    fn test_evaluate_each_failure() {
        let policy = CheckPolicy::default();

        let wrong_status = policy.evaluate(201, Duration::from_millis(1), 1);
        assert!(!wrong_status[0].passed);
        assert!(wrong_status[1].passed);

        // The ceiling itself is a violation
        let slow = policy.evaluate(200, Duration::from_millis(5000), 1);
        assert!(!slow[1].passed);
        assert_eq!(slow[1].value, Some(5000.0));

        let empty = policy.evaluate(200, Duration::from_millis(1), 0);
        assert!(!empty[2].passed);
    }

    #[test]
    fn test_failed_checks_all_fail() {
        let checks = CheckPolicy::default().failed(Duration::from_millis(3));
        let names: Vec<_> = checks.iter().map(|c| c.name).collect();
        assert_eq!(names, vec![CHECK_STATUS, CHECK_LATENCY, CHECK_BODY]);
        assert!(checks.iter().all(|c| !c.passed));
    }

    #[test]
    fn test_policy_from_config() {
        let config = HttpConfig {
            latency_ceiling: Duration::from_millis(50),
            ..Default::default()
        };
        let policy = CheckPolicy::from(&config);
        assert!(!policy.evaluate(200, Duration::from_millis(60), 1)[1].passed);
    }
}
