//! Run configuration
//!
//! Configuration is loaded from environment variables and may be overridden by
//! command line flags. Once a run starts the configuration is immutable and
//! shared behind an `Arc`.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::StartupError;

/// Base URL used when `BASE_URL` is not set
pub const DEFAULT_BASE_URL: &str = "https://api-dev.alemx.com";

/// Password shared by every test account
pub const DEFAULT_ACCOUNT_PASSWORD: &str = "someTest";

/// Full configuration of a load run
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Number of concurrent virtual users
    pub vus: usize,
    /// Wall-clock duration of the run
    pub duration: Duration,
    /// Target service base URL (no trailing slash)
    pub base_url: String,
    /// Sleep between two iterations of the same virtual user
    pub pacing: Duration,
    /// Delay between starting two consecutive virtual users
    pub ramp_up: Duration,

    /// Account supply
    pub accounts: AccountsConfig,

    /// Check thresholds and HTTP client settings
    pub http: HttpConfig,

    /// Keep one session per virtual user for the whole run
    pub reuse_session: bool,
    /// Seed for scenario selection; each VU derives its own stream from it
    pub seed: u64,

    /// Directory receiving `summary.html` and `summary.json`
    pub report_dir: PathBuf,
    /// Interval for progress log lines, disabled when `None`
    pub progress_interval: Option<Duration>,
}

/// Account supply configuration
#[derive(Debug, Clone)]
pub struct AccountsConfig {
    /// CSV file with a header line and one identity per row
    pub path: PathBuf,
    /// Password used for every account
    pub password: String,
}

/// HTTP client and check configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Network-level timeout of a single request
    pub request_timeout: Duration,
    /// Responses at or above this latency fail the latency check
    pub latency_ceiling: Duration,
    /// Status code every call is expected to return
    pub expected_status: u16,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            vus: 100,
            duration: Duration::from_secs(60),
            base_url: DEFAULT_BASE_URL.to_string(),
            pacing: Duration::from_secs(1),
            ramp_up: Duration::ZERO,
            accounts: AccountsConfig::default(),
            http: HttpConfig::default(),
            reuse_session: false,
            seed: 0x5eed,
            report_dir: PathBuf::from("."),
            progress_interval: Some(Duration::from_secs(10)),
        }
    }
}

impl Default for AccountsConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/accounts.csv"),
            password: DEFAULT_ACCOUNT_PASSWORD.to_string(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(60),
            latency_ceiling: Duration::from_millis(5000),
            expected_status: 200,
        }
    }
}

impl RunConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// Unparseable values are ignored and the default is kept.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        // Run shape
        if let Some(url) = lookup("BASE_URL")
            && !url.trim().is_empty()
        {
            config.base_url = normalize_base_url(&url);
        }
        if let Some(val) = lookup("VUS")
            && let Ok(v) = val.trim().parse()
        {
            config.vus = v;
        }
        if let Some(val) = lookup("DURATION")
            && let Some(d) = parse_duration(&val)
        {
            config.duration = d;
        }
        if let Some(val) = lookup("PACING_MS")
            && let Ok(ms) = val.trim().parse::<u64>()
        {
            config.pacing = Duration::from_millis(ms);
        }
        if let Some(val) = lookup("RAMP_UP_MS")
            && let Ok(ms) = val.trim().parse::<u64>()
        {
            config.ramp_up = Duration::from_millis(ms);
        }

        // Accounts
        if let Some(path) = lookup("ACCOUNTS_FILE")
            && !path.is_empty()
        {
            config.accounts.path = PathBuf::from(path);
        }
        if let Some(password) = lookup("ACCOUNT_PASSWORD") {
            config.accounts.password = password;
        }

        // HTTP
        if let Some(val) = lookup("REQUEST_TIMEOUT_SECS")
            && let Ok(secs) = val.trim().parse::<u64>()
        {
            config.http.request_timeout = Duration::from_secs(secs);
        }
        if let Some(val) = lookup("LATENCY_CEILING_MS")
            && let Ok(ms) = val.trim().parse::<u64>()
        {
            config.http.latency_ceiling = Duration::from_millis(ms);
        }

        // Behavior
        if let Some(val) = lookup("REUSE_SESSION") {
            config.reuse_session = parse_bool(&val);
        }
        if let Some(val) = lookup("SEED")
            && let Ok(seed) = val.trim().parse()
        {
            config.seed = seed;
        }

        // Output
        if let Some(dir) = lookup("REPORT_DIR")
            && !dir.is_empty()
        {
            config.report_dir = PathBuf::from(dir);
        }
        if let Some(val) = lookup("PROGRESS_INTERVAL_SECS")
            && let Ok(secs) = val.trim().parse::<u64>()
        {
            config.progress_interval = (secs > 0).then(|| Duration::from_secs(secs));
        }

        config
    }

    /// Reject configurations that cannot produce a meaningful run
    pub fn validate(&self) -> Result<(), StartupError> {
        if self.vus == 0 {
            return Err(StartupError::InvalidConfig(
                "virtual user count must be at least 1".to_string(),
            ));
        }
        if self.duration.is_zero() {
            return Err(StartupError::InvalidConfig(
                "run duration must be greater than zero".to_string(),
            ));
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(StartupError::InvalidConfig(format!(
                "base URL must start with http:// or https://, got {:?}",
                self.base_url
            )));
        }
        Ok(())
    }

    /// Join an API path onto the base URL
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Strip whitespace and trailing slashes so paths can be appended directly
pub fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

/// Parse `90` (seconds), `90s`, `1m`, `500ms`, `2h` or `1m 30s` into a duration
pub fn parse_duration(input: &str) -> Option<Duration> {
    let s = input.trim();
    if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
        return s.parse().ok().map(Duration::from_secs);
    }
    humantime::parse_duration(s).ok()
}

fn parse_bool(val: &str) -> bool {
    val.to_lowercase() == "true" || val == "1"
}
