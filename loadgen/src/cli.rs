use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use social_loadgen::config::{RunConfig, normalize_base_url, parse_duration};

/// Virtual-user load generator for the social feed API
#[derive(Parser, Debug)]
#[command(name = "social-loadgen")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the weighted scenario mix (environment values apply, flags override them)
    Run(RunArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Number of concurrent virtual users
    #[arg(long)]
    pub vus: Option<usize>,

    /// Run duration, e.g. 90, 30s, 1m, 2h
    #[arg(long, value_parser = parse_duration_arg)]
    pub duration: Option<Duration>,

    /// Target service base URL
    #[arg(long)]
    pub base_url: Option<String>,

    /// Pause between iterations of one virtual user, in milliseconds
    #[arg(long)]
    pub pacing_ms: Option<u64>,

    /// Delay between starting consecutive virtual users, in milliseconds
    #[arg(long)]
    pub ramp_up_ms: Option<u64>,

    /// CSV file with one account identity per row after a header line
    #[arg(long)]
    pub accounts: Option<PathBuf>,

    /// Seed for scenario selection
    #[arg(long)]
    pub seed: Option<u64>,

    /// Keep one session per virtual user instead of logging in every iteration
    #[arg(long)]
    pub reuse_session: bool,

    /// Directory for summary.html and summary.json
    #[arg(long)]
    pub report_dir: Option<PathBuf>,

    /// Expose live Prometheus metrics on this address during the run
    #[arg(long)]
    pub prometheus_listen: Option<SocketAddr>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl RunArgs {
    /// Apply flags on top of the environment-derived configuration
    pub fn apply(&self, config: &mut RunConfig) {
        if let Some(vus) = self.vus {
            config.vus = vus;
        }
        if let Some(duration) = self.duration {
            config.duration = duration;
        }
        if let Some(ref url) = self.base_url {
            config.base_url = normalize_base_url(url);
        }
        if let Some(ms) = self.pacing_ms {
            config.pacing = Duration::from_millis(ms);
        }
        if let Some(ms) = self.ramp_up_ms {
            config.ramp_up = Duration::from_millis(ms);
        }
        if let Some(ref path) = self.accounts {
            config.accounts.path = path.clone();
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if self.reuse_session {
            config.reuse_session = true;
        }
        if let Some(ref dir) = self.report_dir {
            config.report_dir = dir.clone();
        }
    }
}

fn parse_duration_arg(s: &str) -> Result<Duration, String> {
    parse_duration(s).ok_or_else(|| format!("invalid duration {:?}, expected e.g. 30s or 1m", s))
}
