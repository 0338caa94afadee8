use std::sync::Arc;

use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use social_loadgen::report;
use social_loadgen::{
    AccountPool, MetricsAggregator, RunConfig, ScenarioSelector, Scheduler, StartupError,
};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;

use cli::{Cli, Command, RunArgs};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run(args) => run(args).await,
    }
}

async fn run(args: RunArgs) -> anyhow::Result<()> {
    // Initialize tracing
    let default_filter = if args.verbose {
        "social_loadgen=debug"
    } else {
        "social_loadgen=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Environment first, flags on top
    let mut config = RunConfig::from_env();
    args.apply(&mut config);
    config.validate()?;
    info!(
        "Loaded configuration: base_url={}, vus={}, duration={:?}, pacing={:?}",
        config.base_url, config.vus, config.duration, config.pacing
    );

    if let Some(addr) = args.prometheus_listen {
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()?;
        info!("Prometheus metrics exposed on http://{}/metrics", addr);
    }

    let accounts = AccountPool::load(&config.accounts.path, &config.accounts.password)
        .map_err(StartupError::from)?;
    let selector = ScenarioSelector::standard().map_err(StartupError::from)?;
    let metrics = Arc::new(MetricsAggregator::new());
    let config = Arc::new(config);

    let scheduler = Scheduler::new(config.clone(), accounts, selector, metrics.clone())?;

    let stop = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };
    let outcome = scheduler.run_until(stop).await;
    info!(
        "{} virtual users completed {} iterations",
        outcome.vus.len(),
        outcome.total_iterations()
    );

    // Reporting problems never change the exit code of a finished run
    let snapshot = metrics.snapshot();
    match report::render(&snapshot, &config) {
        Ok(rendered) => {
            report::print_summary(&rendered.run, &snapshot);
            if let Err(e) = rendered.write_to(&config.report_dir) {
                error!("{}", e);
            }
        }
        Err(e) => error!("{}", e),
    }

    Ok(())
}
