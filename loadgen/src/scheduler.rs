//! Virtual user scheduler
//!
//! Spawns one tokio task per virtual user. Each task loops
//! authenticate → select → execute → pace until the run is stopped, either
//! by the duration elapsing or by an external stop future. Stopping never
//! aborts a request: the flag is only observed between iterations and during
//! pacing, so an in-flight iteration always completes before its task exits.
//! A stop that lands during ramp-up also cancels the VUs not yet started.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::join_all;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::accounts::AccountPool;
use crate::config::RunConfig;
use crate::error::StartupError;
use crate::metrics::{ErrorKind, MetricsAggregator};
use crate::scenario::ScenarioSelector;
use crate::session::{Session, SessionClient};
use crate::target::Target;

/// Lifecycle of one virtual user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VuState {
    Idle,
    Authenticating,
    Executing,
    Pacing,
    Terminated,
}

/// What a virtual user did during the run
#[derive(Debug, Clone)]
pub struct VuSummary {
    pub id: usize,
    pub iterations: u64,
    pub scenarios_run: u64,
    pub final_state: VuState,
}

impl VuSummary {
    fn never_started(id: usize) -> Self {
        Self {
            id,
            iterations: 0,
            scenarios_run: 0,
            final_state: VuState::Terminated,
        }
    }
}

/// Result of a completed run
#[derive(Debug)]
pub struct RunOutcome {
    pub elapsed: Duration,
    pub vus: Vec<VuSummary>,
}

impl RunOutcome {
    pub fn total_iterations(&self) -> u64 {
        self.vus.iter().map(|vu| vu.iterations).sum()
    }
}

/// Read-only state shared by every virtual user task
struct Shared {
    config: Arc<RunConfig>,
    accounts: AccountPool,
    selector: Arc<ScenarioSelector>,
    target: Target,
    sessions: SessionClient,
    metrics: Arc<MetricsAggregator>,
}

pub struct Scheduler {
    shared: Arc<Shared>,
}

impl Scheduler {
    /// Validate every startup input; nothing is spawned until `run`
    pub fn new(
        config: Arc<RunConfig>,
        accounts: AccountPool,
        selector: ScenarioSelector,
        metrics: Arc<MetricsAggregator>,
    ) -> Result<Self, StartupError> {
        config.validate()?;
        if accounts.is_empty() {
            return Err(StartupError::EmptyAccountPool);
        }

        let target = Target::from_config(&config)?;
        let sessions = SessionClient::new(target.clone());

        Ok(Self {
            shared: Arc::new(Shared {
                config,
                accounts,
                selector: Arc::new(selector),
                target,
                sessions,
                metrics,
            }),
        })
    }

    pub fn metrics(&self) -> &Arc<MetricsAggregator> {
        &self.shared.metrics
    }

    /// Run for the configured duration
    pub async fn run(self) -> RunOutcome {
        self.run_until(std::future::pending::<()>()).await
    }

    /// Run for the configured duration or until `stop` resolves
    pub async fn run_until<F>(self, stop: F) -> RunOutcome
    where
        F: Future<Output = ()>,
    {
        let config = self.shared.config.clone();
        let start = Instant::now();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        info!(
            "Starting {} virtual users for {:?} against {}",
            config.vus, config.duration, config.base_url
        );

        let progress = config.progress_interval.map(|every| {
            let metrics = self.shared.metrics.clone();
            let mut shutdown = shutdown_rx.clone();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(every);
                ticker.tick().await;
                loop {
                    tokio::select! {
                        _ = ticker.tick() => {
                            info!(
                                "Progress: {} iterations, {} scenarios executed, {:.0}s elapsed",
                                metrics.iterations(),
                                metrics.scenario_executions(),
                                metrics.elapsed().as_secs_f64()
                            );
                        }
                        _ = shutdown.changed() => break,
                    }
                }
            })
        });

        let deadline = tokio::time::Instant::from_std(start) + config.duration;
        tokio::pin!(stop);
        let mut stop_requested = false;

        let mut handles = Vec::with_capacity(config.vus);
        for vu_id in 1..=config.vus {
            let shared = self.shared.clone();
            let shutdown = shutdown_rx.clone();
            handles.push(tokio::spawn(run_virtual_user(vu_id, shared, shutdown)));

            // Staggered start; all VUs start at once when ramp-up is zero
            if config.ramp_up.is_zero() || vu_id == config.vus {
                continue;
            }
            tokio::select! {
                _ = tokio::time::sleep(config.ramp_up) => {}
                _ = tokio::time::sleep_until(deadline) => {
                    info!(
                        "Run duration elapsed during ramp-up, {} of {} virtual users started",
                        vu_id, config.vus
                    );
                    break;
                }
                _ = &mut stop => {
                    info!(
                        "Stop requested during ramp-up, {} of {} virtual users started",
                        vu_id, config.vus
                    );
                    stop_requested = true;
                    break;
                }
            }
        }

        if !stop_requested {
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => {
                    info!("Run duration elapsed, draining virtual users");
                }
                _ = &mut stop => {
                    info!("Stop requested, draining virtual users");
                }
            }
        }
        let _ = shutdown_tx.send(true);

        let started = handles.len();
        let mut vus = Vec::with_capacity(config.vus);
        for (idx, result) in join_all(handles).await.into_iter().enumerate() {
            match result {
                Ok(summary) => vus.push(summary),
                Err(e) => warn!("Virtual user {} task failed: {}", idx + 1, e),
            }
        }
        // VUs cut off by the ramp-up never left Idle
        vus.extend((started + 1..=config.vus).map(VuSummary::never_started));

        if let Some(handle) = progress {
            let _ = handle.await;
        }

        let elapsed = start.elapsed();
        info!(
            "Run finished after {:.1}s: {} iterations across {} virtual users",
            elapsed.as_secs_f64(),
            vus.iter().map(|vu| vu.iterations).sum::<u64>(),
            vus.len()
        );

        RunOutcome { elapsed, vus }
    }
}

struct VirtualUser {
    id: usize,
    state: VuState,
    rng: ChaCha8Rng,
    session: Option<Session>,
    iterations: u64,
    scenarios_run: u64,
}

impl VirtualUser {
    fn new(id: usize, seed: u64) -> Self {
        Self {
            id,
            state: VuState::Idle,
            rng: ChaCha8Rng::seed_from_u64(seed.wrapping_add(id as u64)),
            session: None,
            iterations: 0,
            scenarios_run: 0,
        }
    }

    fn transition(&mut self, next: VuState) {
        debug!("vu {}: {:?} -> {:?}", self.id, self.state, next);
        self.state = next;
    }

    fn summary(&self) -> VuSummary {
        VuSummary {
            id: self.id,
            iterations: self.iterations,
            scenarios_run: self.scenarios_run,
            final_state: self.state,
        }
    }
}

async fn run_virtual_user(
    id: usize,
    shared: Arc<Shared>,
    mut shutdown: watch::Receiver<bool>,
) -> VuSummary {
    let mut vu = VirtualUser::new(id, shared.config.seed);

    while !*shutdown.borrow() {
        run_iteration(&mut vu, &shared).await;

        vu.transition(VuState::Pacing);
        tokio::select! {
            _ = tokio::time::sleep(shared.config.pacing) => {}
            // Sender dropped or stop flag raised
            _ = shutdown.changed() => break,
        }
    }

    vu.transition(VuState::Idle);
    vu.transition(VuState::Terminated);
    vu.summary()
}

async fn run_iteration(vu: &mut VirtualUser, shared: &Shared) {
    vu.iterations += 1;
    shared.metrics.record_iteration();

    vu.transition(VuState::Authenticating);
    let session = match vu.session.take() {
        Some(session) => session,
        None => {
            let Some(account) = shared.accounts.account_for(vu.id) else {
                return;
            };
            let attempt = shared.sessions.authenticate(account).await;
            shared
                .metrics
                .record_login(&attempt.checks, attempt.latency, attempt.result.is_ok());

            match attempt.result {
                Ok(session) => session,
                Err(e) => {
                    shared.metrics.record_error(ErrorKind::from(&e));
                    debug!("vu {}: skipping scenario, {}", vu.id, e);
                    return;
                }
            }
        }
    };

    vu.transition(VuState::Executing);
    let scenario = shared.selector.pick(&mut vu.rng);
    let outcome = scenario.execute(&shared.target, &session).await;
    vu.scenarios_run += 1;

    shared
        .metrics
        .record(scenario.name(), &outcome.checks, outcome.latency);
    if let Some(ref e) = outcome.error {
        shared.metrics.record_error(ErrorKind::from(e));
        debug!("vu {}: {} failed: {}", vu.id, scenario.name(), e);
    }

    // A token the target refuses is dropped; the next iteration logs in again
    if shared.config.reuse_session && !session_rejected(outcome.status) {
        vu.session = Some(session);
    }
}

fn session_rejected(status: Option<u16>) -> bool {
    matches!(status, Some(401 | 403))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Arc<RunConfig> {
        Arc::new(RunConfig {
            vus: 2,
            duration: Duration::from_millis(50),
            base_url: "http://127.0.0.1:9".to_string(),
            ..Default::default()
        })
    }

    #[test]
    fn test_empty_pool_rejected() {
        let err = Scheduler::new(
            config(),
            AccountPool::new(Vec::new()),
            ScenarioSelector::standard().unwrap(),
            Arc::new(MetricsAggregator::new()),
        )
        .err()
        .unwrap();
        assert!(matches!(err, StartupError::EmptyAccountPool));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let bad = Arc::new(RunConfig {
            vus: 0,
            ..Default::default()
        });
        let err = Scheduler::new(
            bad,
            AccountPool::from_identities(["a@x.com"], "pw"),
            ScenarioSelector::standard().unwrap(),
            Arc::new(MetricsAggregator::new()),
        )
        .err()
        .unwrap();
        assert!(matches!(err, StartupError::InvalidConfig(_)));
    }

    #[test]
    fn test_refused_session_is_not_cached() {
        assert!(session_rejected(Some(401)));
        assert!(session_rejected(Some(403)));
        assert!(!session_rejected(Some(200)));
        assert!(!session_rejected(Some(500)));
        // Transport failures say nothing about the token
        assert!(!session_rejected(None));
    }

    #[test]
    fn test_vu_rng_streams_differ_per_vu() {
        use rand::Rng;
        let mut a = VirtualUser::new(1, 99);
        let mut b = VirtualUser::new(2, 99);
        let xs: Vec<f64> = (0..4).map(|_| a.rng.random()).collect();
        let ys: Vec<f64> = (0..4).map(|_| b.rng.random()).collect();
        assert_ne!(xs, ys);
    }

    #[tokio::test]
    async fn test_unreachable_target_records_network_errors() {
        let metrics = Arc::new(MetricsAggregator::new());
        let config = Arc::new(RunConfig {
            vus: 2,
            duration: Duration::from_millis(200),
            pacing: Duration::from_millis(20),
            // Port 9 (discard) is closed on test machines
            base_url: "http://127.0.0.1:9".to_string(),
            http: crate::config::HttpConfig {
                request_timeout: Duration::from_secs(2),
                ..Default::default()
            },
            progress_interval: None,
            ..Default::default()
        });
        let scheduler = Scheduler::new(
            config,
            AccountPool::from_identities(["a@x.com"], "pw"),
            ScenarioSelector::standard().unwrap(),
            metrics.clone(),
        )
        .unwrap();

        let outcome = scheduler.run().await;
        let snap = metrics.snapshot();

        assert_eq!(outcome.vus.len(), 2);
        assert!(
            outcome
                .vus
                .iter()
                .all(|vu| vu.final_state == VuState::Terminated)
        );
        assert_eq!(snap.iterations, outcome.total_iterations());
        assert_eq!(snap.scenario_executions, 0);
        assert_eq!(snap.login_failures, snap.iterations);
        assert_eq!(
            snap.errors.network + snap.errors.timeout,
            snap.iterations
        );
    }
}
