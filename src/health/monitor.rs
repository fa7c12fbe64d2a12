//! Active health monitoring and failover policy.
//!
//! # Responsibilities
//! - Periodically probe the primary (never the standby)
//! - Decide failover / failback from the probe result
//! - Swap the active pool and report every transition

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use tokio::sync::broadcast;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::config::HealthCheckConfig;
use crate::health::probe::{HealthCheckResult, HealthProbe};
use crate::health::state::{FailoverState, RouterState, Transition};
use crate::observability::metrics;
use crate::pool::Connector;

pub struct HealthMonitor<C: Connector> {
    state: Arc<FailoverState<C>>,
    probe: HealthProbe,
    config: HealthCheckConfig,
    consecutive_failures: AtomicU64,
    consecutive_successes: AtomicU64,
    last_result: ArcSwapOption<HealthCheckResult>,
}

impl<C: Connector> HealthMonitor<C> {
    pub fn new(state: Arc<FailoverState<C>>, config: HealthCheckConfig) -> Self {
        Self {
            state,
            probe: HealthProbe::new(config.probe_timeout()),
            config,
            consecutive_failures: AtomicU64::new(0),
            consecutive_successes: AtomicU64::new(0),
            last_result: ArcSwapOption::empty(),
        }
    }

    /// Run cycles on the configured interval until shutdown is signalled.
    ///
    /// The first cycle runs one interval after start. A cycle in flight when
    /// shutdown arrives is allowed to finish.
    pub async fn run(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval_secs = self.config.interval_secs,
            probe_timeout_ms = self.config.probe_timeout_ms,
            "Health monitor starting"
        );

        let interval = self.config.interval();
        let mut ticker = time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
                _ = ticker.tick() => {
                    self.run_cycle().await;
                }
            }
        }
    }

    /// Probe the primary once and apply the failover policy.
    ///
    /// A cycle that gets the writer after the pools were torn down does
    /// nothing and reports the current state.
    pub async fn run_cycle(&self) -> Transition {
        let _writer = self.state.write_lock().await;
        if self.state.is_torn_down() {
            tracing::debug!("Pools already closed, skipping health check");
            return Transition::Stay(self.state.state());
        }

        let primary = self.state.primary();
        let result = self.probe.check(&primary).await;

        metrics::record_probe(result.role.as_str(), result.healthy, result.latency);
        if let Some(failure) = &result.failure {
            metrics::record_probe_failure(failure.as_label());
            tracing::warn!(
                address = %primary.address(),
                reason = %failure,
                latency_ms = result.latency.as_millis() as u64,
                "Primary health check failed"
            );
        }

        let current = self.state.state();
        let transition = self.decide(current, result.healthy);

        match transition {
            Transition::Failover => {
                tracing::warn!(
                    primary = %primary.address(),
                    standby = %self.state.standby().address(),
                    "Primary database down, switching to standby"
                );
                self.state.activate(RouterState::OnStandby);
            }
            Transition::Failback => {
                tracing::info!(
                    primary = %primary.address(),
                    "Primary database recovered, switching back to primary"
                );
                self.state.activate(RouterState::OnPrimary);
            }
            Transition::Stay(state) => {
                tracing::debug!(state = %state, healthy = result.healthy, "No failover change");
            }
        }

        if transition.is_switch() {
            metrics::record_transition(current.as_str(), transition.next_state().as_str());
            metrics::set_active_endpoint(transition.next_state().active_role());
        }

        self.record_result(result);
        transition
    }

    /// Apply the transition table, held back until the configured number of
    /// consecutive results agree.
    fn decide(&self, current: RouterState, primary_healthy: bool) -> Transition {
        let proposed = current.on_probe(primary_healthy);

        let streak = if primary_healthy {
            self.consecutive_failures.store(0, Ordering::Relaxed);
            self.consecutive_successes.fetch_add(1, Ordering::Relaxed) + 1
        } else {
            self.consecutive_successes.store(0, Ordering::Relaxed);
            self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1
        };

        let threshold = match proposed {
            Transition::Failover => u64::from(self.config.failover_threshold),
            Transition::Failback => u64::from(self.config.failback_threshold),
            Transition::Stay(_) => return proposed,
        };

        if streak < threshold {
            tracing::debug!(streak, threshold, "Holding back transition");
            return Transition::Stay(current);
        }

        self.consecutive_failures.store(0, Ordering::Relaxed);
        self.consecutive_successes.store(0, Ordering::Relaxed);
        proposed
    }

    pub(crate) fn record_result(&self, result: HealthCheckResult) {
        self.last_result.store(Some(Arc::new(result)));
    }

    /// The most recent probe result, if any probe has run.
    pub fn last_result(&self) -> Option<Arc<HealthCheckResult>> {
        self.last_result.load_full()
    }

    pub fn probe(&self) -> &HealthProbe {
        &self.probe
    }
}
