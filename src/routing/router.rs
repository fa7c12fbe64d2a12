//! Public connection provider.
//!
//! # Responsibilities
//! - Build both endpoint pools and pick the initial one
//! - Own the health monitor task
//! - Delegate every `acquire_connection` to the currently active pool
//! - Tear everything down on shutdown

use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use tokio::task::JoinHandle;

use crate::config::validation::{describe_errors, validate_config, ValidationError};
use crate::config::RouterConfig;
use crate::health::{FailoverState, HealthCheckResult, HealthMonitor, HealthProbe, RouterState, Transition};
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::pool::{Connector, EndpointPool, EndpointRole, PoolError, PoolResult, PoolStatus, PooledConnection};

/// Errors raised while starting the router.
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("invalid configuration: {}", describe_errors(.0))]
    InvalidConfig(Vec<ValidationError>),
}

/// Snapshot for status pages and operators.
#[derive(Debug, Clone)]
pub struct RouterStatus {
    pub state: RouterState,
    pub primary: PoolStatus,
    pub standby: PoolStatus,
    pub last_check: Option<Arc<HealthCheckResult>>,
}

/// Active-standby connection router.
///
/// Construct once with [`Router::start`] and share by `Arc`. Must be created
/// inside a Tokio runtime.
pub struct Router<C: Connector + Clone> {
    state: Arc<FailoverState<C>>,
    monitor: Arc<HealthMonitor<C>>,
    shutdown: Shutdown,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<C: Connector + Clone> Router<C> {
    /// Build both pools, pick the initial pool and start the health monitor.
    ///
    /// The primary is probed once; the router starts on the standby when the
    /// primary is unhealthy at boot.
    pub async fn start(config: RouterConfig, connector: C) -> Result<Self, RouterError> {
        validate_config(&config).map_err(RouterError::InvalidConfig)?;

        let primary = EndpointPool::new(EndpointRole::Primary, config.primary.clone(), connector.clone());
        let standby = EndpointPool::new(EndpointRole::Standby, config.standby.clone(), connector);

        let boot = HealthProbe::new(config.health_check.probe_timeout())
            .check(&primary)
            .await;
        let initial = if boot.healthy {
            tracing::info!(address = %primary.address(), "Router initialized on primary database");
            RouterState::OnPrimary
        } else {
            tracing::warn!(
                address = %standby.address(),
                reason = ?boot.failure,
                "Primary unavailable at startup, router initialized on standby database"
            );
            RouterState::OnStandby
        };
        metrics::set_active_endpoint(initial.active_role());

        let state = Arc::new(FailoverState::new(primary, standby, initial));
        let monitor = Arc::new(HealthMonitor::new(state.clone(), config.health_check.clone()));
        monitor.record_result(boot);

        let shutdown = Shutdown::new();
        let task = tokio::spawn(monitor.clone().run(shutdown.subscribe()));

        Ok(Self {
            state,
            monitor,
            shutdown,
            task: Mutex::new(Some(task)),
        })
    }

    /// Check out a connection from whichever pool is active right now.
    ///
    /// No retries and no fallback: a failure of the active pool is returned
    /// as is. After shutdown this fails with `PoolClosed`.
    pub async fn acquire_connection(&self) -> PoolResult<PooledConnection<C>> {
        self.state.current().acquire().await
    }

    /// True while traffic is served by the standby.
    pub fn is_on_standby(&self) -> bool {
        self.state.state() == RouterState::OnStandby
    }

    pub fn state(&self) -> RouterState {
        self.state.state()
    }

    /// True while the background monitor task is alive.
    pub fn is_monitor_running(&self) -> bool {
        self.shutdown.receiver_count() > 0
    }

    /// The primary pool currently in use. Operators may close it to force a
    /// failover on the next cycle.
    pub fn primary_pool(&self) -> Arc<EndpointPool<C>> {
        self.state.primary()
    }

    pub fn standby_pool(&self) -> Arc<EndpointPool<C>> {
        self.state.standby()
    }

    /// The most recent primary probe, including the one taken at startup.
    pub fn last_health_check(&self) -> Option<Arc<HealthCheckResult>> {
        self.monitor.last_result()
    }

    /// Bookkeeping snapshot of one pool.
    pub fn pool_status(&self, role: EndpointRole) -> PoolStatus {
        match role {
            EndpointRole::Primary => self.state.primary().status(),
            EndpointRole::Standby => self.state.standby().status(),
        }
    }

    pub fn status(&self) -> RouterStatus {
        RouterStatus {
            state: self.state.state(),
            primary: self.state.primary().status(),
            standby: self.state.standby().status(),
            last_check: self.monitor.last_result(),
        }
    }

    /// Run one monitor cycle now, outside the schedule.
    ///
    /// After shutdown no probe is taken and the current state is reported.
    pub async fn run_health_check(&self) -> Transition {
        if self.shutdown.is_triggered() {
            return Transition::Stay(self.state.state());
        }
        self.monitor.run_cycle().await
    }

    /// Replace the primary pool with a fresh one built from the same config.
    ///
    /// The old pool is closed. If it was serving traffic the new pool takes
    /// over immediately; otherwise failback waits for the next healthy probe.
    pub async fn reopen_primary(&self) -> PoolResult<()> {
        let _writer = self.state.write_lock().await;
        if self.shutdown.is_triggered() {
            return Err(PoolError::PoolClosed);
        }

        let current = self.state.primary();
        let fresh = EndpointPool::new(
            EndpointRole::Primary,
            current.config().clone(),
            current.connector().clone(),
        );
        let old = self.state.replace_primary(fresh);
        old.close();

        tracing::info!(address = %old.address(), "Primary pool re-created");
        Ok(())
    }

    /// Stop the health monitor, then close both pools. Idempotent.
    ///
    /// Every caller returns only once both pools are closed, including
    /// callers racing a shutdown already in progress.
    pub async fn shutdown(&self) {
        if !self.shutdown.trigger() {
            // Waits out any cycle still holding the writer.
            let _writer = self.state.write_lock().await;
            self.state.close_all();
            return;
        }
        tracing::info!("Router shutting down");

        let task = self.task.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Health monitor task ended abnormally");
            }
        }

        let _writer = self.state.write_lock().await;
        self.state.close_all();
        tracing::info!("Router stopped");
    }
}

impl<C: Connector + Clone> Drop for Router<C> {
    fn drop(&mut self) {
        self.shutdown.trigger();
        if let Some(task) = self.task.lock().unwrap_or_else(PoisonError::into_inner).take() {
            task.abort();
        }
        // No-op when `shutdown` already ran to completion.
        self.state.close_all();
    }
}

impl<C: Connector + Clone> std::fmt::Debug for Router<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("state", &self.state)
            .field("stopped", &self.shutdown.is_triggered())
            .field("monitor_running", &self.is_monitor_running())
            .finish()
    }
}
