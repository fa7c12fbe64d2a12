//! Bounded-time liveness probe.
//!
//! # Responsibilities
//! - Acquire a connection from a pool and run one liveness round-trip
//! - Enforce an overall deadline
//! - Fold every failure into `healthy = false`, keeping the reason aside
//!
//! # Design Decisions
//! - The probe runs in its own task so a panicking driver cannot take the
//!   monitor loop down with it
//! - The reason is diagnostic only; control flow uses the bool

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use thiserror::Error;
use tokio::time;

use crate::pool::{Connector, EndpointPool, EndpointRole, PoolError};

/// Why a probe came back unhealthy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeFailure {
    #[error("pool closed")]
    PoolClosed,

    #[error("endpoint unavailable: {0}")]
    Unavailable(String),

    #[error("liveness round-trip timed out")]
    ValidationTimeout,

    #[error("liveness round-trip failed")]
    Invalid,

    #[error("probe did not finish within {0} ms")]
    Timeout(u64),

    #[error("probe task panicked")]
    Panicked,
}

impl ProbeFailure {
    /// Stable label for metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ProbeFailure::PoolClosed => "pool_closed",
            ProbeFailure::Unavailable(_) => "unavailable",
            ProbeFailure::ValidationTimeout => "validation_timeout",
            ProbeFailure::Invalid => "invalid",
            ProbeFailure::Timeout(_) => "timeout",
            ProbeFailure::Panicked => "panicked",
        }
    }
}

impl From<PoolError> for ProbeFailure {
    fn from(err: PoolError) -> Self {
        match err {
            PoolError::PoolClosed => ProbeFailure::PoolClosed,
            PoolError::ConnectionUnavailable(reason) => ProbeFailure::Unavailable(reason),
        }
    }
}

/// Outcome of one probe.
#[derive(Debug, Clone)]
pub struct HealthCheckResult {
    pub role: EndpointRole,
    pub healthy: bool,
    /// Wall-clock time the result was computed at.
    pub checked_at: SystemTime,
    pub latency: Duration,
    /// Set when `healthy` is false.
    pub failure: Option<ProbeFailure>,
}

/// Probe with a fixed overall deadline.
#[derive(Debug, Clone, Copy)]
pub struct HealthProbe {
    timeout: Duration,
}

impl HealthProbe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Probe `pool`. Never fails and never outlives the deadline.
    pub async fn check<C: Connector>(&self, pool: &Arc<EndpointPool<C>>) -> HealthCheckResult {
        let started = Instant::now();
        let task_pool = pool.clone();
        let mut task = tokio::spawn(async move { task_pool.validate().await });

        let outcome = match time::timeout(self.timeout, &mut task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) if join_err.is_panic() => Err(ProbeFailure::Panicked),
            Ok(Err(_)) => Err(ProbeFailure::Timeout(self.timeout.as_millis() as u64)),
            Err(_) => {
                task.abort();
                Err(ProbeFailure::Timeout(self.timeout.as_millis() as u64))
            }
        };

        HealthCheckResult {
            role: pool.role(),
            healthy: outcome.is_ok(),
            checked_at: SystemTime::now(),
            latency: started.elapsed(),
            failure: outcome.err(),
        }
    }
}
