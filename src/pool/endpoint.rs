//! Connection pool for a single database endpoint.
//!
//! # Responsibilities
//! - Hand out physical connections, up to `max_connections` at once
//! - Reuse idle connections, validating ones that sat unused for a while
//! - Probe endpoint liveness
//! - Tear everything down on close, permanently
//!
//! # Saturation Policy
//! When every slot is checked out, `acquire` waits for a free slot for at most
//! `connect_timeout`, then fails with `ConnectionUnavailable`.
//!
//! `connect_timeout` bounds the whole call: waiting for a slot, validating
//! stale idle connections and opening a new one all share one deadline.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tokio::time;

use crate::config::EndpointConfig;
use crate::health::probe::ProbeFailure;
use crate::observability::metrics;
use crate::pool::connection::PooledConnection;
use crate::pool::connector::Connector;
use crate::pool::types::{EndpointRole, PoolError, PoolResult, PoolStatus};

/// Idle connections returned more recently than this are handed out without
/// a liveness round-trip.
const VALIDATION_BYPASS: Duration = Duration::from_millis(500);

struct IdleConnection<T> {
    conn: T,
    created_at: Instant,
    returned_at: Instant,
}

/// A bounded pool of physical connections to one endpoint.
pub struct EndpointPool<C: Connector> {
    role: EndpointRole,
    config: EndpointConfig,
    connector: C,
    /// One permit per connection that may be checked out.
    slots: Arc<Semaphore>,
    /// LIFO stack of parked connections.
    idle: Mutex<Vec<IdleConnection<C::Connection>>>,
    closed: AtomicBool,
    connections_created: AtomicU64,
    acquisitions: AtomicU64,
    exhausted_count: AtomicU64,
}

impl<C: Connector> EndpointPool<C> {
    /// Create an empty pool. Connections are opened lazily on `acquire`.
    pub fn new(role: EndpointRole, config: EndpointConfig, connector: C) -> Arc<Self> {
        let max = config.max_connections.min(Semaphore::MAX_PERMITS);
        tracing::debug!(
            role = %role,
            address = %config.address,
            max_connections = max,
            "Endpoint pool created"
        );
        Arc::new(Self {
            role,
            slots: Arc::new(Semaphore::new(max)),
            idle: Mutex::new(Vec::new()),
            config,
            connector,
            closed: AtomicBool::new(false),
            connections_created: AtomicU64::new(0),
            acquisitions: AtomicU64::new(0),
            exhausted_count: AtomicU64::new(0),
        })
    }

    pub fn role(&self) -> EndpointRole {
        self.role
    }

    pub fn address(&self) -> &str {
        &self.config.address
    }

    pub fn config(&self) -> &EndpointConfig {
        &self.config
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Check out a connection.
    ///
    /// Fails with `PoolClosed` once the pool is closed, including when the
    /// close races with this call, and with `ConnectionUnavailable` when the
    /// pool stays saturated or the endpoint cannot be reached within
    /// `connect_timeout`.
    pub async fn acquire(self: &Arc<Self>) -> PoolResult<PooledConnection<C>> {
        let result = self.acquire_inner().await;
        let outcome = match &result {
            Ok(_) => "ok",
            Err(PoolError::PoolClosed) => "closed",
            Err(PoolError::ConnectionUnavailable(_)) => "unavailable",
        };
        metrics::record_acquire(self.role.as_str(), outcome);
        result
    }

    async fn acquire_inner(self: &Arc<Self>) -> PoolResult<PooledConnection<C>> {
        if self.is_closed() {
            return Err(PoolError::PoolClosed);
        }

        let deadline = time::Instant::now() + self.config.connect_timeout();
        let permit = match time::timeout_at(deadline, self.slots.clone().acquire_owned()).await {
            Ok(Ok(permit)) => permit,
            // The semaphore is only closed by `close`.
            Ok(Err(_)) => return Err(PoolError::PoolClosed),
            Err(_) => {
                self.exhausted_count.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(role = %self.role, "No free connection slot before timeout");
                return Err(PoolError::ConnectionUnavailable(format!(
                    "{} pool exhausted ({} connections busy for {} ms)",
                    self.role, self.config.max_connections, self.config.connect_timeout_ms
                )));
            }
        };

        while let Some(idle) = self.pop_idle() {
            if idle.returned_at.elapsed() < VALIDATION_BYPASS {
                return self.checkout(idle.conn, idle.created_at, permit);
            }

            let mut conn = idle.conn;
            let validation = time::timeout(
                self.config.validation_timeout(),
                self.connector.is_valid(&mut conn),
            );
            let valid = match time::timeout_at(deadline, validation).await {
                Ok(valid) => valid.unwrap_or(false),
                Err(_) => return Err(self.deadline_exceeded()),
            };

            if valid {
                return self.checkout(conn, idle.created_at, permit);
            }
            tracing::debug!(role = %self.role, "Discarding stale idle connection");
        }

        let conn = match time::timeout_at(deadline, self.connector.connect(&self.config)).await {
            Ok(Ok(conn)) => conn,
            Ok(Err(e)) => {
                tracing::debug!(role = %self.role, address = %self.config.address, error = %e, "Connect failed");
                return Err(PoolError::ConnectionUnavailable(format!(
                    "{} endpoint {} unreachable: {}",
                    self.role, self.config.address, e
                )));
            }
            Err(_) => {
                tracing::debug!(role = %self.role, address = %self.config.address, "Connect timed out");
                return Err(PoolError::ConnectionUnavailable(format!(
                    "{} endpoint {} did not answer within {} ms",
                    self.role, self.config.address, self.config.connect_timeout_ms
                )));
            }
        };
        self.connections_created.fetch_add(1, Ordering::Relaxed);

        self.checkout(conn, Instant::now(), permit)
    }

    fn deadline_exceeded(&self) -> PoolError {
        tracing::debug!(role = %self.role, "Acquire deadline passed while validating idle connections");
        PoolError::ConnectionUnavailable(format!(
            "{} endpoint {} could not hand out a connection within {} ms",
            self.role, self.config.address, self.config.connect_timeout_ms
        ))
    }

    fn checkout(
        self: &Arc<Self>,
        conn: C::Connection,
        created_at: Instant,
        permit: tokio::sync::OwnedSemaphorePermit,
    ) -> PoolResult<PooledConnection<C>> {
        // A close that landed while we were connecting or validating wins.
        if self.is_closed() {
            return Err(PoolError::PoolClosed);
        }
        self.acquisitions.fetch_add(1, Ordering::Relaxed);
        Ok(PooledConnection::new(conn, self.clone(), created_at, permit))
    }

    fn pop_idle(&self) -> Option<IdleConnection<C::Connection>> {
        self.idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()
    }

    /// Park a connection coming back from a guard.
    pub(crate) fn release(&self, conn: C::Connection, created_at: Instant) {
        let mut idle = self.idle.lock().unwrap_or_else(PoisonError::into_inner);
        // Checked under the lock so `close` cannot miss a late return.
        if self.is_closed() {
            drop(idle);
            drop(conn);
            return;
        }
        idle.push(IdleConnection {
            conn,
            created_at,
            returned_at: Instant::now(),
        });
    }

    /// Acquire a connection and run one liveness round-trip on it.
    ///
    /// Connections that fail the round-trip are discarded.
    pub async fn validate(self: &Arc<Self>) -> Result<(), ProbeFailure> {
        let mut conn = self.acquire().await?;

        match time::timeout(
            self.config.validation_timeout(),
            self.connector.is_valid(&mut *conn),
        )
        .await
        {
            Ok(true) => Ok(()),
            Ok(false) => {
                conn.discard();
                Err(ProbeFailure::Invalid)
            }
            Err(_) => {
                conn.discard();
                Err(ProbeFailure::ValidationTimeout)
            }
        }
    }

    /// Bounded liveness check. Never fails; every problem reads as `false`.
    pub async fn probe(self: &Arc<Self>, timeout: Duration) -> bool {
        matches!(time::timeout(timeout, self.validate()).await, Ok(Ok(())))
    }

    /// Close the pool. Idempotent.
    ///
    /// Idle connections are dropped now; borrowed ones are dropped when their
    /// guards are released. Waiters in `acquire` wake up with `PoolClosed`.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.slots.close();

        let drained: Vec<_> = self
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();

        tracing::info!(
            role = %self.role,
            address = %self.config.address,
            idle_closed = drained.len(),
            "Endpoint pool closed"
        );
    }

    /// Snapshot of the pool's bookkeeping.
    pub fn status(&self) -> PoolStatus {
        let max_size = self.config.max_connections.min(Semaphore::MAX_PERMITS);
        let idle = self.idle.lock().unwrap_or_else(PoisonError::into_inner).len();
        PoolStatus {
            role: self.role,
            address: self.config.address.clone(),
            max_size,
            in_use: max_size.saturating_sub(self.slots.available_permits()),
            idle,
            closed: self.is_closed(),
            connections_created: self.connections_created.load(Ordering::Relaxed),
            acquisitions: self.acquisitions.load(Ordering::Relaxed),
            exhausted_count: self.exhausted_count.load(Ordering::Relaxed),
        }
    }
}

impl<C: Connector> std::fmt::Debug for EndpointPool<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointPool")
            .field("role", &self.role)
            .field("address", &self.config.address)
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::connector::BoxError;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    /// Connector whose endpoint can be switched up and down.
    #[derive(Clone, Default)]
    struct FlakyConnector {
        down: Arc<AtomicBool>,
        hang: Arc<AtomicBool>,
        connects: Arc<AtomicUsize>,
        validations: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Connector for FlakyConnector {
        type Connection = usize;

        async fn connect(&self, _endpoint: &EndpointConfig) -> Result<usize, BoxError> {
            if self.down.load(Ordering::SeqCst) {
                return Err("connection refused".into());
            }
            Ok(self.connects.fetch_add(1, Ordering::SeqCst))
        }

        async fn is_valid(&self, _conn: &mut usize) -> bool {
            self.validations.fetch_add(1, Ordering::SeqCst);
            if self.hang.load(Ordering::SeqCst) {
                std::future::pending::<()>().await;
            }
            !self.down.load(Ordering::SeqCst)
        }
    }

    fn pool_with(max: usize, connector: FlakyConnector) -> Arc<EndpointPool<FlakyConnector>> {
        let mut config = EndpointConfig::new("db:5432");
        config.max_connections = max;
        config.connect_timeout_ms = 50;
        config.validation_timeout_ms = 50;
        EndpointPool::new(EndpointRole::Primary, config, connector)
    }

    #[tokio::test]
    async fn test_reuses_returned_connection() {
        let connector = FlakyConnector::default();
        let pool = pool_with(2, connector.clone());

        let first = pool.acquire().await.unwrap();
        assert_eq!(*first, 0);
        drop(first);

        let second = pool.acquire().await.unwrap();
        assert_eq!(*second, 0);
        assert_eq!(connector.connects.load(Ordering::SeqCst), 1);
        assert_eq!(second.role(), EndpointRole::Primary);
    }

    #[tokio::test]
    async fn test_saturated_pool_reports_unavailable() {
        let pool = pool_with(1, FlakyConnector::default());

        let _held = pool.acquire().await.unwrap();
        let err = pool.acquire().await.unwrap_err();
        assert!(matches!(err, PoolError::ConnectionUnavailable(_)));
        assert_eq!(pool.status().exhausted_count, 1);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_reports_unavailable() {
        let connector = FlakyConnector::default();
        connector.down.store(true, Ordering::SeqCst);
        let pool = pool_with(1, connector);

        let err = pool.acquire().await.unwrap_err();
        assert!(err.to_string().contains("unreachable"));
        // The slot is given back on failure.
        assert_eq!(pool.status().in_use, 0);
    }

    #[tokio::test]
    async fn test_close_is_terminal_and_idempotent() {
        let pool = pool_with(2, FlakyConnector::default());
        drop(pool.acquire().await.unwrap());
        assert_eq!(pool.status().idle, 1);

        pool.close();
        pool.close();

        assert_eq!(pool.acquire().await.unwrap_err(), PoolError::PoolClosed);
        assert_eq!(pool.validate().await, Err(ProbeFailure::PoolClosed));
        assert!(!pool.probe(Duration::from_millis(100)).await);
        assert_eq!(pool.status().idle, 0);
        assert!(pool.status().closed);
    }

    #[tokio::test]
    async fn test_close_wakes_waiters() {
        let mut config = EndpointConfig::new("db:5432");
        config.max_connections = 1;
        config.connect_timeout_ms = 10_000;
        let pool = EndpointPool::new(EndpointRole::Standby, config, FlakyConnector::default());

        let held = pool.acquire().await.unwrap();
        let waiter = {
            let pool = pool.clone();
            tokio::spawn(async move { pool.acquire().await })
        };
        tokio::task::yield_now().await;

        pool.close();
        let result = time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter hung after close")
            .unwrap();
        assert_eq!(result.unwrap_err(), PoolError::PoolClosed);

        // A guard released after close does not resurrect the idle set.
        drop(held);
        assert_eq!(pool.status().idle, 0);
    }

    #[tokio::test]
    async fn test_stale_idle_connection_is_validated() {
        let connector = FlakyConnector::default();
        let pool = pool_with(1, connector.clone());
        drop(pool.acquire().await.unwrap());

        time::sleep(VALIDATION_BYPASS + Duration::from_millis(20)).await;
        let conn = pool.acquire().await.unwrap();
        assert_eq!(*conn, 0);
        assert_eq!(connector.validations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stale_idle_validation_shares_acquire_deadline() {
        let connector = FlakyConnector::default();
        let mut config = EndpointConfig::new("db:5432");
        config.max_connections = 5;
        config.connect_timeout_ms = 100;
        config.validation_timeout_ms = 100;
        let pool = EndpointPool::new(EndpointRole::Primary, config, connector.clone());

        let mut held = Vec::new();
        for _ in 0..5 {
            held.push(pool.acquire().await.unwrap());
        }
        drop(held);
        assert_eq!(pool.status().idle, 5);

        time::sleep(VALIDATION_BYPASS + Duration::from_millis(20)).await;
        connector.hang.store(true, Ordering::SeqCst);

        let started = Instant::now();
        let err = pool.acquire().await.unwrap_err();
        assert!(matches!(err, PoolError::ConnectionUnavailable(_)));
        // One validation budget per idle connection would take 500 ms.
        assert!(started.elapsed() < Duration::from_millis(300));
        assert_eq!(pool.status().in_use, 0);
    }

    #[tokio::test]
    async fn test_huge_pool_size_does_not_preallocate() {
        let mut config = EndpointConfig::new("db:5432");
        config.max_connections = 1 << 40;
        let pool = EndpointPool::new(EndpointRole::Primary, config, FlakyConnector::default());

        let conn = pool.acquire().await.unwrap();
        assert_eq!(pool.status().max_size, 1 << 40);
        assert_eq!(pool.status().in_use, 1);
        drop(conn);
        assert_eq!(pool.status().idle, 1);
    }

    #[tokio::test]
    async fn test_probe_tracks_endpoint_health() {
        let connector = FlakyConnector::default();
        let pool = pool_with(1, connector.clone());
        assert!(pool.probe(Duration::from_millis(200)).await);

        connector.down.store(true, Ordering::SeqCst);
        assert_eq!(pool.validate().await, Err(ProbeFailure::Invalid));
        // The invalid connection was discarded, the next attempt must connect.
        assert!(matches!(
            pool.validate().await,
            Err(ProbeFailure::Unavailable(_))
        ));
    }
}
