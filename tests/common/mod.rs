//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use db_failover_router::config::{EndpointConfig, HealthCheckConfig, RouterConfig};
use db_failover_router::pool::BoxError;
use db_failover_router::Connector;

pub const PRIMARY: &str = "primary.db:5432";
pub const STANDBY: &str = "standby.db:5432";

/// In-memory connector whose endpoints can be taken down and brought back.
#[derive(Clone, Default)]
pub struct MockConnector {
    down: Arc<Mutex<HashSet<String>>>,
    validation_delay: Arc<Mutex<Duration>>,
    next_id: Arc<AtomicU64>,
}

/// A fake physical connection that remembers where it points.
#[derive(Debug)]
pub struct MockConnection {
    pub address: String,
    pub id: u64,
}

impl MockConnector {
    pub fn set_down(&self, address: &str, down: bool) {
        let mut set = self.down.lock().unwrap();
        if down {
            set.insert(address.to_string());
        } else {
            set.remove(address);
        }
    }

    pub fn is_down(&self, address: &str) -> bool {
        self.down.lock().unwrap().contains(address)
    }

    /// Make every liveness round-trip take `delay`.
    pub fn set_validation_delay(&self, delay: Duration) {
        *self.validation_delay.lock().unwrap() = delay;
    }

    pub fn connections_opened(&self) -> u64 {
        self.next_id.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for MockConnector {
    type Connection = MockConnection;

    async fn connect(&self, endpoint: &EndpointConfig) -> Result<MockConnection, BoxError> {
        if self.is_down(&endpoint.address) {
            return Err("connection refused".into());
        }
        Ok(MockConnection {
            address: endpoint.address.clone(),
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
        })
    }

    async fn is_valid(&self, conn: &mut MockConnection) -> bool {
        let delay = *self.validation_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        !self.is_down(&conn.address)
    }
}

/// Router config whose scheduled monitor never fires during a test, so
/// cycles are driven explicitly.
pub fn manual_config(primary: &str, standby: &str) -> RouterConfig {
    let mut primary = EndpointConfig::new(primary);
    primary.connect_timeout_ms = 200;
    primary.validation_timeout_ms = 200;
    let mut standby = EndpointConfig::new(standby);
    standby.connect_timeout_ms = 200;
    standby.validation_timeout_ms = 200;

    RouterConfig {
        primary,
        standby,
        health_check: HealthCheckConfig {
            interval_secs: 3600,
            probe_timeout_ms: 1000,
            ..Default::default()
        },
        ..Default::default()
    }
}

/// A TCP endpoint that accepts and holds sessions until stopped.
pub struct MockEndpoint {
    pub addr: SocketAddr,
    task: JoinHandle<()>,
}

impl MockEndpoint {
    /// Start listening on `addr` (use port 0 for an ephemeral port).
    pub async fn start(addr: SocketAddr) -> Self {
        let listener = TcpListener::bind(addr).await.unwrap();
        let addr = listener.local_addr().unwrap();

        let task = tokio::spawn(async move {
            let mut sessions: Vec<TcpStream> = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                sessions.push(socket);
            }
        });

        Self { addr, task }
    }

    /// Simulate a crash: stop listening and drop every open session.
    pub async fn stop(self) {
        self.task.abort();
        let _ = self.task.await;
        // Let the FINs reach the client sockets.
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}
