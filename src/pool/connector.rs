//! Physical connection establishment.
//!
//! # Responsibilities
//! - Open one physical connection to an endpoint
//! - Run a trivial liveness round-trip on an open connection
//!
//! # Design Decisions
//! - Timeouts are applied by the pool, not by connectors
//! - Connectors are shared by both pools and must be cheap to clone

use std::io::ErrorKind;

use async_trait::async_trait;
use tokio::net::TcpStream;

use crate::config::EndpointConfig;

/// Boxed error returned by connectors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Driver seam between the pool and a concrete database client.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// The physical connection handed out to callers.
    type Connection: Send + 'static;

    /// Open a new physical connection to `endpoint`.
    async fn connect(&self, endpoint: &EndpointConfig) -> Result<Self::Connection, BoxError>;

    /// Liveness round-trip. Returns false when the connection is unusable.
    async fn is_valid(&self, conn: &mut Self::Connection) -> bool;
}

/// Transport-level connector: a TCP session per connection.
///
/// Liveness means the socket is still open and has not been reset by the
/// peer. Useful for endpoints without a driver and for tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

/// A TCP session opened by [`TcpConnector`].
#[derive(Debug)]
pub struct TcpConnection {
    pub stream: TcpStream,
}

#[async_trait]
impl Connector for TcpConnector {
    type Connection = TcpConnection;

    async fn connect(&self, endpoint: &EndpointConfig) -> Result<TcpConnection, BoxError> {
        let stream = TcpStream::connect(endpoint.address.as_str()).await?;
        stream.set_nodelay(true)?;
        Ok(TcpConnection { stream })
    }

    async fn is_valid(&self, conn: &mut TcpConnection) -> bool {
        if conn.stream.writable().await.is_err() {
            return false;
        }
        let mut buf = [0u8; 1];
        match conn.stream.try_read(&mut buf) {
            // Orderly shutdown by the peer.
            Ok(0) => false,
            // Unsolicited bytes, the session is still up.
            Ok(_) => true,
            Err(e) if e.kind() == ErrorKind::WouldBlock => true,
            Err(_) => false,
        }
    }
}
