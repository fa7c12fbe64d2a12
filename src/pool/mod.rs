//! Endpoint connection pooling subsystem.
//!
//! # Data Flow
//! ```text
//! Router picks the active pool
//!     → endpoint.rs (wait for a free slot, bounded by connect_timeout)
//!     → reuse an idle connection (validated if it sat unused)
//!       or open a new one through connector.rs
//!     → connection.rs guard handed to the caller
//!     → guard dropped: connection parked in the idle set
//! ```
//!
//! # Design Decisions
//! - One pool per endpoint, created once and closed once
//! - Pool size enforced by a semaphore; bookkeeping lock is never held across I/O
//! - A closed pool is terminal: `PoolClosed`, never `ConnectionUnavailable`
//! - Drivers plug in through the `Connector` trait

pub mod connection;
pub mod connector;
pub mod endpoint;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod types;

pub use connection::PooledConnection;
pub use connector::{BoxError, Connector, TcpConnection, TcpConnector};
pub use endpoint::EndpointPool;
#[cfg(feature = "postgres")]
pub use postgres::PostgresConnector;
pub use types::{EndpointRole, PoolError, PoolResult, PoolStatus};
