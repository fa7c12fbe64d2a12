//! Active-standby database connection router.
//!
//! Hands out pooled connections from a primary database and switches to a
//! standby when the primary stops answering health probes, switching back
//! once it recovers.

pub mod config;
pub mod health;
pub mod lifecycle;
pub mod observability;
pub mod pool;
pub mod routing;

pub use config::RouterConfig;
pub use health::{HealthCheckResult, ProbeFailure, RouterState, Transition};
pub use pool::{Connector, EndpointRole, PoolError, PooledConnection, TcpConnector};
pub use routing::{Router, RouterError, RouterStatus};
