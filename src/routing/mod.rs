//! Connection routing subsystem.
//!
//! # Data Flow
//! ```text
//! Application calls Router::acquire_connection()
//!     → FailoverState::current() (lock-free load of the active pool)
//!     → EndpointPool::acquire()
//!     → Return: PooledConnection or PoolError
//! ```
//!
//! # Design Decisions
//! - The active pool is re-read on every call, never cached
//! - No retries and no on-the-fly switching; recovery belongs to the monitor
//! - Read-only enforcement on the standby is left to callers

pub mod router;

pub use router::{Router, RouterError, RouterStatus};
