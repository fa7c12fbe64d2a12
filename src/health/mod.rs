//! Health checking and failover subsystem.
//!
//! # Data Flow
//! ```text
//! Periodic timer (monitor.rs)
//!     → probe.rs: acquire + liveness round-trip on the primary, bounded
//!     → state.rs: (current state, healthy?) → Transition
//!     → FailoverState: atomic swap of the active pool
//! ```
//!
//! # Design Decisions
//! - Only the primary is probed; the standby is assumed reachable
//! - Failback is immediate on the first healthy probe unless a threshold is set
//! - Probe failures never escape the monitor loop

pub mod monitor;
pub mod probe;
pub mod state;

pub use monitor::HealthMonitor;
pub use probe::{HealthCheckResult, HealthProbe, ProbeFailure};
pub use state::{FailoverState, RouterState, Transition};
