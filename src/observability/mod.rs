//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Pools, probes and the monitor produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Every failover and failback is logged and counted
//! - Probe failure reasons are labels, never errors
//! - Metrics are cheap (atomic increments) and free without a recorder

pub mod logging;
pub mod metrics;
