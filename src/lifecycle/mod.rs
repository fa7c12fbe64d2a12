//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (Router::start):
//!     Validate config → Build both pools → Probe primary → Pick initial pool
//!     → Spawn health monitor
//!
//! Shutdown (shutdown.rs):
//!     Router::shutdown → Signal monitor → Wait for it → Close both pools
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown of the binary
//! ```
//!
//! # Design Decisions
//! - The monitor is owned by the router, never a detached daemon
//! - Ordered shutdown: stop scheduling first, then release pools
//! - Shutdown is idempotent and callable from any task

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
