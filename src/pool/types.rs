//! Pool identity, status and error definitions.

use thiserror::Error;

/// Which side of the active-standby pair a pool serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointRole {
    Primary,
    Standby,
}

impl EndpointRole {
    /// Stable lowercase label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointRole::Primary => "primary",
            EndpointRole::Standby => "standby",
        }
    }
}

impl std::fmt::Display for EndpointRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors surfaced to callers acquiring a connection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    /// Pool exhausted or endpoint unreachable right now. Transient.
    #[error("connection unavailable: {0}")]
    ConnectionUnavailable(String),

    /// The pool has been torn down and will never hand out connections again.
    #[error("pool closed")]
    PoolClosed,
}

impl PoolError {
    /// True for errors that will never clear up on their own.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PoolError::PoolClosed)
    }
}

/// Result type for pool operations.
pub type PoolResult<T> = Result<T, PoolError>;

/// Point-in-time snapshot of a pool's bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolStatus {
    pub role: EndpointRole,
    pub address: String,
    pub max_size: usize,
    /// Connections currently checked out.
    pub in_use: usize,
    /// Connections parked in the idle set.
    pub idle: usize,
    pub closed: bool,
    /// Physical connections opened over the pool's lifetime.
    pub connections_created: u64,
    /// Successful acquisitions.
    pub acquisitions: u64,
    /// Acquisitions that timed out waiting for a free slot.
    pub exhausted_count: u64,
}

impl PoolStatus {
    /// Open physical connections, borrowed or idle.
    pub fn size(&self) -> usize {
        self.in_use + self.idle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PoolError::ConnectionUnavailable("connection refused".into());
        assert_eq!(err.to_string(), "connection unavailable: connection refused");
        assert!(!err.is_terminal());

        assert_eq!(PoolError::PoolClosed.to_string(), "pool closed");
        assert!(PoolError::PoolClosed.is_terminal());
    }

    #[test]
    fn test_role_labels() {
        assert_eq!(EndpointRole::Primary.to_string(), "primary");
        assert_eq!(EndpointRole::Standby.as_str(), "standby");
    }
}
