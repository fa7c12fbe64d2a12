//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the router.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the failover router.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RouterConfig {
    /// The endpoint normally serving all traffic.
    pub primary: EndpointConfig,

    /// The fallback endpoint used while the primary is unhealthy.
    pub standby: EndpointConfig,

    /// Health monitor settings.
    pub health_check: HealthCheckConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Connection parameters and pool sizing for a single database endpoint.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Endpoint address (e.g., "10.0.0.5:5432").
    pub address: String,

    /// Login user.
    pub username: String,

    /// Login password.
    pub password: String,

    /// Database to connect to, if the driver needs one.
    pub database: Option<String>,

    /// Maximum concurrent connections held by the pool.
    pub max_connections: usize,

    /// Upper bound for opening a connection or waiting for a free slot.
    pub connect_timeout_ms: u64,

    /// Upper bound for a single liveness round-trip.
    pub validation_timeout_ms: u64,
}

impl EndpointConfig {
    /// Create an endpoint config for the given address with default pool settings.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Default::default()
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn validation_timeout(&self) -> Duration {
        Duration::from_millis(self.validation_timeout_ms)
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            address: String::new(),
            username: String::new(),
            password: String::new(),
            database: None,
            max_connections: 10,
            // Failover depends on fast failure, keep these short.
            connect_timeout_ms: 2000,
            validation_timeout_ms: 1000,
        }
    }
}

impl std::fmt::Debug for EndpointConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointConfig")
            .field("address", &self.address)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("max_connections", &self.max_connections)
            .field("connect_timeout_ms", &self.connect_timeout_ms)
            .field("validation_timeout_ms", &self.validation_timeout_ms)
            .finish()
    }
}

/// Health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Interval between monitor cycles in seconds.
    pub interval_secs: u64,

    /// Upper bound for a whole probe (acquire + liveness round-trip).
    /// Must be strictly shorter than the interval.
    pub probe_timeout_ms: u64,

    /// Consecutive unhealthy probes before failing over to the standby.
    pub failover_threshold: u32,

    /// Consecutive healthy probes before failing back to the primary.
    pub failback_threshold: u32,
}

impl HealthCheckConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            interval_secs: 5,
            probe_timeout_ms: 3000,
            failover_threshold: 1,
            failback_threshold: 1,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RouterConfig::default();
        assert_eq!(config.health_check.interval(), Duration::from_secs(5));
        assert_eq!(config.primary.max_connections, 10);
        assert_eq!(config.primary.connect_timeout(), Duration::from_secs(2));
        assert_eq!(config.standby.validation_timeout(), Duration::from_secs(1));
        assert_eq!(config.health_check.failback_threshold, 1);
    }

    #[test]
    fn test_debug_redacts_password() {
        let mut endpoint = EndpointConfig::new("127.0.0.1:5432");
        endpoint.password = "hunter2".to_string();
        let rendered = format!("{:?}", endpoint);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: RouterConfig = toml::from_str(
            r#"
            [primary]
            address = "db-master:5432"

            [standby]
            address = "db-replica:5432"
            max_connections = 4
            "#,
        )
        .unwrap();

        assert_eq!(config.primary.address, "db-master:5432");
        assert_eq!(config.primary.max_connections, 10);
        assert_eq!(config.standby.max_connections, 4);
        assert_eq!(config.health_check.probe_timeout_ms, 3000);
    }
}
