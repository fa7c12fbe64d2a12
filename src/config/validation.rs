//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and the relations
//! between fields. All errors are reported, not just the first.

use thiserror::Error;

use crate::config::schema::{EndpointConfig, RouterConfig};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{endpoint}: address must not be empty")]
    EmptyAddress { endpoint: &'static str },

    #[error("{endpoint}: max_connections must be greater than zero")]
    ZeroPoolSize { endpoint: &'static str },

    #[error("{endpoint}: {field} must be greater than zero")]
    ZeroTimeout {
        endpoint: &'static str,
        field: &'static str,
    },

    #[error("health_check: interval_secs must be greater than zero")]
    ZeroInterval,

    #[error("health_check: probe_timeout_ms ({probe_ms}) must be shorter than the interval ({interval_ms} ms)")]
    ProbeTimeoutTooLong { probe_ms: u64, interval_ms: u64 },

    #[error("health_check: probe_timeout_ms must be greater than zero")]
    ZeroProbeTimeout,

    #[error("health_check: {0} must be at least 1")]
    ZeroThreshold(&'static str),

    #[error("primary and standby share the address {0}")]
    SameAddress(String),
}

/// Validate a configuration, collecting every error found.
pub fn validate_config(config: &RouterConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    validate_endpoint("primary", &config.primary, &mut errors);
    validate_endpoint("standby", &config.standby, &mut errors);

    let health = &config.health_check;
    if health.interval_secs == 0 {
        errors.push(ValidationError::ZeroInterval);
    }
    if health.probe_timeout_ms == 0 {
        errors.push(ValidationError::ZeroProbeTimeout);
    } else if health.interval_secs > 0 && health.probe_timeout() >= health.interval() {
        errors.push(ValidationError::ProbeTimeoutTooLong {
            probe_ms: health.probe_timeout_ms,
            interval_ms: health.interval_secs.saturating_mul(1000),
        });
    }
    if health.failover_threshold == 0 {
        errors.push(ValidationError::ZeroThreshold("failover_threshold"));
    }
    if health.failback_threshold == 0 {
        errors.push(ValidationError::ZeroThreshold("failback_threshold"));
    }

    if !config.primary.address.is_empty() && config.primary.address == config.standby.address {
        errors.push(ValidationError::SameAddress(config.primary.address.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Render a list of validation errors on one line.
pub fn describe_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn validate_endpoint(name: &'static str, endpoint: &EndpointConfig, errors: &mut Vec<ValidationError>) {
    if endpoint.address.trim().is_empty() {
        errors.push(ValidationError::EmptyAddress { endpoint: name });
    }
    if endpoint.max_connections == 0 {
        errors.push(ValidationError::ZeroPoolSize { endpoint: name });
    }
    if endpoint.connect_timeout_ms == 0 {
        errors.push(ValidationError::ZeroTimeout {
            endpoint: name,
            field: "connect_timeout_ms",
        });
    }
    if endpoint.validation_timeout_ms == 0 {
        errors.push(ValidationError::ZeroTimeout {
            endpoint: name,
            field: "validation_timeout_ms",
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> RouterConfig {
        RouterConfig {
            primary: EndpointConfig::new("127.0.0.1:5432"),
            standby: EndpointConfig::new("127.0.0.1:5433"),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_default_config_reports_missing_addresses() {
        let errors = validate_config(&RouterConfig::default()).unwrap_err();
        assert!(errors.contains(&ValidationError::EmptyAddress { endpoint: "primary" }));
        assert!(errors.contains(&ValidationError::EmptyAddress { endpoint: "standby" }));
    }

    #[test]
    fn test_probe_timeout_must_fit_interval() {
        let mut config = valid_config();
        config.health_check.interval_secs = 2;
        config.health_check.probe_timeout_ms = 2000;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::ProbeTimeoutTooLong {
                probe_ms: 2000,
                interval_ms: 2000
            }]
        );
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = valid_config();
        config.primary.max_connections = 0;
        config.standby.connect_timeout_ms = 0;
        config.health_check.failback_threshold = 0;
        config.standby.address = config.primary.address.clone();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::SameAddress("127.0.0.1:5432".into())));
        assert!(errors[0].to_string().contains("primary"));
    }
}
