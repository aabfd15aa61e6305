//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Compile every URL pattern
//! - Validate addresses, URLs and value ranges
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RelayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use url::Url;

use crate::config::schema::RelayConfig;
use crate::observer::{MatchPattern, PatternError};
use crate::settings::destination::LEGACY_DEFAULT_DESTINATIONS;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field}: `{value}` is not a socket address")]
    InvalidAddress { field: &'static str, value: String },
    #[error("observer.patterns: {0}")]
    InvalidPattern(#[from] PatternError),
    #[error("observer.patterns must not be empty")]
    NoPatterns,
    #[error("{field}: `{value}` is not an absolute http(s) URL")]
    InvalidUrl { field: &'static str, value: String },
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },
}

fn check_address(field: &'static str, value: &str, errors: &mut Vec<ValidationError>) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

fn check_http_url(field: &'static str, value: &str, errors: &mut Vec<ValidationError>) {
    let ok = Url::parse(value)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
        .unwrap_or(false);
    if !ok {
        errors.push(ValidationError::InvalidUrl {
            field,
            value: value.to_string(),
        });
    }
}

/// Check a parsed configuration.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address("listener.bind_address", &config.listener.bind_address, &mut errors);
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::Zero {
            field: "listener.max_connections",
        });
    }
    if let Some(upstream) = &config.listener.upstream {
        check_http_url("listener.upstream", upstream, &mut errors);
    }

    if config.observer.patterns.is_empty() {
        errors.push(ValidationError::NoPatterns);
    }
    for pattern in &config.observer.patterns {
        if let Err(e) = MatchPattern::parse(pattern) {
            errors.push(e.into());
        }
    }

    check_http_url(
        "relay.default_destination",
        &config.relay.default_destination,
        &mut errors,
    );
    if LEGACY_DEFAULT_DESTINATIONS.contains(&config.relay.default_destination.as_str()) {
        tracing::warn!(
            default_destination = %config.relay.default_destination,
            "relay.default_destination is a legacy default"
        );
    }

    if config.options.enabled {
        check_address("options.bind_address", &config.options.bind_address, &mut errors);
    }
    if config.sink.enabled {
        check_address("sink.bind_address", &config.sink.bind_address, &mut errors);
    }
    if config.observability.metrics_enabled {
        check_address(
            "observability.metrics_address",
            &config.observability.metrics_address,
            &mut errors,
        );
    }

    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::Zero {
            field: "timeouts.connect_secs",
        });
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero {
            field: "timeouts.request_secs",
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&RelayConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = RelayConfig::default();
        config.listener.bind_address = "localhost".into();
        config.listener.upstream = Some("ftp://files.test".into());
        config.observer.patterns = vec!["https://example.service".into()];
        config.relay.default_destination = "127.0.0.1:8080".into();
        config.timeouts.request_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 5);
        assert!(errors.contains(&ValidationError::Zero {
            field: "timeouts.request_secs"
        }));
        assert!(errors.contains(&ValidationError::InvalidPattern(PatternError::MissingPath(
            "https://example.service".into()
        ))));
    }

    #[test]
    fn test_empty_patterns_rejected() {
        let mut config = RelayConfig::default();
        config.observer.patterns.clear();
        assert_eq!(
            validate_config(&config).unwrap_err(),
            vec![ValidationError::NoPatterns]
        );
    }

    #[test]
    fn test_disabled_servers_skip_address_checks() {
        let mut config = RelayConfig::default();
        config.options.enabled = false;
        config.options.bind_address = "nowhere".into();
        config.sink.bind_address = "nowhere".into();
        assert!(validate_config(&config).is_ok());
    }
}
