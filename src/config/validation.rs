//! Configuration validation.
//!
//! Serde handles syntax; this checks that backend addresses dial, bind
//! addresses parse and limits are usable. All errors are collected, not just
//! the first.

use std::net::SocketAddr;

use axum::http::HeaderName;
use thiserror::Error;

use crate::config::schema::{ScienceConfig, PLACEHOLDER_API_KEY};
use crate::forward::BackendTarget;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} backend address is required")]
    MissingBackend { field: &'static str },

    #[error("{field} backend address is invalid: {reason}")]
    InvalidBackend { field: &'static str, reason: String },

    #[error("{field} is not a valid socket address: {value}")]
    InvalidBindAddress { field: &'static str, value: String },

    #[error("strip_headers entry is not a valid header name: {0}")]
    InvalidHeaderName(String),

    #[error("limits.max_body_bytes must be greater than zero")]
    ZeroBodyLimit,

    #[error("admin.api_key must be changed when the admin API is enabled")]
    PlaceholderApiKey,
}

/// Validate a configuration, returning every problem found.
pub fn validate_config(config: &ScienceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for (field, addr) in [
        ("control", &config.backends.control),
        ("experiment", &config.backends.experiment),
    ] {
        if addr.trim().is_empty() {
            errors.push(ValidationError::MissingBackend { field });
        } else if let Err(e) = BackendTarget::parse(addr) {
            errors.push(ValidationError::InvalidBackend {
                field,
                reason: e.to_string(),
            });
        }
    }

    check_bind(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.observability.metrics_enabled {
        check_bind(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }
    if config.admin.enabled {
        check_bind(&mut errors, "admin.bind_address", &config.admin.bind_address);
        if config.admin.api_key.is_empty() || config.admin.api_key == PLACEHOLDER_API_KEY {
            errors.push(ValidationError::PlaceholderApiKey);
        }
    }

    for name in &config.comparison.strip_headers {
        if HeaderName::from_bytes(name.as_bytes()).is_err() {
            errors.push(ValidationError::InvalidHeaderName(name.clone()));
        }
    }

    if config.limits.max_body_bytes == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_bind(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress {
            field,
            value: value.to_string(),
        });
    }
}
