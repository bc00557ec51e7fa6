//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse, ttl floors)
//! - Validate origins and header names used by the policies
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::{HeaderName, Method};
use thiserror::Error;
use url::Url;

use crate::config::schema::GatewayConfig;
use crate::store::MIN_EXPIRATION_TTL_SECS;

/// One semantic problem in a configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field}: invalid socket address \"{value}\"")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field}: must be greater than zero")]
    Zero { field: &'static str },

    #[error("{field}: must be at least {min}, got {value}")]
    TooSmall {
        field: &'static str,
        min: u64,
        value: u64,
    },

    #[error("{field}: invalid origin \"{value}\"")]
    InvalidOrigin { field: &'static str, value: String },

    #[error("{field}: invalid value \"{value}\"")]
    InvalidValue { field: &'static str, value: String },

    #[error("{field}: must not be empty")]
    Empty { field: &'static str },
}

/// Check every semantic rule and collect all failures.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero { field: "timeouts.request_secs" });
    }
    if config.security.max_body_size == 0 {
        errors.push(ValidationError::Zero { field: "security.max_body_size" });
    }
    if config.store.list_limit == 0 {
        errors.push(ValidationError::Zero { field: "store.list_limit" });
    }

    check_ttl(&mut errors, "cache.ttl_secs", config.cache.ttl_secs);
    if let Some(ttl) = config.store.view_ttl_secs {
        check_ttl(&mut errors, "store.view_ttl_secs", ttl);
    }

    if config.cors.enabled {
        check_origins(&mut errors, "cors.origins", &config.cors.origins);
        for method in &config.cors.methods {
            if method.parse::<Method>().is_err() {
                errors.push(ValidationError::InvalidValue {
                    field: "cors.methods",
                    value: method.clone(),
                });
            }
        }
        for header in &config.cors.headers {
            if HeaderName::from_bytes(header.as_bytes()).is_err() {
                errors.push(ValidationError::InvalidValue {
                    field: "cors.headers",
                    value: header.clone(),
                });
            }
        }
    }

    if config.referer.enabled {
        check_origins(&mut errors, "referer.origins", &config.referer.origins);
    }

    if config.auth.enabled && config.auth.api_token.trim().is_empty() {
        errors.push(ValidationError::Empty { field: "auth.api_token" });
    }

    if config.bot_filter.enabled
        && config.bot_filter.blocked_agents.iter().any(|marker| marker.trim().is_empty())
    {
        errors.push(ValidationError::InvalidValue {
            field: "bot_filter.blocked_agents",
            value: String::new(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

fn check_ttl(errors: &mut Vec<ValidationError>, field: &'static str, value: u64) {
    if value < MIN_EXPIRATION_TTL_SECS {
        errors.push(ValidationError::TooSmall {
            field,
            min: MIN_EXPIRATION_TTL_SECS,
            value,
        });
    }
}

/// An origin must be exactly `scheme://host[:port]`, as browsers send it.
fn check_origins(errors: &mut Vec<ValidationError>, field: &'static str, origins: &[String]) {
    for origin in origins {
        let valid = Url::parse(origin)
            .map(|url| url.origin().ascii_serialization() == *origin)
            .unwrap_or(false);
        if !valid {
            errors.push(ValidationError::InvalidOrigin {
                field,
                value: origin.clone(),
            });
        }
    }
}
