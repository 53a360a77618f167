//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Connection URLs parse and use a supported scheme
//! - Thresholds and intervals are non-zero
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RouterConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::schema::RouterConfig;

const SUPPORTED_SCHEMES: &[&str] = &["postgres", "postgresql"];

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("database.primary_url is required")]
    MissingPrimaryUrl,

    #[error("{field} is not a valid URL: {reason}")]
    InvalidUrl { field: &'static str, reason: String },

    #[error("{field} uses unsupported scheme '{scheme}'")]
    UnsupportedScheme { field: &'static str, scheme: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("observability.metrics_address '{0}' is not a socket address")]
    InvalidMetricsAddress(String),
}

/// Validate a loaded configuration.
pub fn validate_config(config: &RouterConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match non_blank(&config.database.primary_url) {
        Some(url) => check_url("database.primary_url", url, &mut errors),
        None => errors.push(ValidationError::MissingPrimaryUrl),
    }
    if let Some(url) = non_blank(&config.database.replica_url) {
        check_url("database.replica_url", url, &mut errors);
    }

    if config.database.max_connections == 0 {
        errors.push(ValidationError::Zero("database.max_connections"));
    }
    if config.replica.max_replication_lag_ms == 0 {
        errors.push(ValidationError::Zero("replica.max_replication_lag_ms"));
    }
    if config.replica.health_check_interval_ms == 0 {
        errors.push(ValidationError::Zero("replica.health_check_interval_ms"));
    }
    if config.replica.max_consecutive_failures == 0 {
        errors.push(ValidationError::Zero("replica.max_consecutive_failures"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Render a list of validation errors as one line.
pub fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn non_blank(url: &Option<String>) -> Option<&str> {
    url.as_deref().filter(|url| !url.trim().is_empty())
}

fn check_url(field: &'static str, raw: &str, errors: &mut Vec<ValidationError>) {
    match Url::parse(raw) {
        Ok(url) if SUPPORTED_SCHEMES.contains(&url.scheme()) => {}
        Ok(url) => errors.push(ValidationError::UnsupportedScheme {
            field,
            scheme: url.scheme().to_string(),
        }),
        Err(e) => errors.push(ValidationError::InvalidUrl {
            field,
            reason: e.to_string(),
        }),
    }
}
