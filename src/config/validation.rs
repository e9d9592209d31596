//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, bounds > 0)
//! - Check addresses and URLs parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProfilerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::ProfilerConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &ProfilerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new("listener.bind_address", "not a socket address"));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }
    if config.timeouts.outbound_secs == 0 {
        errors.push(ValidationError::new("timeouts.outbound_secs", "must be greater than 0"));
    }

    let profiling = &config.profiling;
    for prefix in &profiling.unprofiled_prefixes {
        if !prefix.starts_with('/') {
            errors.push(ValidationError::new(
                "profiling.unprofiled_prefixes",
                format!("'{}' must start with '/'", prefix),
            ));
        }
    }
    if !profiling.resource_path.starts_with('/') || profiling.resource_path.trim_end_matches('/').is_empty() {
        errors.push(ValidationError::new(
            "profiling.resource_path",
            "must be a non-root path starting with '/'",
        ));
    }
    if profiling.max_sessions == 0 {
        errors.push(ValidationError::new("profiling.max_sessions", "must be greater than 0"));
    }
    if profiling.session_ttl_secs == 0 {
        errors.push(ValidationError::new("profiling.session_ttl_secs", "must be greater than 0"));
    }
    if profiling.sweep_interval_secs == 0 {
        errors.push(ValidationError::new("profiling.sweep_interval_secs", "must be greater than 0"));
    }

    check_http_url(&mut errors, "upstream.endpoint", &config.upstream.endpoint);
    check_http_url(&mut errors, "upstream.https_endpoint", &config.upstream.https_endpoint);
    check_http_url(&mut errors, "upstream.broken_endpoint", &config.upstream.broken_endpoint);

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new("observability.metrics_address", "not a socket address"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_http_url(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    match url::Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => errors.push(ValidationError::new(field, format!("unsupported scheme '{}'", url.scheme()))),
        Err(e) => errors.push(ValidationError::new(field, e.to_string())),
    }
}
