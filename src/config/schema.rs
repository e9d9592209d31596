//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProfilerConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Profiling policy and session storage.
    pub profiling: ProfilingConfig,

    /// Downstream service called by the instrumented handlers.
    pub upstream: UpstreamConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Inbound request timeout in seconds.
    pub request_secs: u64,

    /// Outbound call timeout in seconds.
    pub outbound_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            outbound_secs: 10,
        }
    }
}

/// Profiling configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProfilingConfig {
    /// Master switch. When false no request is profiled.
    pub enabled: bool,

    /// Requests whose path starts with any of these are not profiled.
    pub unprofiled_prefixes: Vec<String>,

    /// Base path of the profiler's own endpoints.
    pub resource_path: String,

    /// Maximum sessions kept in memory; the oldest is evicted first.
    pub max_sessions: usize,

    /// Sessions older than this are dropped by the sweeper.
    pub session_ttl_secs: u64,

    /// How often the sweeper runs.
    pub sweep_interval_secs: u64,
}

impl Default for ProfilingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            unprofiled_prefixes: vec!["/unprofiled".to_string()],
            resource_path: "/mini-profiler-resources".to_string(),
            max_sessions: 10_000,
            session_ttl_secs: 3600,
            sweep_interval_secs: 60,
        }
    }
}

/// Upstream service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL of the downstream API (e.g., "http://localhost:9080").
    pub endpoint: String,

    /// Base URL the `/https/...` routes call (e.g., "https://localhost:9443").
    pub https_endpoint: String,

    /// Deliberately unreachable target called by `/{protocol}/broken`.
    pub broken_endpoint: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:9080".to_string(),
            https_endpoint: "https://localhost:9443".to_string(),
            broken_endpoint: "http://localhost:9".to_string(),
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
