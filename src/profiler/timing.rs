//! Timing spans for outbound calls.
//!
//! # Design Decisions
//! - A span is built in two steps: `PendingTiming` at issue time,
//!   `CustomTiming` once the call settles. Only completed spans are stored.
//! - Offsets are measured against the session's monotonic start instant.

use std::time::{Duration, Instant};
use uuid::Uuid;

/// Category tag used for every outbound HTTP span.
pub const HTTP_EXECUTE_TYPE: &str = "http";

/// How an outbound call settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A response with a 2xx status was received.
    Success { status: u16 },
    /// A response arrived with any non-2xx status.
    HttpError { status: u16 },
    /// The call failed at the transport level (refused, reset, timeout).
    Failed { error: String },
    /// The future was dropped before the call settled.
    Cancelled,
}

impl Outcome {
    /// Classify a received status code.
    pub fn from_status(status: u16) -> Self {
        if (200..300).contains(&status) {
            Outcome::Success { status }
        } else {
            Outcome::HttpError { status }
        }
    }

    pub fn is_error(&self) -> bool {
        !matches!(self, Outcome::Success { .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Outcome::Success { status } | Outcome::HttpError { status } => Some(*status),
            _ => None,
        }
    }

    /// Short label used for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Success { .. } => "success",
            Outcome::HttpError { .. } => "http_error",
            Outcome::Failed { .. } => "failed",
            Outcome::Cancelled => "cancelled",
        }
    }

    pub fn error_message(&self) -> Option<String> {
        match self {
            Outcome::Failed { error } => Some(error.clone()),
            Outcome::Cancelled => Some("cancelled".to_string()),
            _ => None,
        }
    }
}

/// Build the human-readable command string for a call.
pub fn command_string(method: &str, url: &str) -> String {
    format!("{} {}", method, url)
}

/// A span that has been started but not yet settled.
#[derive(Debug)]
pub struct PendingTiming {
    id: Uuid,
    execute_type: &'static str,
    command: String,
    started: Instant,
}

impl PendingTiming {
    /// Start timing a call now.
    pub fn start(execute_type: &'static str, command: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            execute_type,
            command,
            started: Instant::now(),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Settle the span. `origin` is the owning session's start instant.
    pub fn complete(self, origin: Instant, outcome: Outcome) -> CustomTiming {
        CustomTiming {
            id: self.id,
            execute_type: self.execute_type,
            command: self.command,
            start_offset: self.started.saturating_duration_since(origin),
            duration: self.started.elapsed(),
            outcome,
        }
    }
}

/// A completed outbound-call measurement. Immutable once built.
#[derive(Debug, Clone)]
pub struct CustomTiming {
    id: Uuid,
    execute_type: &'static str,
    command: String,
    start_offset: Duration,
    duration: Duration,
    outcome: Outcome,
}

impl CustomTiming {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn execute_type(&self) -> &'static str {
        self.execute_type
    }

    pub fn command_string(&self) -> &str {
        &self.command
    }

    pub fn start_offset(&self) -> Duration {
        self.start_offset
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }
}
