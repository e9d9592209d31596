//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Profiler and server produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request ID and session ID flow through all log events
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
