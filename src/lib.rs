//! MiniProfiler-style profiling of outbound HTTP calls per inbound request.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod profiler;

pub use config::schema::ProfilerConfig;
pub use error::ProfilerError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use profiler::Profiler;
