//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ProfilerConfig (validated, immutable)
//!     → shared by value with the server and profiler
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → routing policy swapped atomically
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; only the routing policy is reloadable
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use schema::ProfilerConfig;
pub use schema::ListenerConfig;
pub use schema::ProfilingConfig;
pub use schema::UpstreamConfig;
