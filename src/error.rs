//! Error types shared across the profiler.

use thiserror::Error;
use uuid::Uuid;

/// Errors raised by the profiling path.
///
/// None of these reach the inbound caller: the middleware logs and drops
/// them, and the results endpoint maps lookup failures to 404.
#[derive(Debug, Error)]
pub enum ProfilerError {
    /// A span arrived after the owning request completed.
    #[error("session {0} is finalized")]
    SessionFinalized(Uuid),

    /// No session is stored under the requested id.
    #[error("session {0} not found")]
    SessionNotFound(Uuid),

    /// The id supplied to the results endpoint is not a valid session id.
    #[error("invalid session id: {0}")]
    InvalidSessionId(String),

    /// The `x-miniprofiler-ids` header could not be encoded.
    #[error("failed to encode profiler header: {0}")]
    HeaderEncoding(String),
}
