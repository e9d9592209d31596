//! Inbound request middleware.
//!
//! # Responsibilities
//! - Consult the routing policy once per request
//! - Create, register and bind a session for profiled requests
//! - Finish the session and emit `x-miniprofiler-ids` on the response
//!
//! # Design Decisions
//! - Profiling is best-effort: faults here are logged, never returned
//! - The session is finished before the response leaves the middleware,
//!   so a client that reads the header always finds a complete tree

use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::error::ProfilerError;
use crate::http::request::X_REQUEST_ID;
use crate::observability::metrics;
use crate::profiler::context;
use crate::profiler::Profiler;

/// Response header listing the session ids created for the request.
pub const PROFILER_IDS_HEADER: &str = "x-miniprofiler-ids";

/// Encode ids as the JSON array carried by `x-miniprofiler-ids`.
pub fn ids_header_value(ids: &[Uuid]) -> Result<HeaderValue, ProfilerError> {
    let json = serde_json::to_string(ids).map_err(|e| ProfilerError::HeaderEncoding(e.to_string()))?;
    HeaderValue::from_str(&json).map_err(|e| ProfilerError::HeaderEncoding(e.to_string()))
}

pub async fn profiling_middleware(
    State(profiler): State<Profiler>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if !profiler.policy().should_profile(&req) {
        metrics::record_session_skipped();
        return next.run(req).await;
    }

    let request_id = req
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let session = profiler.start_session(&req);
    let header = match ids_header_value(&[session.id()]) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(session_id = %session.id(), error = %e, "Profiler header not set");
            metrics::record_infrastructure_error("header");
            None
        }
    };

    tracing::debug!(
        request_id = %request_id,
        session_id = %session.id(),
        name = %session.name(),
        "Profiling session started"
    );

    let mut response = context::scope(session.clone(), next.run(req)).await;
    let duration = session.finish();

    if let Some(value) = header {
        response.headers_mut().insert(PROFILER_IDS_HEADER, value);
    }

    tracing::debug!(
        request_id = %request_id,
        session_id = %session.id(),
        status = %response.status(),
        duration_ms = duration.as_millis() as u64,
        http_calls = session.timing_count("http"),
        "Profiling session finished"
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::{routing::get, Router};
    use tower::ServiceExt;

    use crate::profiler::policy::PathPrefixPolicy;
    use crate::profiler::registry::SessionRegistry;
    use crate::profiler::timing::{command_string, Outcome, PendingTiming, HTTP_EXECUTE_TYPE};

    fn profiler() -> Profiler {
        Profiler::new(
            SessionRegistry::new(100, Duration::from_secs(60)),
            Arc::new(PathPrefixPolicy::default()),
        )
    }

    async fn handler() -> &'static str {
        if let Some(session) = context::current() {
            let pending = PendingTiming::start(HTTP_EXECUTE_TYPE, command_string("GET", "http://up/api"));
            session.record(pending, Outcome::Success { status: 200 }).unwrap();
        }
        "ok"
    }

    fn app(profiler: Profiler) -> Router {
        Router::new()
            .route("/work", get(handler))
            .route("/unprofiled/work", get(handler))
            .layer(axum::middleware::from_fn_with_state(profiler, profiling_middleware))
    }

    fn header_ids(response: &Response) -> Option<Vec<Uuid>> {
        response
            .headers()
            .get(PROFILER_IDS_HEADER)
            .map(|v| serde_json::from_slice(v.as_bytes()).unwrap())
    }

    #[test]
    fn test_ids_header_value() {
        let id = Uuid::new_v4();
        let value = ids_header_value(&[id]).unwrap();
        assert_eq!(value.to_str().unwrap(), format!("[\"{}\"]", id));
    }

    #[tokio::test]
    async fn test_profiled_request_registers_finished_session() {
        let profiler = profiler();
        let response = app(profiler.clone())
            .oneshot(Request::builder().uri("/work").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let ids = header_ids(&response).expect("header missing");
        assert_eq!(ids.len(), 1);

        let session = profiler.registry().get(&ids[0]).expect("session not registered");
        assert!(session.is_finished());
        assert_eq!(session.name(), "/work");
        assert_eq!(session.timing_count("http"), 1);
    }

    #[tokio::test]
    async fn test_unprofiled_request_has_no_session() {
        let profiler = profiler();
        let response = app(profiler.clone())
            .oneshot(Request::builder().uri("/unprofiled/work").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert!(header_ids(&response).is_none());
        assert!(profiler.registry().is_empty());
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"ok");
    }
}
