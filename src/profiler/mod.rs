//! Request profiling subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → middleware.rs (policy.rs decides; session.rs created)
//!     → registry.rs (session stored under its id)
//!     → context.rs (session bound to the request's task)
//!     → handler issues outbound calls
//!         → interceptor.rs (timing.rs span per call, appended to session)
//!     → middleware.rs (session finished, x-miniprofiler-ids set)
//!
//! Later:
//!     POST <resource_path>/results/ (id, popup)
//!     → results.rs (registry lookup → MiniProfiler JSON)
//! ```
//!
//! # Design Decisions
//! - The registry is an explicit, cloneable handle owned by `Profiler`,
//!   never module-level state
//! - Ambient binding uses a task-local, so concurrent requests are isolated
//! - Profiling faults degrade to "no data", never to a failed request

pub mod context;
pub mod interceptor;
pub mod middleware;
pub mod policy;
pub mod registry;
pub mod results;
pub mod session;
pub mod timing;

use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;

use crate::error::ProfilerError;
use self::policy::RoutingPolicy;
use self::registry::SessionRegistry;
use self::results::{parse_session_id, ProfilerResult};
use self::session::ProfilingSession;

pub use self::context::{current, propagate};
pub use self::interceptor::{instrument, OutboundProfilingLayer, ProfiledClient};
pub use self::middleware::{profiling_middleware, PROFILER_IDS_HEADER};

/// Handle shared by the middleware and the results endpoint.
#[derive(Clone, Debug)]
pub struct Profiler {
    registry: SessionRegistry,
    policy: Arc<dyn RoutingPolicy>,
}

impl Profiler {
    pub fn new(registry: SessionRegistry, policy: Arc<dyn RoutingPolicy>) -> Self {
        Self { registry, policy }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn policy(&self) -> &dyn RoutingPolicy {
        self.policy.as_ref()
    }

    /// Create a session for `req` and store it in the registry.
    pub fn start_session(&self, req: &Request<Body>) -> Arc<ProfilingSession> {
        let session = Arc::new(ProfilingSession::new(req.uri().path()));
        self.registry.put(session.id(), session.clone());
        crate::observability::metrics::record_session_started();
        session
    }

    /// Look up and render a session by its client-supplied id.
    pub fn results(&self, id: &str) -> Result<ProfilerResult, ProfilerError> {
        let id = parse_session_id(id)?;
        let session = self.registry.get(&id).ok_or(ProfilerError::SessionNotFound(id))?;
        Ok(ProfilerResult::from_session(&session))
    }
}
