//! Ambient binding of the active session to the current task.
//!
//! # Design Decisions
//! - Backed by a Tokio task-local, so concurrent requests never observe
//!   each other's session
//! - Spawned tasks do not inherit task-locals; `propagate` carries the
//!   binding across explicitly

use std::future::Future;
use std::sync::Arc;

use crate::profiler::session::ProfilingSession;

tokio::task_local! {
    static CURRENT_SESSION: Arc<ProfilingSession>;
}

/// The session bound to the running task, if any.
pub fn current() -> Option<Arc<ProfilingSession>> {
    CURRENT_SESSION.try_with(|session| session.clone()).ok()
}

/// Run `fut` with `session` bound as the active session.
pub async fn scope<F>(session: Arc<ProfilingSession>, fut: F) -> F::Output
where
    F: Future,
{
    CURRENT_SESSION.scope(session, fut).await
}

/// Wrap `fut` so it runs under the caller's active session, wherever it is
/// polled. Use before `tokio::spawn` for fire-and-forget outbound calls.
pub fn propagate<F>(fut: F) -> impl Future<Output = F::Output>
where
    F: Future,
{
    let session = current();
    async move {
        match session {
            Some(session) => CURRENT_SESSION.scope(session, fut).await,
            None => fut.await,
        }
    }
}
