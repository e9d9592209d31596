//! Outbound call interception.
//!
//! # Responsibilities
//! - Time each outbound HTTP call issued under an active session
//! - Record exactly one span per call attempt, whatever the outcome
//! - Hand the call's result back to the caller untouched
//!
//! # Design Decisions
//! - `instrument` is the single timing primitive; the reqwest wrapper and
//!   the tower layer both delegate to it
//! - A drop guard records a `Cancelled` span when the call future is
//!   abandoned before it settles (caller timeout, client disconnect)
//! - Without an active session the call runs unmodified

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::future::BoxFuture;
use reqwest::{IntoUrl, Method};
use serde::Serialize;
use tower::{Layer, Service};

use crate::error::ProfilerError;
use crate::observability::metrics;
use crate::profiler::context;
use crate::profiler::session::ProfilingSession;
use crate::profiler::timing::{command_string, Outcome, PendingTiming, HTTP_EXECUTE_TYPE};

/// Responses whose status can be classified into an `Outcome`.
pub trait OutboundResponse {
    fn status_code(&self) -> u16;
}

impl OutboundResponse for reqwest::Response {
    fn status_code(&self) -> u16 {
        self.status().as_u16()
    }
}

impl<B> OutboundResponse for axum::http::Response<B> {
    fn status_code(&self) -> u16 {
        self.status().as_u16()
    }
}

/// An in-flight span. Settles on `finish`, or as `Cancelled` on drop.
struct SpanGuard {
    session: Arc<ProfilingSession>,
    pending: Option<PendingTiming>,
}

impl SpanGuard {
    fn start(session: Arc<ProfilingSession>, command: String) -> Self {
        Self {
            session,
            pending: Some(PendingTiming::start(HTTP_EXECUTE_TYPE, command)),
        }
    }

    fn finish(mut self, outcome: Outcome) {
        if let Some(pending) = self.pending.take() {
            record(&self.session, pending, outcome);
        }
    }
}

impl Drop for SpanGuard {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            record(&self.session, pending, Outcome::Cancelled);
        }
    }
}

fn record(session: &ProfilingSession, pending: PendingTiming, outcome: Outcome) {
    let elapsed = pending.elapsed();
    metrics::record_outbound_call(outcome.label(), elapsed);

    tracing::debug!(
        session_id = %session.id(),
        command = %pending.command(),
        outcome = outcome.label(),
        duration_ms = elapsed.as_millis() as u64,
        "Outbound call settled"
    );

    if let Err(e) = session.record(pending, outcome) {
        match e {
            ProfilerError::SessionFinalized(_) => {
                tracing::debug!(session_id = %session.id(), "Dropping span for finished session");
            }
            other => {
                tracing::warn!(session_id = %session.id(), error = %other, "Failed to record span");
                metrics::record_infrastructure_error("record_span");
            }
        }
    }
}

/// Time `call` as an outbound `method url` request under the active session.
///
/// The call's result is returned exactly as produced.
pub async fn instrument<F, T, E>(method: impl Display, url: impl Display, call: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    T: OutboundResponse,
    E: Display,
{
    let Some(session) = context::current() else {
        return call.await;
    };

    let guard = SpanGuard::start(session, command_string(&method.to_string(), &url.to_string()));
    let result = call.await;
    let outcome = match &result {
        Ok(response) => Outcome::from_status(response.status_code()),
        Err(e) => Outcome::Failed { error: e.to_string() },
    };
    guard.finish(outcome);
    result
}

/// A `reqwest::Client` whose calls are recorded on the active session.
#[derive(Debug, Clone, Default)]
pub struct ProfiledClient {
    inner: reqwest::Client,
}

impl ProfiledClient {
    pub fn new(inner: reqwest::Client) -> Self {
        Self { inner }
    }

    /// The wrapped client, for calls that should not be profiled.
    pub fn inner(&self) -> &reqwest::Client {
        &self.inner
    }

    pub fn get<U: IntoUrl>(&self, url: U) -> ProfiledRequestBuilder {
        self.request(Method::GET, url)
    }

    pub fn post<U: IntoUrl>(&self, url: U) -> ProfiledRequestBuilder {
        self.request(Method::POST, url)
    }

    pub fn put<U: IntoUrl>(&self, url: U) -> ProfiledRequestBuilder {
        self.request(Method::PUT, url)
    }

    pub fn delete<U: IntoUrl>(&self, url: U) -> ProfiledRequestBuilder {
        self.request(Method::DELETE, url)
    }

    pub fn request<U: IntoUrl>(&self, method: Method, url: U) -> ProfiledRequestBuilder {
        ProfiledRequestBuilder {
            inner: self.inner.request(method, url),
        }
    }

    /// Execute a prebuilt request.
    pub async fn execute(&self, request: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        execute(&self.inner, request).await
    }
}

async fn execute(client: &reqwest::Client, request: reqwest::Request) -> reqwest::Result<reqwest::Response> {
    let method = request.method().clone();
    let url = request.url().clone();
    instrument(method, url, client.execute(request)).await
}

/// Mirror of `reqwest::RequestBuilder` whose `send` is profiled.
#[derive(Debug)]
pub struct ProfiledRequestBuilder {
    inner: reqwest::RequestBuilder,
}

impl ProfiledRequestBuilder {
    pub fn header<K, V>(self, key: K, value: V) -> Self
    where
        reqwest::header::HeaderName: TryFrom<K>,
        <reqwest::header::HeaderName as TryFrom<K>>::Error: Into<axum::http::Error>,
        reqwest::header::HeaderValue: TryFrom<V>,
        <reqwest::header::HeaderValue as TryFrom<V>>::Error: Into<axum::http::Error>,
    {
        Self { inner: self.inner.header(key, value) }
    }

    pub fn body<T: Into<reqwest::Body>>(self, body: T) -> Self {
        Self { inner: self.inner.body(body) }
    }

    pub fn json<T: Serialize + ?Sized>(self, json: &T) -> Self {
        Self { inner: self.inner.json(json) }
    }

    pub fn form<T: Serialize + ?Sized>(self, form: &T) -> Self {
        Self { inner: self.inner.form(form) }
    }

    pub fn query<T: Serialize + ?Sized>(self, query: &T) -> Self {
        Self { inner: self.inner.query(query) }
    }

    pub fn timeout(self, timeout: std::time::Duration) -> Self {
        Self { inner: self.inner.timeout(timeout) }
    }

    /// Send the request. A build error is returned as-is and records nothing,
    /// since no call was attempted.
    pub async fn send(self) -> reqwest::Result<reqwest::Response> {
        let (client, request) = self.inner.build_split();
        execute(&client, request?).await
    }
}

/// Tower layer profiling any HTTP client service, e.g. a hyper-util client.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutboundProfilingLayer;

impl<S> Layer<S> for OutboundProfilingLayer {
    type Service = ProfiledService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ProfiledService { inner }
    }
}

/// Service produced by `OutboundProfilingLayer`.
#[derive(Debug, Clone)]
pub struct ProfiledService<S> {
    inner: S,
}

impl<S, ReqBody, ResBody> Service<axum::http::Request<ReqBody>> for ProfiledService<S>
where
    S: Service<axum::http::Request<ReqBody>, Response = axum::http::Response<ResBody>>,
    S::Future: Send + 'static,
    S::Error: Display + Send + 'static,
    ResBody: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: axum::http::Request<ReqBody>) -> Self::Future {
        let method = req.method().clone();
        let uri = req.uri().clone();
        let call = self.inner.call(req);
        // Capture the binding now: the returned future may be polled elsewhere.
        Box::pin(context::propagate(instrument(method, uri, call)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    struct FakeResponse(u16);

    impl OutboundResponse for FakeResponse {
        fn status_code(&self) -> u16 {
            self.0
        }
    }

    #[tokio::test]
    async fn test_without_session_records_nothing() {
        let result: Result<FakeResponse, String> =
            instrument("GET", "http://x/api", async { Ok(FakeResponse(200)) }).await;
        assert_eq!(result.unwrap().0, 200);
    }

    #[tokio::test]
    async fn test_success_recorded() {
        let session = Arc::new(ProfilingSession::new("/http/send-get"));
        let result: Result<FakeResponse, String> = context::scope(
            session.clone(),
            instrument("GET", "http://localhost:9080/api/ping", async { Ok(FakeResponse(200)) }),
        )
        .await;

        assert!(result.is_ok());
        let timings = session.custom_timings();
        assert_eq!(timings["http"].len(), 1);
        assert_eq!(timings["http"][0].command_string(), "GET http://localhost:9080/api/ping");
        assert_eq!(timings["http"][0].outcome(), &Outcome::Success { status: 200 });
    }

    #[tokio::test]
    async fn test_error_recorded_and_passed_through() {
        let session = Arc::new(ProfilingSession::new("/http/broken"));
        let result: Result<FakeResponse, String> = context::scope(
            session.clone(),
            instrument("GET", "http://localhost:9", async { Err("connection refused".to_string()) }),
        )
        .await;

        assert_eq!(result.err().as_deref(), Some("connection refused"));
        let timings = session.custom_timings();
        assert_eq!(timings["http"].len(), 1);
        assert_eq!(
            timings["http"][0].outcome(),
            &Outcome::Failed { error: "connection refused".into() }
        );
    }

    #[tokio::test]
    async fn test_non_2xx_is_errored_but_returned() {
        let session = Arc::new(ProfilingSession::new("/"));
        let result: Result<FakeResponse, String> =
            context::scope(session.clone(), instrument("POST", "http://x", async { Ok(FakeResponse(503)) })).await;

        assert_eq!(result.unwrap().0, 503);
        assert_eq!(session.custom_timings()["http"][0].outcome(), &Outcome::HttpError { status: 503 });
    }

    #[tokio::test]
    async fn test_timeout_records_cancelled_span() {
        let session = Arc::new(ProfilingSession::new("/slow"));
        let slow = instrument("GET", "http://slow", async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, String>(FakeResponse(200))
        });
        let result = context::scope(session.clone(), tokio::time::timeout(Duration::from_millis(10), slow)).await;

        assert!(result.is_err());
        let timings = session.custom_timings();
        assert_eq!(timings["http"].len(), 1);
        assert_eq!(timings["http"][0].outcome(), &Outcome::Cancelled);
    }

    #[tokio::test]
    async fn test_concurrent_calls_each_append_once() {
        let session = Arc::new(ProfilingSession::new("/fanout"));
        context::scope(session.clone(), async {
            let calls = (0..5).map(|i| {
                instrument("GET", format!("http://x/{}", i), async move {
                    tokio::time::sleep(Duration::from_millis(5 * (5 - i))).await;
                    Ok::<_, String>(FakeResponse(200))
                })
            });
            futures_util::future::join_all(calls).await;
        })
        .await;

        assert_eq!(session.timing_count("http"), 5);
    }

    #[tokio::test]
    async fn test_late_span_after_finish_is_dropped() {
        let session = Arc::new(ProfilingSession::new("/"));
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        let handle = context::scope(session.clone(), async {
            tokio::spawn(context::propagate(instrument("GET", "http://late", async move {
                let _ = rx.await;
                Ok::<_, String>(FakeResponse(200))
            })))
        })
        .await;

        session.finish();
        tx.send(()).unwrap();
        handle.await.unwrap().unwrap();
        assert_eq!(session.timing_count("http"), 0);
    }
}
