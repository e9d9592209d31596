//! Instrumented sample routes.
//!
//! Every route exists once per upstream protocol (`/http/...` and
//! `/https/...`) and issues outbound calls through `ProfiledClient`, so a
//! profiled request ends up with one `http` span per call. Routes under
//! `/unprofiled` are identical but bypassed by the default policy.

use axum::{
    body::to_bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};

use crate::config::UpstreamConfig;
use crate::profiler::ProfiledClient;

/// Body returned when an outbound call fails.
pub const ERROR_BODY: &str = "Error";

/// Upstream scheme a route family talks to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Protocol {
    Http,
    Https,
}

impl Protocol {
    pub const ALL: [Protocol; 2] = [Protocol::Http, Protocol::Https];

    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
        }
    }
}

#[derive(Clone, Debug)]
pub struct HandlerState {
    pub client: ProfiledClient,
    pub upstream: UpstreamConfig,
}

impl HandlerState {
    fn endpoint(&self, protocol: Protocol) -> &str {
        match protocol {
            Protocol::Http => &self.upstream.endpoint,
            Protocol::Https => &self.upstream.https_endpoint,
        }
    }

    fn ping_url(&self, protocol: Protocol) -> String {
        format!("{}/api/ping", self.endpoint(protocol).trim_end_matches('/'))
    }
}

pub fn router(state: HandlerState) -> Router {
    Protocol::ALL
        .into_iter()
        .fold(Router::new(), |router, protocol| router.merge(protocol_routes(protocol)))
        .with_state(state)
}

fn protocol_routes(protocol: Protocol) -> Router<HandlerState> {
    let p = protocol.as_str();
    Router::new()
        .route(
            &format!("/{p}/send-get"),
            get(move |State(state): State<HandlerState>| send_get(state, protocol)),
        )
        .route(
            &format!("/{p}/send-post"),
            get(move |State(state): State<HandlerState>| send_post(state, protocol)),
        )
        .route(
            &format!("/{p}/send-parallel"),
            get(move |State(state): State<HandlerState>| send_parallel(state, protocol)),
        )
        .route(&format!("/{p}/broken"), get(broken))
        .route(
            &format!("/unprofiled/{p}/send-get"),
            get(move |State(state): State<HandlerState>| send_get(state, protocol)),
        )
}

async fn relay(result: reqwest::Result<reqwest::Response>) -> Response {
    match result {
        Ok(response) => match response.text().await {
            Ok(body) => body.into_response(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read upstream body");
                (StatusCode::BAD_GATEWAY, ERROR_BODY).into_response()
            }
        },
        Err(e) => {
            tracing::warn!(error = %e, "Upstream call failed");
            (StatusCode::BAD_GATEWAY, ERROR_BODY).into_response()
        }
    }
}

async fn send_get(state: HandlerState, protocol: Protocol) -> Response {
    relay(state.client.get(state.ping_url(protocol)).send().await).await
}

async fn send_post(state: HandlerState, protocol: Protocol) -> Response {
    relay(state.client.post(state.ping_url(protocol)).send().await).await
}

/// Issues two calls concurrently and joins their bodies.
async fn send_parallel(state: HandlerState, protocol: Protocol) -> Response {
    let url = state.ping_url(protocol);
    let (first, second) = tokio::join!(
        state.client.get(url.as_str()).send(),
        state.client.post(url.as_str()).send()
    );

    let mut bodies = Vec::with_capacity(2);
    for result in [first, second] {
        let relayed = relay(result).await;
        if relayed.status() != StatusCode::OK {
            return relayed;
        }
        match to_bytes(relayed.into_body(), usize::MAX).await {
            Ok(bytes) => bodies.push(String::from_utf8_lossy(&bytes).into_owned()),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to buffer relayed body");
                return (StatusCode::BAD_GATEWAY, ERROR_BODY).into_response();
            }
        }
    }
    bodies.join("\n").into_response()
}

/// Calls an unreachable target and answers with its own error body.
async fn broken(State(state): State<HandlerState>) -> &'static str {
    if let Err(e) = state.client.get(state.upstream.broken_endpoint.as_str()).send().await {
        tracing::debug!(error = %e, "Broken endpoint failed as expected");
    }
    ERROR_BODY
}
