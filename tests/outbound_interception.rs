//! Outbound interception against a live upstream, outside the HTTP server.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use hyper_util::{client::legacy::Client, rt::TokioExecutor};
use tower::{ServiceBuilder, ServiceExt};

use miniprofiler_http::profiler::context;
use miniprofiler_http::profiler::results::ProfilerResult;
use miniprofiler_http::profiler::session::ProfilingSession;
use miniprofiler_http::profiler::timing::Outcome;
use miniprofiler_http::profiler::{OutboundProfilingLayer, ProfiledClient};

mod common;

#[tokio::test]
async fn test_hyper_client_layer_records_span() {
    let upstream = common::start_mock_upstream(Duration::from_secs(3)).await;
    let client = ServiceBuilder::new()
        .layer(OutboundProfilingLayer)
        .service(Client::builder(TokioExecutor::new()).build_http::<Body>());

    let session = Arc::new(ProfilingSession::new("/layer"));
    let url = format!("http://{}/api/ping", upstream);
    let request = Request::builder().uri(url.as_str()).body(Body::empty()).unwrap();

    let response = context::scope(session.clone(), client.oneshot(request)).await.unwrap();
    assert_eq!(response.status(), 200);

    let timings = session.custom_timings();
    assert_eq!(timings["http"].len(), 1);
    assert_eq!(timings["http"][0].command_string(), format!("GET {}", url));
    assert_eq!(timings["http"][0].outcome(), &Outcome::Success { status: 200 });
}

#[tokio::test]
async fn test_hyper_client_layer_marks_redirect_as_errored() {
    let upstream = common::start_mock_upstream(Duration::from_secs(3)).await;
    let client = ServiceBuilder::new()
        .layer(OutboundProfilingLayer)
        .service(Client::builder(TokioExecutor::new()).build_http::<Body>());

    let session = Arc::new(ProfilingSession::new("/layer"));
    let url = format!("http://{}/api/moved", upstream);
    let request = Request::builder().uri(url.as_str()).body(Body::empty()).unwrap();

    let response = context::scope(session.clone(), client.oneshot(request)).await.unwrap();
    assert_eq!(response.status(), 302);
    assert_eq!(response.headers()["location"], "/api/ping");

    session.finish();
    let result = serde_json::to_value(ProfilerResult::from_session(&session)).unwrap();
    let span = &result["Root"]["CustomTimings"]["http"][0];
    assert_eq!(span["CommandString"], format!("GET {}", url));
    assert_eq!(span["StatusCode"], 302);
    assert_eq!(span["Errored"], true);
}

#[tokio::test]
async fn test_hyper_client_layer_records_connection_failure() {
    let client = ServiceBuilder::new()
        .layer(OutboundProfilingLayer)
        .service(Client::builder(TokioExecutor::new()).build_http::<Body>());

    let session = Arc::new(ProfilingSession::new("/layer"));
    let url = format!("{}/api/ping", common::unreachable_endpoint().await);
    let request = Request::builder().uri(url.as_str()).body(Body::empty()).unwrap();

    let result = context::scope(session.clone(), client.oneshot(request)).await;
    assert!(result.is_err());

    let timings = session.custom_timings();
    assert_eq!(timings["http"].len(), 1);
    assert!(matches!(timings["http"][0].outcome(), Outcome::Failed { .. }));
}

#[tokio::test]
async fn test_profiled_client_passes_through_server_errors() {
    let upstream = common::start_mock_upstream(Duration::from_secs(3)).await;
    let client = ProfiledClient::default();
    let session = Arc::new(ProfilingSession::new("/fail"));

    let response = context::scope(session.clone(), async {
        client.get(format!("http://{}/api/fail", upstream)).send().await
    })
    .await
    .unwrap();

    assert_eq!(response.status(), 500);
    assert_eq!(response.text().await.unwrap(), "boom");
    assert_eq!(
        session.custom_timings()["http"][0].outcome(),
        &Outcome::HttpError { status: 500 }
    );
}

#[tokio::test]
async fn test_profiled_client_without_session_records_nothing() {
    let upstream = common::start_mock_upstream(Duration::from_secs(3)).await;
    let client = ProfiledClient::default();

    let response = client
        .get(format!("http://{}/api/ping", upstream))
        .send()
        .await
        .unwrap();
    assert_eq!(response.text().await.unwrap(), common::UPSTREAM_BODY);
    assert!(context::current().is_none());
}

#[tokio::test]
async fn test_fire_and_forget_call_with_propagated_context() {
    let upstream = common::start_mock_upstream(Duration::from_secs(3)).await;
    let client = ProfiledClient::default();
    let session = Arc::new(ProfilingSession::new("/background"));
    let url = format!("http://{}/api/ping", upstream);

    let handle = context::scope(session.clone(), async {
        let client = client.clone();
        let url = url.clone();
        tokio::spawn(context::propagate(async move { client.get(url).send().await }))
    })
    .await;

    handle.await.unwrap().unwrap();
    assert_eq!(session.timing_count("http"), 1);
    assert_eq!(
        session.custom_timings()["http"][0].command_string(),
        format!("GET {}", url)
    );
}
