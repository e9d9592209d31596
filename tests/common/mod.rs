//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    http::{header, StatusCode},
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use miniprofiler_http::config::ProfilerConfig;
use miniprofiler_http::{HttpServer, Profiler, Shutdown};

/// Body served by the mock upstream's `/api/ping`.
pub const UPSTREAM_BODY: &str = "It Works!";

/// Start a mock upstream API on an ephemeral port.
///
/// - `/api/ping` (GET, POST): 200 "It Works!"
/// - `/api/fail`: 500
/// - `/api/moved`: 302 to `/api/ping`
/// - `/api/slow`: responds after `slow_delay`
pub async fn start_mock_upstream(slow_delay: Duration) -> SocketAddr {
    let app = Router::new()
        .route("/api/ping", get(|| async { UPSTREAM_BODY }).post(|| async { UPSTREAM_BODY }))
        .route("/api/fail", get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }))
        .route(
            "/api/moved",
            get(|| async { (StatusCode::FOUND, [(header::LOCATION, "/api/ping")]) }),
        )
        .route(
            "/api/slow",
            get(move || async move {
                tokio::time::sleep(slow_delay).await;
                UPSTREAM_BODY
            }),
        );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// A URL on a local port with nothing listening.
pub async fn unreachable_endpoint() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

/// Config pointing the sample handlers at `upstream`.
///
/// The mock speaks plain HTTP, so calls to `https_endpoint` fail during the
/// TLS handshake while still targeting a real `https://` URL.
pub async fn test_config(upstream: SocketAddr) -> ProfilerConfig {
    let mut config = ProfilerConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.upstream.endpoint = format!("http://{}", upstream);
    config.upstream.https_endpoint = format!("https://{}", upstream);
    config.upstream.broken_endpoint = unreachable_endpoint().await;
    config
}

#[allow(dead_code)]
pub struct TestServer {
    pub addr: SocketAddr,
    pub profiler: Profiler,
    pub shutdown: Shutdown,
    pub config_updates: mpsc::UnboundedSender<ProfilerConfig>,
}

#[allow(dead_code)]
impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Fetch results the way the MiniProfiler UI does.
    pub async fn results(&self, client: &reqwest::Client, id: &str) -> reqwest::Response {
        client
            .post(self.url("/mini-profiler-resources/results/"))
            .form(&[("id", id), ("popup", "1")])
            .send()
            .await
            .expect("server unreachable")
    }
}

/// Start the instrumented server on an ephemeral port.
pub async fn start_server(config: ProfilerConfig) -> TestServer {
    let server = HttpServer::new(config).unwrap();
    let profiler = server.profiler().clone();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let (config_updates, updates_rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let _ = server.run(listener, updates_rx, server_shutdown).await;
    });

    TestServer {
        addr,
        profiler,
        shutdown,
        config_updates,
    }
}

/// Session ids from `x-miniprofiler-ids`, if present.
pub fn profiler_ids(response: &reqwest::Response) -> Option<Vec<String>> {
    response
        .headers()
        .get("x-miniprofiler-ids")
        .map(|v| serde_json::from_slice(v.as_bytes()).expect("header is not a JSON array"))
}
