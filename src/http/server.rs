//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the instrumented handlers
//! - Wire up middleware (request ID, tracing, profiling, timeout)
//! - Mount the profiler's results endpoint
//! - Run background tasks (session sweeper, policy reload)
//! - Serve until shutdown

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ProfilerConfig;
use crate::http::handlers::{self, HandlerState};
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::profiler::policy::{PathPrefixPolicy, ReloadablePolicy};
use crate::profiler::registry::SessionRegistry;
use crate::profiler::results::resources_router;
use crate::profiler::{profiling_middleware, ProfiledClient, Profiler};

/// Instrumented HTTP server.
pub struct HttpServer {
    router: Router,
    config: ProfilerConfig,
    profiler: Profiler,
    policy: Arc<ReloadablePolicy>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProfilerConfig) -> Result<Self, reqwest::Error> {
        let policy = Arc::new(ReloadablePolicy::new(PathPrefixPolicy::from_config(&config.profiling)));
        let registry = SessionRegistry::from_config(&config.profiling);
        let profiler = Profiler::new(registry, policy.clone());

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.outbound_secs))
            .build()?;

        let state = HandlerState {
            client: ProfiledClient::new(client),
            upstream: config.upstream.clone(),
        };

        let router = Self::build_router(&config, profiler.clone(), state);
        Ok(Self {
            router,
            config,
            profiler,
            policy,
        })
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// The timeout sits inside the profiling layer so a timed-out request
    /// still gets a finished session and the ids header.
    #[allow(deprecated)]
    fn build_router(config: &ProfilerConfig, profiler: Profiler, state: HandlerState) -> Router {
        handlers::router(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(axum::middleware::from_fn_with_state(profiler.clone(), profiling_middleware))
            .merge(resources_router(profiler, &config.profiling.resource_path))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<ProfilerConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let sweeper = self.profiler.registry().clone();
        let interval = Duration::from_secs(self.config.profiling.sweep_interval_secs);
        tokio::spawn(sweeper.run_sweeper(interval, shutdown.resubscribe()));

        let policy = self.policy.clone();
        tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                policy.update(&config.profiling);
            }
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProfilerConfig {
        &self.config
    }

    pub fn profiler(&self) -> &Profiler {
        &self.profiler
    }

    /// Router for in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }
}
