//! Results endpoint: serializes a stored session on request.
//!
//! # Responsibilities
//! - Look a session up by id
//! - Render its timing tree in the MiniProfiler JSON shape
//! - Report unknown or malformed ids as 404
//!
//! # Design Decisions
//! - Rendering reads a snapshot; a finished session always renders the same
//! - `popup` is accepted for client compatibility; the JSON body is the
//!   same either way

use std::collections::BTreeMap;
use std::time::{Duration, UNIX_EPOCH};

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ProfilerError;
use crate::observability::metrics;
use crate::profiler::session::ProfilingSession;
use crate::profiler::timing::CustomTiming;
use crate::profiler::Profiler;

/// Top-level results document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProfilerResult {
    pub id: Uuid,
    pub name: String,
    /// Milliseconds since the Unix epoch.
    pub started: u64,
    pub duration_milliseconds: Option<f64>,
    pub has_custom_timings: bool,
    pub custom_timing_stats: BTreeMap<String, CustomTimingStat>,
    pub root: TimingResult,
}

/// Per-category totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CustomTimingStat {
    pub count: usize,
    pub duration: f64,
}

/// A node of the timing tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TimingResult {
    pub id: Uuid,
    pub name: String,
    pub start_milliseconds: f64,
    pub duration_milliseconds: Option<f64>,
    pub children: Vec<TimingResult>,
    pub custom_timings: BTreeMap<String, Vec<CustomTimingResult>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CustomTimingResult {
    pub id: Uuid,
    pub execute_type: String,
    pub command_string: String,
    pub start_milliseconds: f64,
    pub duration_milliseconds: f64,
    pub errored: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Milliseconds rounded to one decimal place.
fn millis(d: Duration) -> f64 {
    (d.as_secs_f64() * 10_000.0).round() / 10.0
}

impl From<&CustomTiming> for CustomTimingResult {
    fn from(timing: &CustomTiming) -> Self {
        Self {
            id: timing.id(),
            execute_type: timing.execute_type().to_string(),
            command_string: timing.command_string().to_string(),
            start_milliseconds: millis(timing.start_offset()),
            duration_milliseconds: millis(timing.duration()),
            errored: timing.outcome().is_error(),
            status_code: timing.outcome().status(),
            error: timing.outcome().error_message(),
        }
    }
}

impl ProfilerResult {
    /// Render the session as it stands now.
    pub fn from_session(session: &ProfilingSession) -> Self {
        let custom_timings: BTreeMap<String, Vec<CustomTimingResult>> = session
            .custom_timings()
            .iter()
            .map(|(category, timings)| {
                let rendered = timings.iter().map(CustomTimingResult::from).collect::<Vec<_>>();
                (category.clone(), rendered)
            })
            .collect();

        let custom_timing_stats = custom_timings
            .iter()
            .map(|(category, timings)| {
                let stat = CustomTimingStat {
                    count: timings.len(),
                    duration: timings.iter().map(|t| t.duration_milliseconds).sum(),
                };
                (category.clone(), stat)
            })
            .collect();

        let duration = session.duration().map(millis);

        Self {
            id: session.id(),
            name: session.name().to_string(),
            started: session
                .started_at()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis() as u64,
            duration_milliseconds: duration,
            has_custom_timings: !custom_timings.is_empty(),
            custom_timing_stats,
            root: TimingResult {
                id: session.root_id(),
                name: session.name().to_string(),
                start_milliseconds: 0.0,
                duration_milliseconds: duration,
                children: Vec::new(),
                custom_timings,
            },
        }
    }
}

/// Form/query fields accepted by the results endpoint.
#[derive(Debug, Deserialize)]
pub struct ResultsRequest {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub popup: Option<String>,
}

/// Routes served under the profiler's resource path.
pub fn resources_router(profiler: Profiler, resource_path: &str) -> Router {
    let base = resource_path.trim_end_matches('/');
    let results = post(results_form).get(results_query);
    Router::new()
        .route(&format!("{}/results", base), results.clone())
        .route(&format!("{}/results/", base), results)
        .with_state(profiler)
}

async fn results_form(State(profiler): State<Profiler>, Form(request): Form<ResultsRequest>) -> Response {
    respond(&profiler, &request)
}

async fn results_query(State(profiler): State<Profiler>, Query(request): Query<ResultsRequest>) -> Response {
    respond(&profiler, &request)
}

fn respond(profiler: &Profiler, request: &ResultsRequest) -> Response {
    match profiler.results(&request.id) {
        Ok(result) => {
            metrics::record_results_lookup("found");
            tracing::debug!(session_id = %result.id, popup = ?request.popup, "Serving profiler results");
            Json(result).into_response()
        }
        Err(e) => {
            metrics::record_results_lookup("not_found");
            tracing::debug!(id = %request.id, error = %e, "Profiler results lookup failed");
            (StatusCode::NOT_FOUND, e.to_string()).into_response()
        }
    }
}

/// Parse an id as supplied by a client.
pub fn parse_session_id(id: &str) -> Result<Uuid, ProfilerError> {
    Uuid::parse_str(id.trim()).map_err(|_| ProfilerError::InvalidSessionId(id.to_string()))
}
