//! Profiling session model.
//!
//! # Responsibilities
//! - Hold the timing tree for one inbound request
//! - Accept spans while the request is in flight
//! - Freeze the tree once the request completes
//!
//! # Design Decisions
//! - Custom timings are append-only; `finish` closes the session for writes
//! - Interior mutability so a session can be shared via `Arc` between the
//!   registry, the middleware and any number of in-flight outbound calls

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant, SystemTime};
use uuid::Uuid;

use crate::error::ProfilerError;
use crate::profiler::timing::{CustomTiming, Outcome, PendingTiming};

#[derive(Debug, Default)]
struct SessionState {
    custom_timings: BTreeMap<String, Vec<CustomTiming>>,
    duration: Option<Duration>,
}

/// The accumulated timing tree for one profiled inbound request.
#[derive(Debug)]
pub struct ProfilingSession {
    id: Uuid,
    root_id: Uuid,
    name: String,
    started_at: SystemTime,
    started: Instant,
    state: Mutex<SessionState>,
}

impl ProfilingSession {
    /// Start a new session named after the inbound request.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            root_id: Uuid::new_v4(),
            name: name.into(),
            started_at: SystemTime::now(),
            started: Instant::now(),
            state: Mutex::new(SessionState::default()),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Id of the root timing node.
    pub fn root_id(&self) -> Uuid {
        self.root_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wall-clock start, used for the `Started` field of the results.
    pub fn started_at(&self) -> SystemTime {
        self.started_at
    }

    /// Monotonic start; span offsets are relative to this.
    pub fn started(&self) -> Instant {
        self.started
    }

    pub fn age(&self) -> Duration {
        self.started.elapsed()
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Settle a pending span and append it under its category.
    pub fn record(&self, pending: PendingTiming, outcome: Outcome) -> Result<(), ProfilerError> {
        let timing = pending.complete(self.started, outcome);
        self.add_custom_timing(timing)
    }

    /// Append a completed span. Rejected once the session is finished.
    pub fn add_custom_timing(&self, timing: CustomTiming) -> Result<(), ProfilerError> {
        let mut state = self.state();
        if state.duration.is_some() {
            return Err(ProfilerError::SessionFinalized(self.id));
        }
        state
            .custom_timings
            .entry(timing.execute_type().to_string())
            .or_default()
            .push(timing);
        Ok(())
    }

    /// Stamp the root end time. Idempotent: later calls keep the first stamp.
    pub fn finish(&self) -> Duration {
        let mut state = self.state();
        *state.duration.get_or_insert_with(|| self.started.elapsed())
    }

    pub fn is_finished(&self) -> bool {
        self.state().duration.is_some()
    }

    /// Root duration, `None` while the request is still in flight.
    pub fn duration(&self) -> Option<Duration> {
        self.state().duration
    }

    /// Copy of the custom timings at this instant.
    pub fn custom_timings(&self) -> BTreeMap<String, Vec<CustomTiming>> {
        self.state().custom_timings.clone()
    }

    /// Number of spans recorded under `category`.
    pub fn timing_count(&self, category: &str) -> usize {
        self.state()
            .custom_timings
            .get(category)
            .map(Vec::len)
            .unwrap_or(0)
    }
}
