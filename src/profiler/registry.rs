//! Session registry.
//!
//! # Responsibilities
//! - Store sessions by id for later retrieval
//! - Bound memory: cap entry count and expire old sessions
//!
//! # Design Decisions
//! - `DashMap` gives per-id atomic put/get without a global lock
//! - Insertion order is tracked separately so the oldest entry is evicted
//!   first when the cap is hit
//! - TTL expiry runs on a background sweeper tied to the shutdown signal

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::broadcast;
use tokio::time;
use uuid::Uuid;

use crate::config::ProfilingConfig;
use crate::observability::metrics;
use crate::profiler::session::ProfilingSession;

/// Process-wide store of profiling sessions.
///
/// Cloning is cheap and every clone shares the same storage.
#[derive(Clone, Debug)]
pub struct SessionRegistry {
    inner: Arc<DashMap<Uuid, Arc<ProfilingSession>>>,
    order: Arc<Mutex<VecDeque<Uuid>>>,
    max_sessions: usize,
    ttl: Duration,
}

impl SessionRegistry {
    /// Create a registry holding at most `max_sessions`, each kept for `ttl`.
    pub fn new(max_sessions: usize, ttl: Duration) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            order: Arc::new(Mutex::new(VecDeque::new())),
            max_sessions: max_sessions.max(1),
            ttl,
        }
    }

    pub fn from_config(config: &ProfilingConfig) -> Self {
        Self::new(config.max_sessions, Duration::from_secs(config.session_ttl_secs))
    }

    /// Store a session under `id`, replacing any previous entry.
    ///
    /// A replaced id moves to the back of the eviction order, so `order`
    /// never holds the same id twice.
    pub fn put(&self, id: Uuid, session: Arc<ProfilingSession>) {
        let evicted = {
            let mut order = self.order.lock().unwrap_or_else(|p| p.into_inner());
            if self.inner.insert(id, session).is_some() {
                order.retain(|existing| *existing != id);
            }
            order.push_back(id);
            let mut evicted = 0;
            while self.inner.len() > self.max_sessions {
                match order.pop_front() {
                    Some(oldest) => {
                        if self.inner.remove(&oldest).is_some() {
                            evicted += 1;
                        }
                    }
                    None => break,
                }
            }
            evicted
        };

        if evicted > 0 {
            tracing::debug!(evicted, max_sessions = self.max_sessions, "Evicted oldest profiling sessions");
            metrics::record_sessions_evicted("capacity", evicted);
        }
        metrics::record_sessions_stored(self.inner.len());
    }

    /// Look up a session by id.
    pub fn get(&self, id: &Uuid) -> Option<Arc<ProfilingSession>> {
        self.inner.get(id).map(|r| r.value().clone())
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Drop every session older than the TTL. Returns how many were removed.
    pub fn evict_expired(&self) -> usize {
        let before = self.inner.len();
        self.inner.retain(|_, session| session.age() < self.ttl);
        let removed = before.saturating_sub(self.inner.len());

        if removed > 0 {
            let mut order = self.order.lock().unwrap_or_else(|p| p.into_inner());
            order.retain(|id| self.inner.contains_key(id));
            metrics::record_sessions_evicted("expired", removed);
        }
        metrics::record_sessions_stored(self.inner.len());
        removed
    }

    /// Periodically expire sessions until shutdown is signalled.
    pub async fn run_sweeper(self, interval: Duration, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval_secs = interval.as_secs(),
            ttl_secs = self.ttl.as_secs(),
            "Session sweeper starting"
        );

        let mut ticker = time::interval(interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = self.evict_expired();
                    if removed > 0 {
                        tracing::debug!(removed, remaining = self.len(), "Expired profiling sessions");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Session sweeper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}
