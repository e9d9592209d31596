//! Routing policy: decides per inbound request whether to profile.
//!
//! # Design Decisions
//! - Policies are pure predicates, evaluated once before any session exists
//! - Path matching is case-sensitive prefix matching, no regex
//! - The config-driven policy can be swapped atomically on reload

use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::body::Body;
use axum::http::Request;

use crate::config::ProfilingConfig;

/// Predicate gating session creation for an inbound request.
pub trait RoutingPolicy: Send + Sync + std::fmt::Debug {
    /// Returns true if the request should be profiled.
    fn should_profile(&self, req: &Request<Body>) -> bool;
}

/// Profiles every request except those under one of the excluded prefixes.
#[derive(Debug, Clone)]
pub struct PathPrefixPolicy {
    enabled: bool,
    excluded_prefixes: Vec<String>,
}

impl PathPrefixPolicy {
    pub fn new<I, S>(excluded_prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            enabled: true,
            excluded_prefixes: excluded_prefixes.into_iter().map(Into::into).collect(),
        }
    }

    /// A policy that profiles nothing.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            excluded_prefixes: Vec::new(),
        }
    }

    pub fn from_config(config: &ProfilingConfig) -> Self {
        if config.enabled {
            Self::new(config.unprofiled_prefixes.iter().cloned())
        } else {
            Self::disabled()
        }
    }

    /// Evaluate against a bare path.
    pub fn allows_path(&self, path: &str) -> bool {
        self.enabled && !self.excluded_prefixes.iter().any(|p| path.starts_with(p.as_str()))
    }
}

impl Default for PathPrefixPolicy {
    fn default() -> Self {
        Self::new(["/unprofiled"])
    }
}

impl RoutingPolicy for PathPrefixPolicy {
    fn should_profile(&self, req: &Request<Body>) -> bool {
        self.allows_path(req.uri().path())
    }
}

/// Adapts a closure into a policy.
pub struct FnPolicy<F>(F);

impl<F> FnPolicy<F>
where
    F: Fn(&Request<Body>) -> bool + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> std::fmt::Debug for FnPolicy<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FnPolicy")
    }
}

impl<F> RoutingPolicy for FnPolicy<F>
where
    F: Fn(&Request<Body>) -> bool + Send + Sync,
{
    fn should_profile(&self, req: &Request<Body>) -> bool {
        (self.0)(req)
    }
}

/// A `PathPrefixPolicy` that can be replaced while the server runs.
#[derive(Debug)]
pub struct ReloadablePolicy {
    current: ArcSwap<PathPrefixPolicy>,
}

impl ReloadablePolicy {
    pub fn new(policy: PathPrefixPolicy) -> Self {
        Self {
            current: ArcSwap::from_pointee(policy),
        }
    }

    /// Swap in the policy described by a freshly loaded config.
    pub fn update(&self, config: &ProfilingConfig) {
        let policy = PathPrefixPolicy::from_config(config);
        tracing::info!(
            enabled = policy.enabled,
            excluded_prefixes = ?policy.excluded_prefixes,
            "Routing policy updated"
        );
        self.current.store(Arc::new(policy));
    }

    pub fn current(&self) -> Arc<PathPrefixPolicy> {
        self.current.load_full()
    }
}

impl RoutingPolicy for ReloadablePolicy {
    fn should_profile(&self, req: &Request<Body>) -> bool {
        self.current.load().should_profile(req)
    }
}
