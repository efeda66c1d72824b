//! Prometheus metrics for the access core.
//!
//! Counters are recorded through the `metrics` facade; without an installed
//! recorder they are no-ops, so library code and tests never need setup.

use metrics::counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::guard::GuardDecision;
use crate::session::SessionStatus;

pub const AUTH_TRANSITIONS: &str = "zigma_auth_transitions_total";
pub const STALE_RESOLUTIONS: &str = "zigma_stale_resolutions_total";
pub const GUARD_DECISIONS: &str = "zigma_guard_decisions_total";

/// Install the global Prometheus recorder and return the render handle.
pub fn install_recorder() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    Ok(handle)
}

/// A new state was published by the session resolver.
pub fn record_transition(status: SessionStatus) {
    counter!(AUTH_TRANSITIONS, "status" => status.as_str()).increment(1);
}

/// A role resolution came back for a session that is no longer current.
pub fn record_stale_resolution() {
    counter!(STALE_RESOLUTIONS).increment(1);
}

pub fn record_guard_decision(decision: &GuardDecision) {
    counter!(GUARD_DECISIONS, "decision" => decision.kind()).increment(1);
}
