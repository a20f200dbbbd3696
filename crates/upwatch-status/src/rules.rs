//! Status resolution rules.
//!
//! Resolution walks [`RULES`] in order and returns the first record a rule
//! produces. A rule either has sufficient, fresh evidence and decides, or
//! returns `None` and defers to the next tier. The final fallback always
//! decides.
//!
//! | Tier | Rule | Source |
//! |---|---|---|
//! | 1 | configuration says disabled | `config` |
//! | 2 | a full window of recent requests | `recent_requests` |
//! | 3 | health check younger than 2× the check interval | `health_check` |
//! | 4 | boolean manual test younger than the manual window | `manual_test` |
//! | 5 | configuration says untested | `config` |
//! | 6 | configured status verbatim, else unknown | `config` |
//!
//! Freshness windows are exclusive: evidence whose age equals the window is
//! expired.

use tracing::trace;
use upwatch_core::config::{
    DEFAULT_HEALTH_CHECK_INTERVAL_SECS, DEFAULT_MANUAL_TEST_WINDOW_SECS,
    DEFAULT_RECENT_REQUEST_LIMIT,
};
use upwatch_core::{
    EndpointConfig, EvidenceSource, HealthCheckRecord, ManualTestRecord, RecentRequestSample,
    Status, StatusRecord,
};

/// Everything known about one endpoint at resolution time.
#[derive(Debug, Clone, Copy)]
pub struct Evidence<'a> {
    pub endpoint: &'a EndpointConfig,
    /// Most recent first.
    pub recent: &'a [RecentRequestSample],
    pub health: Option<&'a HealthCheckRecord>,
    pub manual: Option<&'a ManualTestRecord>,
}

/// Window sizes used by the rules for one refresh pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy {
    /// Recent requests needed before traffic counts as evidence.
    pub recent_sample_size: usize,
    /// Maximum health-check age, in millis.
    pub health_window_ms: u64,
    /// Maximum manual-test age, in millis.
    pub manual_window_ms: u64,
}

impl Policy {
    /// Build a policy from the health-check cadence; the health window is
    /// twice the cadence.
    pub fn new(
        health_check_interval_secs: u64,
        manual_window_secs: u64,
        recent_sample_size: usize,
    ) -> Self {
        Self {
            recent_sample_size,
            health_window_ms: health_check_interval_secs.saturating_mul(2_000),
            manual_window_ms: manual_window_secs.saturating_mul(1_000),
        }
    }
}

impl Default for Policy {
    fn default() -> Self {
        Self::new(
            DEFAULT_HEALTH_CHECK_INTERVAL_SECS,
            DEFAULT_MANUAL_TEST_WINDOW_SECS,
            DEFAULT_RECENT_REQUEST_LIMIT,
        )
    }
}

/// A single tier: decide, or defer with `None`.
pub type Rule = fn(&Evidence<'_>, &Policy, u64) -> Option<StatusRecord>;

/// Tiers in priority order, highest first.
pub const RULES: &[(&str, Rule)] = &[
    ("disabled", disabled_override),
    ("recent_requests", recent_traffic),
    ("health_check", fresh_health_check),
    ("manual_test", fresh_manual_test),
    ("untested", untested_marker),
];

/// Resolve one endpoint's status at wall-clock time `now_ms`.
pub fn resolve(evidence: &Evidence<'_>, policy: &Policy, now_ms: u64) -> StatusRecord {
    for (name, rule) in RULES {
        if let Some(record) = rule(evidence, policy, now_ms) {
            trace!(endpoint_id = %evidence.endpoint.id, rule = *name, status = %record.status, "rule matched");
            return record;
        }
    }
    config_fallback(evidence.endpoint)
}

/// Evidence stamped at `observed_at_ms` is still usable at `now_ms`.
///
/// Timestamps in the future count as age zero.
pub fn is_fresh(observed_at_ms: u64, now_ms: u64, window_ms: u64) -> bool {
    now_ms.saturating_sub(observed_at_ms) < window_ms
}

pub fn disabled_override(evidence: &Evidence<'_>, _: &Policy, _: u64) -> Option<StatusRecord> {
    evidence
        .endpoint
        .is_disabled()
        .then(|| StatusRecord::from_config(Status::Disabled))
}

pub fn recent_traffic(evidence: &Evidence<'_>, policy: &Policy, _: u64) -> Option<StatusRecord> {
    let size = policy.recent_sample_size;
    if size == 0 || evidence.recent.len() < size {
        return None;
    }
    let window = &evidence.recent[..size];
    let successes = window.iter().filter(|s| s.success).count();
    let status = match successes {
        0 => Status::Unavailable,
        n if n == size => Status::Available,
        _ => Status::Warning,
    };
    let latest = &window[0];
    let error_message = window
        .iter()
        .filter(|s| !s.success)
        .find_map(|s| s.error_message.clone());

    Some(StatusRecord {
        status,
        source: EvidenceSource::RecentRequests,
        observed_at_ms: latest.created_at_ms,
        latency_ms: latest.latency_ms,
        error_message,
    })
}

pub fn fresh_health_check(
    evidence: &Evidence<'_>,
    policy: &Policy,
    now_ms: u64,
) -> Option<StatusRecord> {
    let check = evidence.health?;
    let checked_at = check.last_check_at_ms?;
    if !is_fresh(checked_at, now_ms, policy.health_window_ms) {
        return None;
    }
    Some(StatusRecord {
        status: Status::from_success(check.success),
        source: EvidenceSource::HealthCheck,
        observed_at_ms: Some(checked_at),
        latency_ms: check.latency_ms,
        error_message: check.error_message.clone(),
    })
}

pub fn fresh_manual_test(
    evidence: &Evidence<'_>,
    policy: &Policy,
    now_ms: u64,
) -> Option<StatusRecord> {
    let test = evidence.manual?;
    let success = test.success.as_bool()?;
    if !is_fresh(test.tested_at_ms, now_ms, policy.manual_window_ms) {
        return None;
    }
    Some(StatusRecord {
        status: Status::from_success(success),
        source: EvidenceSource::ManualTest,
        observed_at_ms: Some(test.tested_at_ms),
        latency_ms: None,
        error_message: None,
    })
}

pub fn untested_marker(evidence: &Evidence<'_>, _: &Policy, _: u64) -> Option<StatusRecord> {
    evidence
        .endpoint
        .is_untested()
        .then(|| StatusRecord::from_config(Status::Untested))
}

/// Last resort: the configured status if it names a known state.
pub fn config_fallback(endpoint: &EndpointConfig) -> StatusRecord {
    let status = endpoint
        .status
        .as_deref()
        .and_then(Status::parse)
        .unwrap_or(Status::Unknown);
    StatusRecord::from_config(status)
}
