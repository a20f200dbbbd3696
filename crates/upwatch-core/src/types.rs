//! Domain types shared across upwatch crates.
//!
//! Upstream-facing records (`EndpointConfig`, `HealthCheckRecord`,
//! `RecentRequestSample`) mirror what the data providers return. The
//! resolved [`StatusRecord`] is what the status engine caches and serves.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Unique identifier for a configured endpoint.
pub type EndpointId = String;

// ── Resolved status ───────────────────────────────────────────────

/// Availability verdict for an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Available,
    Unavailable,
    /// Some, but not all, recent requests succeeded.
    Warning,
    Disabled,
    Untested,
    Unknown,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Available => "available",
            Status::Unavailable => "unavailable",
            Status::Warning => "warning",
            Status::Disabled => "disabled",
            Status::Untested => "untested",
            Status::Unknown => "unknown",
        }
    }

    /// Parse a persisted status string. Returns `None` for anything
    /// outside the six known states.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "available" => Some(Status::Available),
            "unavailable" => Some(Status::Unavailable),
            "warning" => Some(Status::Warning),
            "disabled" => Some(Status::Disabled),
            "untested" => Some(Status::Untested),
            "unknown" => Some(Status::Unknown),
            _ => None,
        }
    }

    /// Map a pass/fail flag onto `Available`/`Unavailable`.
    pub fn from_success(success: bool) -> Self {
        if success {
            Status::Available
        } else {
            Status::Unavailable
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Which kind of evidence produced a [`StatusRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceSource {
    RecentRequests,
    HealthCheck,
    ManualTest,
    Config,
}

impl EvidenceSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvidenceSource::RecentRequests => "recent_requests",
            EvidenceSource::HealthCheck => "health_check",
            EvidenceSource::ManualTest => "manual_test",
            EvidenceSource::Config => "config",
        }
    }
}

impl fmt::Display for EvidenceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// The single resolved status for an endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub status: Status,
    pub source: EvidenceSource,
    /// Epoch millis of the evidence used, if the evidence carried a time.
    pub observed_at_ms: Option<u64>,
    pub latency_ms: Option<u64>,
    pub error_message: Option<String>,
}

impl StatusRecord {
    /// A record derived from configuration alone (no evidence metrics).
    pub fn from_config(status: Status) -> Self {
        Self {
            status,
            source: EvidenceSource::Config,
            observed_at_ms: None,
            latency_ms: None,
            error_message: None,
        }
    }
}

// ── Upstream inputs ───────────────────────────────────────────────

/// Endpoint configuration as served by the config provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub id: EndpointId,
    /// Client identity used when querying this endpoint's request history.
    pub client_type: String,
    /// Last persisted coarse state ("disabled", "untested", ...).
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default = "default_enabled")]
    pub is_enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl EndpointConfig {
    /// Configured state is `disabled`, either explicitly or via the
    /// enablement flag.
    pub fn is_disabled(&self) -> bool {
        !self.is_enabled || self.status.as_deref().map(str::trim) == Some("disabled")
    }

    /// Configured state is literally `untested`.
    pub fn is_untested(&self) -> bool {
        self.status.as_deref().map(str::trim) == Some("untested")
    }
}

/// Result of `fetch_config`: the endpoint list plus the health-check cadence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    pub endpoints: Vec<EndpointConfig>,
    /// Background health-check cadence. Absent or zero means "use the local default".
    #[serde(default)]
    pub health_check_interval_secs: Option<u64>,
}

/// One live-traffic outcome. Sequences are ordered most recent first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentRequestSample {
    pub success: bool,
    #[serde(default)]
    pub created_at_ms: Option<u64>,
    #[serde(default)]
    pub latency_ms: Option<u64>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl RecentRequestSample {
    pub fn new(success: bool) -> Self {
        Self {
            success,
            created_at_ms: None,
            latency_ms: None,
            error_message: None,
        }
    }
}

/// Latest background health-check result for an endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheckRecord {
    pub success: bool,
    #[serde(default)]
    pub last_check_at_ms: Option<u64>,
    #[serde(default)]
    pub latency_ms: Option<u64>,
    #[serde(default)]
    pub error_message: Option<String>,
}

// ── Manual tests ──────────────────────────────────────────────────

/// Outcome of a user-triggered test as persisted in the side store.
///
/// Serialized as `true`/`false`; anything else (including the legacy
/// `"unknown"` string) reads back as [`ManualOutcome::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManualOutcome {
    Passed,
    Failed,
    Unknown,
}

impl ManualOutcome {
    /// The boolean verdict, or `None` for the unknown sentinel.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ManualOutcome::Passed => Some(true),
            ManualOutcome::Failed => Some(false),
            ManualOutcome::Unknown => None,
        }
    }
}

impl From<bool> for ManualOutcome {
    fn from(success: bool) -> Self {
        if success {
            ManualOutcome::Passed
        } else {
            ManualOutcome::Failed
        }
    }
}

impl Serialize for ManualOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.as_bool() {
            Some(flag) => serializer.serialize_bool(flag),
            None => serializer.serialize_str("unknown"),
        }
    }
}

impl<'de> Deserialize<'de> for ManualOutcome {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(match value {
            serde_json::Value::Bool(flag) => flag.into(),
            _ => ManualOutcome::Unknown,
        })
    }
}

/// A persisted manual-test result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualTestRecord {
    pub success: ManualOutcome,
    pub tested_at_ms: u64,
}

impl ManualTestRecord {
    pub fn new(success: bool, tested_at_ms: u64) -> Self {
        Self {
            success: success.into(),
            tested_at_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(status: Option<&str>, is_enabled: bool) -> EndpointConfig {
        EndpointConfig {
            id: "ep-1".to_string(),
            client_type: "claude".to_string(),
            status: status.map(str::to_string),
            is_enabled,
        }
    }

    #[test]
    fn status_parse_known_and_unknown() {
        assert_eq!(Status::parse("available"), Some(Status::Available));
        assert_eq!(Status::parse(" warning "), Some(Status::Warning));
        assert_eq!(Status::parse("active"), None);
    }

    #[test]
    fn status_serializes_snake_case() {
        let record = StatusRecord::from_config(Status::Untested);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["status"], "untested");
        assert_eq!(json["source"], "config");
        assert!(json["observed_at_ms"].is_null());
    }

    #[test]
    fn endpoint_disabled_by_status_or_flag() {
        assert!(endpoint(Some("disabled"), true).is_disabled());
        assert!(endpoint(Some("untested"), false).is_disabled());
        assert!(!endpoint(Some("untested"), true).is_disabled());
        assert!(!endpoint(None, true).is_disabled());
    }

    #[test]
    fn endpoint_config_defaults_enabled() {
        let cfg: EndpointConfig =
            serde_json::from_str(r#"{"id":"a","client_type":"codex"}"#).unwrap();
        assert!(cfg.is_enabled);
        assert!(cfg.status.is_none());
    }

    #[test]
    fn manual_outcome_reads_sentinel_as_unknown() {
        let rec: ManualTestRecord =
            serde_json::from_str(r#"{"success":"unknown","tested_at_ms":5}"#).unwrap();
        assert_eq!(rec.success, ManualOutcome::Unknown);
        assert_eq!(rec.success.as_bool(), None);

        let rec: ManualTestRecord =
            serde_json::from_str(r#"{"success":false,"tested_at_ms":5}"#).unwrap();
        assert_eq!(rec.success, ManualOutcome::Failed);
    }

    #[test]
    fn manual_outcome_writes_plain_bool() {
        let json = serde_json::to_string(&ManualTestRecord::new(true, 7)).unwrap();
        assert_eq!(json, r#"{"success":true,"tested_at_ms":7}"#);
        let json = serde_json::to_value(ManualOutcome::Unknown).unwrap();
        assert_eq!(json, "unknown");
    }
}
