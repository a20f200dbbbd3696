//! upwatch.toml configuration parser.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::time::parse_duration;

/// Health-check cadence assumed when the upstream config omits it.
pub const DEFAULT_HEALTH_CHECK_INTERVAL_SECS: u64 = 60;

/// How long a manual test counts as evidence.
pub const DEFAULT_MANUAL_TEST_WINDOW_SECS: u64 = 60 * 60;

/// Number of recent requests that make up a traffic verdict.
pub const DEFAULT_RECENT_REQUEST_LIMIT: usize = 3;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpwatchConfig {
    #[serde(default)]
    pub status: StatusConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub daemon: DaemonConfig,
}

/// Resolution policy knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusConfig {
    pub default_health_check_interval_secs: u64,
    pub manual_test_window_secs: u64,
    pub recent_request_limit: usize,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            default_health_check_interval_secs: DEFAULT_HEALTH_CHECK_INTERVAL_SECS,
            manual_test_window_secs: DEFAULT_MANUAL_TEST_WINDOW_SECS,
            recent_request_limit: DEFAULT_RECENT_REQUEST_LIMIT,
        }
    }
}

/// Where the config, health-check and request-history providers live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub base_url: String,
    /// Per-request timeout (e.g., "5s").
    pub timeout: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:13500".to_string(),
            timeout: "5s".to_string(),
        }
    }
}

impl UpstreamConfig {
    /// Per-request timeout. Unparseable or zero values fall back to 5s.
    pub fn timeout(&self) -> Duration {
        parse_nonzero(&self.timeout).unwrap_or(Duration::from_secs(5))
    }
}

/// Daemon process settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub data_dir: PathBuf,
    pub port: u16,
    /// Periodic refresh interval (e.g., "30s").
    pub refresh_interval: String,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("/var/lib/upwatch"),
            port: 8480,
            refresh_interval: "30s".to_string(),
        }
    }
}

impl DaemonConfig {
    /// Refresh cadence. Unparseable or zero values fall back to 30s.
    pub fn refresh_interval(&self) -> Duration {
        parse_nonzero(&self.refresh_interval).unwrap_or(Duration::from_secs(30))
    }
}

/// Parse a duration that must be longer than zero.
pub fn parse_nonzero(s: &str) -> Option<Duration> {
    parse_duration(s).filter(|d| !d.is_zero())
}

impl UpwatchConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: UpwatchConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config: UpwatchConfig = toml::from_str("").unwrap();
        assert_eq!(config, UpwatchConfig::default());
        assert_eq!(config.status.default_health_check_interval_secs, 60);
        assert_eq!(config.status.manual_test_window_secs, 3600);
        assert_eq!(config.status.recent_request_limit, 3);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let toml_str = r#"
[upstream]
base_url = "http://10.0.0.5:9000"

[daemon]
port = 9999
refresh_interval = "500ms"
"#;
        let config: UpwatchConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.upstream.base_url, "http://10.0.0.5:9000");
        assert_eq!(config.upstream.timeout(), Duration::from_secs(5));
        assert_eq!(config.daemon.port, 9999);
        assert_eq!(config.daemon.refresh_interval(), Duration::from_millis(500));
        assert_eq!(config.daemon.data_dir, PathBuf::from("/var/lib/upwatch"));
    }

    #[test]
    fn invalid_interval_falls_back() {
        let mut daemon = DaemonConfig::default();
        daemon.refresh_interval = "whenever".to_string();
        assert_eq!(daemon.refresh_interval(), Duration::from_secs(30));
    }

    #[test]
    fn zero_durations_fall_back() {
        let config: UpwatchConfig = toml::from_str(
            "[upstream]\ntimeout = \"0s\"\n\n[daemon]\nrefresh_interval = \"0\"\n",
        )
        .unwrap();
        assert_eq!(config.upstream.timeout(), Duration::from_secs(5));
        assert_eq!(config.daemon.refresh_interval(), Duration::from_secs(30));
        assert_eq!(parse_nonzero("0ms"), None);
        assert_eq!(parse_nonzero("1ms"), Some(Duration::from_millis(1)));
    }

    #[test]
    fn round_trips_through_toml() {
        let config = UpwatchConfig::default();
        let toml_str = config.to_toml_string().unwrap();
        assert!(toml_str.contains("[status]"));
        let parsed: UpwatchConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn from_file_reads_disk() {
        let dir = std::env::temp_dir().join(format!("upwatch-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("upwatch.toml");
        std::fs::write(&path, "[status]\nmanual_test_window_secs = 60\n").unwrap();

        let config = UpwatchConfig::from_file(&path).unwrap();
        assert_eq!(config.status.manual_test_window_secs, 60);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
