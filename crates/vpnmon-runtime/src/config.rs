use crate::error::{MonitorError, Result};
use crate::probes::{TracerouteConfig, DEFAULT_HOP_THRESHOLD};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default location of the append-only raw trace log
pub const DEFAULT_LOG_PATH: &str = "/tmp/vpnmmon.log";

/// Configuration for a monitor
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Raw trace log; `None` disables it
    pub log_path: Option<PathBuf>,
    /// Node-list fetch attempts before giving up (at least 1)
    pub fetch_attempts: u32,
    /// Pause between failed fetch attempts
    pub fetch_interval: Duration,
    /// Upper bound on simultaneous probes; `None` probes every node at once
    pub max_concurrent_probes: Option<usize>,
    /// A trace needs more hop lines than this to count as available
    pub hop_threshold: usize,
    /// How the probing utility is invoked
    pub tracer: TracerouteConfig,
    /// Time between runs in watch mode
    pub watch_interval: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            log_path: Some(PathBuf::from(DEFAULT_LOG_PATH)),
            fetch_attempts: 3,
            fetch_interval: Duration::from_secs(5),
            max_concurrent_probes: None,
            hop_threshold: DEFAULT_HOP_THRESHOLD,
            tracer: TracerouteConfig::default(),
            watch_interval: Duration::from_secs(300),
        }
    }
}

impl MonitorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.fetch_attempts == 0 {
            return Err(MonitorError::invalid_config(
                "fetch attempts must be at least 1",
                "Pass --fetch-attempts 1 or higher",
            ));
        }
        if self.max_concurrent_probes == Some(0) {
            return Err(MonitorError::invalid_config(
                "concurrent probe limit must be at least 1",
                "Pass --max-concurrent 1 or higher, or leave it out to probe every node at once",
            ));
        }
        if self.tracer.max_hops == 0 {
            return Err(MonitorError::invalid_config(
                "max hops must be at least 1",
                "traceroute needs a positive hop limit, the default is 8",
            ));
        }
        if self.tracer.program.trim().is_empty() {
            return Err(MonitorError::invalid_config(
                "probe program is empty",
                "Point --traceroute at the traceroute binary",
            ));
        }
        if self.watch_interval.is_zero() {
            return Err(MonitorError::invalid_config(
                "watch interval must be positive",
                "Pass --interval with a value of at least 1 second",
            ));
        }
        Ok(())
    }
}

/// API endpoint and token, as stored in a credentials file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    pub url: String,
    #[serde(default)]
    pub token: String,
}

impl Credentials {
    /// Load `{"url": ..., "token": ...}` from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)
            .map_err(|e| MonitorError::credentials(path.display().to_string(), e.to_string()))?;

        let credentials: Credentials = vpnmon_core::from_json(&data)
            .map_err(|e| MonitorError::credentials(path.display().to_string(), e.to_string()))?;

        if credentials.url.trim().is_empty() {
            return Err(MonitorError::credentials(
                path.display().to_string(),
                "url is empty",
            ));
        }

        Ok(credentials)
    }
}
