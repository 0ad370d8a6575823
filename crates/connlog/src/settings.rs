//! Connectivity Log Configuration

use connlog_ring::{
    DeliveryThrottle, MAX_RECORD_IN_SINGLE_EVT, WLAN_MAX_LOG_RECORDS, WLAN_RECORDS_PER_SEC,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{LogError, MAX_CACHED_AUTH_FRAMES, MAX_ROAM_CANDIDATE_AP};

/// Connectivity log configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnLogConfig {
    /// Ring capacity in records
    pub capacity: usize,

    /// Records delivered per one-second window (0 disables throttling)
    pub records_per_sec: u32,

    /// Records handed to the sink per delivery
    pub max_records_per_event: usize,

    /// SAE cache candidate slots per vdev
    pub max_roam_candidates: usize,

    /// SAE cache frame positions per candidate
    pub max_cached_auth_frames: usize,

    /// Worker back-off while the throttle blocks delivery (milliseconds)
    pub retry_interval_ms: u64,

    /// Firmware skips the full scan after a failed beacon-miss partial scan
    pub bmiss_skip_full_scan: bool,

    /// Tracing level for the connectivity log
    pub log_level: String,
}

impl Default for ConnLogConfig {
    fn default() -> Self {
        Self {
            capacity: WLAN_MAX_LOG_RECORDS,
            records_per_sec: WLAN_RECORDS_PER_SEC,
            max_records_per_event: MAX_RECORD_IN_SINGLE_EVT,
            max_roam_candidates: MAX_ROAM_CANDIDATE_AP,
            max_cached_auth_frames: MAX_CACHED_AUTH_FRAMES,
            retry_interval_ms: 100,
            bmiss_skip_full_scan: false,
            log_level: "info".to_string(),
        }
    }
}

impl ConnLogConfig {
    /// Config with throttling disabled, for trace replay
    pub fn unthrottled() -> Self {
        Self {
            records_per_sec: 0,
            ..Default::default()
        }
    }

    /// Load from an optional file overlaid with `CONNLOG_*` environment variables
    pub fn load(path: Option<&Path>) -> Result<Self, LogError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }

        let loaded: Self = builder
            .add_source(config::Environment::with_prefix("CONNLOG").try_parsing(true))
            .build()
            .and_then(|cfg| cfg.try_deserialize())
            .map_err(|e| LogError::Config(e.to_string()))?;

        loaded.validate()?;
        Ok(loaded)
    }

    /// Reject settings the ring cannot run with
    pub fn validate(&self) -> Result<(), LogError> {
        if self.capacity == 0 {
            return Err(LogError::Config("capacity must be non-zero".to_string()));
        }
        if self.max_records_per_event == 0 {
            return Err(LogError::Config(
                "max_records_per_event must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Delivery throttle for a freshly started ring
    pub fn throttle(&self) -> DeliveryThrottle {
        DeliveryThrottle::new(self.records_per_sec)
    }
}
