use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::kernel::quality::DEFAULT_FREEZE_HISTORY;
use crate::kernel::telemetry::recorder::MAX_EVENTS;
use crate::kernel::time::TICK_MS;

/// Runtime knobs for the reactor and its driver.
///
/// Detection thresholds are NOT here: they are fixed policy in
/// `kernel::quality`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReactorConfig {
    /// Driver cadence. Frames are drained and processed once per tick.
    pub tick_ms: u64,
    /// How often accumulated freeze time is sampled and reset per stream.
    pub report_interval_ms: u64,
    /// Max freeze durations retained per detector (oldest evicted).
    pub freeze_history_capacity: usize,
    /// Max telemetry events retained by the recorder.
    pub telemetry_capacity: usize,
    /// `EnvFilter` directive used by the binary when `RUST_LOG` is unset.
    pub log_filter: Option<String>,
}

impl Default for ReactorConfig {
    fn default() -> Self {
        Self {
            tick_ms: TICK_MS,
            report_interval_ms: 1_000,
            freeze_history_capacity: DEFAULT_FREEZE_HISTORY,
            telemetry_capacity: MAX_EVENTS,
            log_filter: None,
        }
    }
}

impl ReactorConfig {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_ms == 0 {
            return Err(ConfigError::Invalid("tick_ms must be > 0".to_string()));
        }
        if self.report_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "report_interval_ms must be > 0".to_string(),
            ));
        }
        if self.freeze_history_capacity == 0 {
            return Err(ConfigError::Invalid(
                "freeze_history_capacity must be > 0".to_string(),
            ));
        }
        if self.telemetry_capacity == 0 {
            return Err(ConfigError::Invalid(
                "telemetry_capacity must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}
