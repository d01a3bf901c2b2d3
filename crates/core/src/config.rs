//! Tracker configuration.

use crate::error::{Result, TrackerError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timing and cap settings for simulated progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Interval between simulation ticks, in milliseconds
    pub tick_interval_ms: u64,

    /// Duration used when a simulation is started without one
    pub default_duration_ms: u64,

    /// Progress ceiling simulation approaches but never reaches
    pub simulation_cap: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 500,
            default_duration_ms: 30_000,
            simulation_cap: 90.0,
        }
    }
}

impl TrackerConfig {
    /// Tick interval as a duration.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Default simulation duration.
    pub fn default_duration(&self) -> Duration {
        Duration::from_millis(self.default_duration_ms)
    }

    /// Check the settings are usable.
    pub fn validate(&self) -> Result<()> {
        if self.tick_interval_ms == 0 {
            return Err(TrackerError::InvalidConfig(
                "tick_interval_ms must be greater than zero".to_string(),
            ));
        }
        if !(self.simulation_cap > 0.0 && self.simulation_cap < 100.0) {
            return Err(TrackerError::InvalidConfig(format!(
                "simulation_cap must be in (0, 100), got {}",
                self.simulation_cap
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TrackerConfig::default();
        assert_eq!(config.tick_interval(), Duration::from_millis(500));
        assert_eq!(config.default_duration(), Duration::from_secs(30));
        assert_eq!(config.simulation_cap, 90.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: TrackerConfig = serde_json::from_str(r#"{"tick_interval_ms": 100}"#).unwrap();
        assert_eq!(config.tick_interval_ms, 100);
        assert_eq!(config.default_duration_ms, 30_000);
    }

    #[test]
    fn test_invalid_config() {
        let zero_tick = TrackerConfig {
            tick_interval_ms: 0,
            ..Default::default()
        };
        assert!(matches!(zero_tick.validate(), Err(TrackerError::InvalidConfig(_))));

        let full_cap = TrackerConfig {
            simulation_cap: 100.0,
            ..Default::default()
        };
        assert!(full_cap.validate().is_err());
    }
}
