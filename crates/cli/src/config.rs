//! Pipeline configuration.

use anyhow::{Context, Result};
use scriptflow_core::{StepDefinition, TrackerConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Step id of the scraping stage.
pub const SCRAPE_STEP: &str = "scrape";

/// Step id of the generation stage.
pub const GENERATE_STEP: &str = "generate";

/// Settings for one simulated remote stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageConfig {
    /// Label shown for the step
    pub label: String,

    /// How long the simulated remote call takes
    pub latency_ms: u64,

    /// Duration progress is simulated over
    pub estimate_ms: u64,
}

impl StageConfig {
    /// Simulated remote latency.
    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }

    /// Simulation duration.
    pub fn estimate(&self) -> Duration {
        Duration::from_millis(self.estimate_ms)
    }
}

/// Full pipeline configuration, loadable from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Tracker timing settings
    pub tracker: TrackerConfig,

    /// Scraping stage
    pub scrape: StageConfig,

    /// Generation stage
    pub generate: StageConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            tracker: TrackerConfig::default(),
            scrape: StageConfig {
                label: "Scraping reference scripts".to_string(),
                latency_ms: 2_000,
                estimate_ms: 5_000,
            },
            generate: StageConfig {
                label: "Generating viral script".to_string(),
                latency_ms: 4_000,
                estimate_ms: 30_000,
            },
        }
    }
}

impl PipelineConfig {
    /// Load from a JSON file, or defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        config.tracker.validate()?;
        Ok(config)
    }

    /// Step definitions in pipeline order. Ids are fixed; labels come from
    /// the stage settings.
    pub fn steps(&self) -> Vec<StepDefinition> {
        vec![
            StepDefinition::new(SCRAPE_STEP, &self.scrape.label),
            StepDefinition::new(GENERATE_STEP, &self.generate.label),
        ]
    }
}
