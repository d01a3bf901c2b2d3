//! Remote collaborators the pipeline brackets with step transitions.
//!
//! The real system calls hosted functions for transcript scraping and
//! script generation. These stand-ins sleep for a configured latency and
//! return canned payloads; the tracker never sees the payload shape.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

/// Errors returned by a remote stage.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    /// The remote call failed
    #[error("{stage} failed: {message}")]
    Remote {
        /// Stage name
        stage: String,
        /// Remote error text
        message: String,
    },

    /// The stage got input it cannot use
    #[error("invalid input for {stage}: {reason}")]
    InvalidInput {
        /// Stage name
        stage: String,
        /// What was wrong
        reason: String,
    },
}

/// One remote operation in the pipeline.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Step id this stage reports under.
    fn step_id(&self) -> &str;

    /// Duration to simulate progress over.
    fn estimate(&self) -> Duration;

    /// Run the remote call with the previous stage's output.
    async fn run(&self, input: Value) -> Result<Value, StageError>;
}

/// Scrapes transcripts for a list of reference video URLs.
pub struct ScrapeStage {
    step_id: String,
    latency: Duration,
    estimate: Duration,
    fail: bool,
}

impl ScrapeStage {
    /// Create a new scrape stage.
    pub fn new(step_id: impl Into<String>, latency: Duration, estimate: Duration) -> Self {
        Self {
            step_id: step_id.into(),
            latency,
            estimate,
            fail: false,
        }
    }

    /// Make the remote call fail.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

#[async_trait]
impl Stage for ScrapeStage {
    fn step_id(&self) -> &str {
        &self.step_id
    }

    fn estimate(&self) -> Duration {
        self.estimate
    }

    async fn run(&self, input: Value) -> Result<Value, StageError> {
        let urls: Vec<String> = input
            .get("urls")
            .and_then(Value::as_array)
            .map(|urls| {
                urls.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        if urls.is_empty() {
            return Err(StageError::InvalidInput {
                stage: self.step_id.clone(),
                reason: "no reference urls".to_string(),
            });
        }

        debug!(count = urls.len(), "Scraping transcripts");
        tokio::time::sleep(self.latency).await;

        if self.fail {
            return Err(StageError::Remote {
                stage: self.step_id.clone(),
                message: "transcript service unavailable".to_string(),
            });
        }

        let scripts: Vec<Value> = urls
            .iter()
            .map(|url| json!({ "source": url, "transcript": format!("transcript of {url}") }))
            .collect();
        Ok(json!({ "scripts": scripts }))
    }
}

/// Analyzes scraped scripts and writes a new one.
pub struct GenerateStage {
    step_id: String,
    latency: Duration,
    estimate: Duration,
    fail: bool,
}

impl GenerateStage {
    /// Create a new generate stage.
    pub fn new(step_id: impl Into<String>, latency: Duration, estimate: Duration) -> Self {
        Self {
            step_id: step_id.into(),
            latency,
            estimate,
            fail: false,
        }
    }

    /// Make the remote call fail.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

#[async_trait]
impl Stage for GenerateStage {
    fn step_id(&self) -> &str {
        &self.step_id
    }

    fn estimate(&self) -> Duration {
        self.estimate
    }

    async fn run(&self, input: Value) -> Result<Value, StageError> {
        let count = input
            .get("scripts")
            .and_then(Value::as_array)
            .map(Vec::len)
            .unwrap_or(0);
        if count == 0 {
            return Err(StageError::InvalidInput {
                stage: self.step_id.clone(),
                reason: "no scripts to analyze".to_string(),
            });
        }

        debug!(count, "Generating script");
        tokio::time::sleep(self.latency).await;

        if self.fail {
            return Err(StageError::Remote {
                stage: self.step_id.clone(),
                message: "generation quota exceeded".to_string(),
            });
        }

        Ok(json!({
            "analysis": { "reference_count": count },
            "script": "Hook. Payoff. Call to action.",
        }))
    }
}
