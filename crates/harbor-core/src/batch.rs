use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{CoreError, PriorityTier};

pub const DEFAULT_BATCH_SIZE: u32 = 25;
pub const MAX_BATCH_SIZE: u32 = 100;
pub const DEFAULT_BATCH_TYPE: &str = "standard";

/// Lifecycle of a `prompt_execution_batches` row: `running` then exactly one
/// terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Running,
    Completed,
    Failed,
}

impl BatchStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            BatchStatus::Running => "running",
            BatchStatus::Completed => "completed",
            BatchStatus::Failed => "failed",
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, BatchStatus::Running)
    }
}

impl std::fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BatchStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(BatchStatus::Running),
            "completed" => Ok(BatchStatus::Completed),
            "failed" => Ok(BatchStatus::Failed),
            other => Err(CoreError::InvalidBatchStatus(other.to_string())),
        }
    }
}

/// What started a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerSource {
    Cron,
    Manual,
    Scheduler,
    Cli,
}

impl TriggerSource {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TriggerSource::Cron => "cron",
            TriggerSource::Manual => "manual",
            TriggerSource::Scheduler => "scheduler",
            TriggerSource::Cli => "cli",
        }
    }
}

impl std::fmt::Display for TriggerSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters for one dispatcher invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRequest {
    pub batch_size: u32,
    pub batch_type: String,
    pub topic: Option<String>,
    pub priority: Option<PriorityTier>,
    pub force: bool,
    pub trigger_source: TriggerSource,
}

impl Default for BatchRequest {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            batch_type: DEFAULT_BATCH_TYPE.to_string(),
            topic: None,
            priority: None,
            force: false,
            trigger_source: TriggerSource::Manual,
        }
    }
}

impl BatchRequest {
    /// Builds a request from optional caller input, applying defaults and
    /// clamping `batch_size` to `1..=MAX_BATCH_SIZE`.
    #[must_use]
    pub fn new(
        batch_size: Option<u32>,
        batch_type: Option<String>,
        topic: Option<String>,
        priority: Option<PriorityTier>,
        force: bool,
        trigger_source: TriggerSource,
    ) -> Self {
        Self {
            batch_size: batch_size
                .unwrap_or(DEFAULT_BATCH_SIZE)
                .clamp(1, MAX_BATCH_SIZE),
            batch_type: batch_type
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| DEFAULT_BATCH_TYPE.to_string()),
            topic: topic
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
            priority,
            force,
            trigger_source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_input_missing() {
        let req = BatchRequest::new(None, None, None, None, false, TriggerSource::Cron);
        assert_eq!(req.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(req.batch_type, "standard");
        assert!(req.topic.is_none());
    }

    #[test]
    fn batch_size_is_clamped() {
        let zero = BatchRequest::new(Some(0), None, None, None, false, TriggerSource::Cron);
        let huge = BatchRequest::new(Some(10_000), None, None, None, false, TriggerSource::Cron);
        assert_eq!(zero.batch_size, 1);
        assert_eq!(huge.batch_size, MAX_BATCH_SIZE);
    }

    #[test]
    fn blank_topic_is_treated_as_unfiltered() {
        let req = BatchRequest::new(
            None,
            Some("  ".to_string()),
            Some("   ".to_string()),
            None,
            false,
            TriggerSource::Manual,
        );
        assert!(req.topic.is_none());
        assert_eq!(req.batch_type, "standard");
    }

    #[test]
    fn batch_status_terminal_states() {
        assert!(!BatchStatus::Running.is_terminal());
        assert!(BatchStatus::Completed.is_terminal());
        assert!(BatchStatus::Failed.is_terminal());
        assert_eq!("failed".parse::<BatchStatus>(), Ok(BatchStatus::Failed));
    }
}
