use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ConfigError, CoreError};

/// How important a prompt is to the visibility dashboards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PriorityTier {
    #[serde(rename = "core")]
    Core,
    #[serde(rename = "standard")]
    Standard,
    #[serde(rename = "long-tail")]
    LongTail,
}

impl PriorityTier {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PriorityTier::Core => "core",
            PriorityTier::Standard => "standard",
            PriorityTier::LongTail => "long-tail",
        }
    }
}

impl std::fmt::Display for PriorityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PriorityTier {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "core" => Ok(PriorityTier::Core),
            "standard" => Ok(PriorityTier::Standard),
            "long-tail" => Ok(PriorityTier::LongTail),
            other => Err(CoreError::InvalidPriority(other.to_string())),
        }
    }
}

/// A fixed query submitted to every configured chat provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prompt {
    pub id: i64,
    pub text: String,
    pub topic: String,
    pub priority: PriorityTier,
    /// Re-run interval in days. Always at least 1.
    pub frequency_days: i32,
    pub is_active: bool,
    pub last_executed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptSeed {
    pub text: String,
    pub topic: String,
    pub priority: PriorityTier,
    #[serde(default = "default_frequency_days")]
    pub frequency_days: i32,
}

fn default_frequency_days() -> i32 {
    7
}

#[derive(Debug, Deserialize)]
pub struct PromptSeedFile {
    pub prompts: Vec<PromptSeed>,
}

/// Load and validate the prompt seed file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_prompt_seeds(path: &Path) -> Result<PromptSeedFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::PromptsFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_prompt_seeds(&content)
}

fn parse_prompt_seeds(content: &str) -> Result<PromptSeedFile, ConfigError> {
    let file: PromptSeedFile = serde_yaml::from_str(content)?;
    validate_prompt_seeds(&file)?;
    Ok(file)
}

fn validate_prompt_seeds(file: &PromptSeedFile) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for seed in &file.prompts {
        if seed.text.trim().is_empty() {
            return Err(ConfigError::Validation(
                "prompt text must be non-empty".to_string(),
            ));
        }
        if seed.topic.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "prompt '{}' has an empty topic",
                seed.text
            )));
        }
        if seed.frequency_days < 1 {
            return Err(ConfigError::Validation(format!(
                "prompt '{}' has frequency_days {}; must be at least 1",
                seed.text, seed.frequency_days
            )));
        }
        if !seen.insert(seed.text.trim().to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate prompt text: '{}'",
                seed.text
            )));
        }
    }

    Ok(())
}
