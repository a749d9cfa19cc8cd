use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Chat assistants Harbor measures brand visibility in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelProvider {
    ChatGpt,
    Claude,
    Perplexity,
}

impl ModelProvider {
    pub const ALL: [ModelProvider; 3] = [
        ModelProvider::ChatGpt,
        ModelProvider::Claude,
        ModelProvider::Perplexity,
    ];

    #[must_use]
    pub fn slug(self) -> &'static str {
        match self {
            ModelProvider::ChatGpt => "chatgpt",
            ModelProvider::Claude => "claude",
            ModelProvider::Perplexity => "perplexity",
        }
    }

    /// Env var holding the provider's API key.
    #[must_use]
    pub fn api_key_var(self) -> &'static str {
        match self {
            ModelProvider::ChatGpt => "OPENAI_API_KEY",
            ModelProvider::Claude => "ANTHROPIC_API_KEY",
            ModelProvider::Perplexity => "PERPLEXITY_API_KEY",
        }
    }

    /// Env var overriding the provider's model name.
    #[must_use]
    pub fn model_var(self) -> &'static str {
        match self {
            ModelProvider::ChatGpt => "HARBOR_OPENAI_MODEL",
            ModelProvider::Claude => "HARBOR_ANTHROPIC_MODEL",
            ModelProvider::Perplexity => "HARBOR_PERPLEXITY_MODEL",
        }
    }

    #[must_use]
    pub fn default_model(self) -> &'static str {
        match self {
            ModelProvider::ChatGpt => "gpt-4o-mini",
            ModelProvider::Claude => "claude-3-5-haiku-latest",
            ModelProvider::Perplexity => "sonar",
        }
    }
}

impl std::fmt::Display for ModelProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for ModelProvider {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chatgpt" => Ok(ModelProvider::ChatGpt),
            "claude" => Ok(ModelProvider::Claude),
            "perplexity" => Ok(ModelProvider::Perplexity),
            other => Err(CoreError::UnknownModel(other.to_string())),
        }
    }
}
