//! Domain types and configuration shared by every Harbor crate.

pub mod app_config;
pub mod batch;
pub mod config;
pub mod cost;
pub mod freshness;
pub mod models;
pub mod prompts;

use thiserror::Error;

pub use app_config::{AppConfig, Environment, ProviderConfig};
pub use batch::{BatchRequest, BatchStatus, TriggerSource, DEFAULT_BATCH_SIZE, MAX_BATCH_SIZE};
pub use config::{load_app_config, load_app_config_from_env};
pub use cost::{estimate_cost_usd, USD_PER_MILLION_TOKENS};
pub use freshness::{is_due, select_due, SelectionFilter};
pub use models::ModelProvider;
pub use prompts::{load_prompt_seeds, PriorityTier, Prompt, PromptSeed, PromptSeedFile};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read prompt seed file {path}: {source}")]
    PromptsFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse prompt seed file: {0}")]
    PromptsFileParse(#[from] serde_yaml::Error),

    #[error("invalid prompt seed: {0}")]
    Validation(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("invalid priority tier: {0}")]
    InvalidPriority(String),

    #[error("invalid batch status: {0}")]
    InvalidBatchStatus(String),

    #[error("unknown model provider: {0}")]
    UnknownModel(String),
}
