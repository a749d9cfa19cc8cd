use std::future::Future;

use futures::future::join_all;
use harbor_core::{AppConfig, ModelProvider};

use crate::error::LlmError;
use crate::providers::{ChatClient, ClientSettings};

/// What one model produced for one prompt.
///
/// Exactly one of `response_text` / `error` is set by [`LlmExecutor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelOutput {
    pub model: ModelProvider,
    pub response_text: Option<String>,
    pub tokens_used: u64,
    pub error: Option<String>,
}

impl ModelOutput {
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.error.is_none() && self.response_text.is_some()
    }
}

/// Runs one prompt against every configured model.
///
/// An `Err` means the prompt could not be attempted at all; individual model
/// failures are reported inside the returned outputs.
pub trait PromptExecutor: Send + Sync {
    fn execute(
        &self,
        prompt_text: &str,
    ) -> impl Future<Output = Result<Vec<ModelOutput>, LlmError>> + Send;
}

/// Executor backed by the real provider HTTP clients.
pub struct LlmExecutor {
    clients: Vec<ChatClient>,
}

impl LlmExecutor {
    #[must_use]
    pub fn new(clients: Vec<ChatClient>) -> Self {
        Self { clients }
    }

    /// Builds one client per provider with an API key in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError`] if any client cannot be constructed.
    pub fn from_config(config: &AppConfig) -> Result<Self, LlmError> {
        let settings = ClientSettings {
            timeout_secs: config.llm_request_timeout_secs,
            max_retries: config.llm_max_retries,
            retry_backoff_ms: config.llm_retry_backoff_ms,
        };
        let clients = config
            .providers
            .iter()
            .map(|provider| ChatClient::from_config(provider, settings))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(clients))
    }

    #[must_use]
    pub fn models(&self) -> Vec<ModelProvider> {
        self.clients.iter().map(ChatClient::provider).collect()
    }

    /// Logs a warning when no provider is configured. Returns whether it did.
    pub fn warn_if_unconfigured(&self) -> bool {
        if self.clients.is_empty() {
            tracing::warn!("no LLM provider API keys configured; every prompt will fail");
            return true;
        }
        false
    }
}

impl PromptExecutor for LlmExecutor {
    async fn execute(&self, prompt_text: &str) -> Result<Vec<ModelOutput>, LlmError> {
        let calls = self.clients.iter().map(|client| async move {
            let model = client.provider();
            match client.complete(prompt_text).await {
                Ok(completion) => ModelOutput {
                    model,
                    response_text: Some(completion.text),
                    tokens_used: completion.tokens_used,
                    error: None,
                },
                Err(e) => {
                    tracing::warn!(model = %model, error = %e, "model call failed");
                    ModelOutput {
                        model,
                        response_text: None,
                        tokens_used: 0,
                        error: Some(e.to_string()),
                    }
                }
            }
        });
        Ok(join_all(calls).await)
    }
}
