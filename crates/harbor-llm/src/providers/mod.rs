//! Chat provider clients.
//!
//! ChatGPT and Perplexity speak the OpenAI chat-completions dialect; Claude
//! uses the Anthropic messages API. [`ChatClient`] hides the difference so the
//! executor can treat every configured provider the same way.

mod anthropic;
mod openai;

use std::time::Duration;

use harbor_core::{ModelProvider, ProviderConfig};
use reqwest::{Client, Url};

use crate::error::LlmError;

pub use anthropic::AnthropicClient;
pub use openai::OpenAiClient;

/// Transport settings shared by every provider client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientSettings {
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            max_retries: 0,
            retry_backoff_ms: 1_000,
        }
    }
}

/// Text and token usage from one successful completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub tokens_used: u64,
}

/// Production API root for a provider.
#[must_use]
pub fn default_base_url(provider: ModelProvider) -> &'static str {
    match provider {
        ModelProvider::ChatGpt => "https://api.openai.com/v1",
        ModelProvider::Claude => "https://api.anthropic.com/v1",
        ModelProvider::Perplexity => "https://api.perplexity.ai",
    }
}

/// A provider client for one configured model.
pub enum ChatClient {
    OpenAi(OpenAiClient),
    Anthropic(AnthropicClient),
}

impl ChatClient {
    /// Builds the client for `config` against the provider's production API.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Http`] if the `reqwest::Client` cannot be built.
    pub fn from_config(config: &ProviderConfig, settings: ClientSettings) -> Result<Self, LlmError> {
        Self::with_base_url(config, settings, default_base_url(config.provider))
    }

    /// Builds the client for `config` against `base_url` (wiremock in tests).
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Http`] if the `reqwest::Client` cannot be built, or
    /// [`LlmError::Config`] if `base_url` is not a valid URL.
    pub fn with_base_url(
        config: &ProviderConfig,
        settings: ClientSettings,
        base_url: &str,
    ) -> Result<Self, LlmError> {
        Ok(match config.provider {
            ModelProvider::Claude => ChatClient::Anthropic(AnthropicClient::with_base_url(
                &config.api_key,
                &config.model,
                settings,
                base_url,
            )?),
            provider @ (ModelProvider::ChatGpt | ModelProvider::Perplexity) => {
                ChatClient::OpenAi(OpenAiClient::with_base_url(
                    provider,
                    &config.api_key,
                    &config.model,
                    settings,
                    base_url,
                )?)
            }
        })
    }

    #[must_use]
    pub fn provider(&self) -> ModelProvider {
        match self {
            ChatClient::OpenAi(c) => c.provider(),
            ChatClient::Anthropic(_) => ModelProvider::Claude,
        }
    }

    /// Sends `prompt` as a single user message.
    ///
    /// # Errors
    ///
    /// Any [`LlmError`] from the underlying client after retries are exhausted.
    pub async fn complete(&self, prompt: &str) -> Result<Completion, LlmError> {
        match self {
            ChatClient::OpenAi(c) => c.complete(prompt).await,
            ChatClient::Anthropic(c) => c.complete(prompt).await,
        }
    }
}

pub(crate) fn build_http_client(settings: ClientSettings) -> Result<Client, LlmError> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(settings.timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .user_agent("harbor/0.1 (visibility-tracking)")
        .build()?)
}

/// Parses `base_url` and joins `path` onto it, keeping any path prefix such
/// as `/v1`.
pub(crate) fn endpoint_url(base_url: &str, path: &str) -> Result<Url, LlmError> {
    let normalised = format!("{}/", base_url.trim_end_matches('/'));
    let base = Url::parse(&normalised)
        .map_err(|e| LlmError::Config(format!("invalid base URL '{base_url}': {e}")))?;
    base.join(path)
        .map_err(|e| LlmError::Config(format!("invalid endpoint path '{path}': {e}")))
}

/// Reads a response body, mapping non-2xx to [`LlmError::Api`] and parsing
/// the rest as JSON.
pub(crate) async fn read_json<T: serde::de::DeserializeOwned>(
    provider: &'static str,
    response: reqwest::Response,
) -> Result<T, LlmError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(LlmError::api(provider, status.as_u16(), &body));
    }
    serde_json::from_str(&body).map_err(|e| LlmError::Deserialize {
        context: format!("{provider} completion"),
        source: e,
    })
}
