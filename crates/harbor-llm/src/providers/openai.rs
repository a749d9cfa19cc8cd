use harbor_core::ModelProvider;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use super::{build_http_client, endpoint_url, read_json, ClientSettings, Completion};
use crate::error::LlmError;
use crate::retry::retry_with_backoff;

/// Client for OpenAI-style `chat/completions` endpoints (OpenAI, Perplexity).
pub struct OpenAiClient {
    client: Client,
    provider: ModelProvider,
    api_key: String,
    model: String,
    url: Url,
    settings: ClientSettings,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    total_tokens: u64,
}

impl OpenAiClient {
    /// # Errors
    ///
    /// Returns [`LlmError::Http`] if the `reqwest::Client` cannot be built, or
    /// [`LlmError::Config`] if `base_url` is not a valid URL.
    pub fn with_base_url(
        provider: ModelProvider,
        api_key: &str,
        model: &str,
        settings: ClientSettings,
        base_url: &str,
    ) -> Result<Self, LlmError> {
        Ok(Self {
            client: build_http_client(settings)?,
            provider,
            api_key: api_key.to_owned(),
            model: model.to_owned(),
            url: endpoint_url(base_url, "chat/completions")?,
            settings,
        })
    }

    #[must_use]
    pub fn provider(&self) -> ModelProvider {
        self.provider
    }

    /// # Errors
    ///
    /// - [`LlmError::Api`] on a non-2xx status.
    /// - [`LlmError::Http`] on network failure.
    /// - [`LlmError::Deserialize`] if the body is not a chat completion.
    /// - [`LlmError::EmptyResponse`] if no choice carries text.
    pub async fn complete(&self, prompt: &str) -> Result<Completion, LlmError> {
        let slug = self.provider.slug();
        retry_with_backoff(
            slug,
            self.settings.max_retries,
            self.settings.retry_backoff_ms,
            || self.complete_once(prompt),
        )
        .await
    }

    async fn complete_once(&self, prompt: &str) -> Result<Completion, LlmError> {
        let slug = self.provider.slug();
        let request = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
        };
        let response = self
            .client
            .post(self.url.clone())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;
        let body: ChatResponse = read_json(slug, response).await?;

        let text = body
            .choices
            .into_iter()
            .find_map(|c| c.message.content)
            .filter(|t| !t.trim().is_empty())
            .ok_or(LlmError::EmptyResponse(slug))?;

        Ok(Completion {
            text,
            tokens_used: body.usage.map_or(0, |u| u.total_tokens),
        })
    }
}
