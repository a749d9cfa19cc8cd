use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use super::{build_http_client, endpoint_url, read_json, ClientSettings, Completion};
use crate::error::LlmError;
use crate::retry::retry_with_backoff;

const PROVIDER: &str = "claude";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 1024;

/// Client for the Anthropic `messages` endpoint.
pub struct AnthropicClient {
    client: Client,
    api_key: String,
    model: String,
    url: Url,
    settings: ClientSettings,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: [Message<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

impl AnthropicClient {
    /// # Errors
    ///
    /// Returns [`LlmError::Http`] if the `reqwest::Client` cannot be built, or
    /// [`LlmError::Config`] if `base_url` is not a valid URL.
    pub fn with_base_url(
        api_key: &str,
        model: &str,
        settings: ClientSettings,
        base_url: &str,
    ) -> Result<Self, LlmError> {
        Ok(Self {
            client: build_http_client(settings)?,
            api_key: api_key.to_owned(),
            model: model.to_owned(),
            url: endpoint_url(base_url, "messages")?,
            settings,
        })
    }

    /// # Errors
    ///
    /// - [`LlmError::Api`] on a non-2xx status.
    /// - [`LlmError::Http`] on network failure.
    /// - [`LlmError::Deserialize`] if the body is not a messages response.
    /// - [`LlmError::EmptyResponse`] if no text block is present.
    pub async fn complete(&self, prompt: &str) -> Result<Completion, LlmError> {
        retry_with_backoff(
            PROVIDER,
            self.settings.max_retries,
            self.settings.retry_backoff_ms,
            || self.complete_once(prompt),
        )
        .await
    }

    async fn complete_once(&self, prompt: &str) -> Result<Completion, LlmError> {
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            messages: [Message {
                role: "user",
                content: prompt,
            }],
        };
        let response = self
            .client
            .post(self.url.clone())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await?;
        let body: MessagesResponse = read_json(PROVIDER, response).await?;

        let text = body
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("\n");
        if text.trim().is_empty() {
            return Err(LlmError::EmptyResponse(PROVIDER));
        }

        Ok(Completion {
            text,
            tokens_used: body
                .usage
                .map_or(0, |u| u.input_tokens + u.output_tokens),
        })
    }
}
