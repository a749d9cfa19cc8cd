use thiserror::Error;

/// Errors returned by the chat provider clients.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-2xx status.
    #[error("{provider} API error ({status}): {body}")]
    Api {
        provider: &'static str,
        status: u16,
        body: String,
    },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The provider returned a well-formed response with no text in it.
    #[error("{0} returned an empty completion")]
    EmptyResponse(&'static str),

    /// Client construction failed (bad base URL).
    #[error("invalid provider configuration: {0}")]
    Config(String),
}

impl LlmError {
    /// Truncates a provider error body so one bad response cannot flood logs
    /// or result rows.
    pub(crate) fn api(provider: &'static str, status: u16, body: &str) -> Self {
        const MAX_BODY_CHARS: usize = 500;
        let body = if body.chars().count() > MAX_BODY_CHARS {
            let mut cut: String = body.chars().take(MAX_BODY_CHARS).collect();
            cut.push('…');
            cut
        } else {
            body.to_string()
        };
        LlmError::Api {
            provider,
            status,
            body,
        }
    }
}
