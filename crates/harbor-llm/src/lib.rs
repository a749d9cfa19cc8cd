//! Chat assistant clients and response analysis for Harbor.
//!
//! [`LlmExecutor`] sends a prompt to every configured assistant at once and
//! reports per-model output; [`analyze_response`] turns a response into the
//! shopping and brand rows the dispatcher persists.

pub mod analysis;
pub mod error;
pub mod executor;
pub mod providers;
pub(crate) mod retry;

pub use analysis::{
    analyze_response, lexicon_score, response_hash, BrandMention, ResponseAnalysis, Sentiment,
    ShoppingMention,
};
pub use error::LlmError;
pub use executor::{LlmExecutor, ModelOutput, PromptExecutor};
pub use providers::{default_base_url, ChatClient, ClientSettings, Completion};
