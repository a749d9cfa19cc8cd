//! Batch execution of seed prompts.
//!
//! A [`Dispatcher`] run creates a batch row, selects due prompts, claims
//! them, runs each through a [`harbor_llm::PromptExecutor`], persists the
//! results, bumps freshness for completed prompts, finishes the batch and
//! finally triggers the post-batch aggregate refreshes.

pub mod diagnostics;
pub mod dispatcher;
pub mod error;
pub mod hooks;
mod results;
pub mod store;

pub use diagnostics::{stale_report, StalePromptSample, StaleReport};
pub use dispatcher::{
    BatchSummary, DispatchSettings, Dispatcher, ALL_CLAIMED_HINT, NO_DUE_PROMPTS_HINT,
};
pub use error::DispatchError;
pub use hooks::{run_post_batch_hooks, PostBatchHook, POST_BATCH_HOOKS};
pub use store::{DispatchStore, PgStore};
