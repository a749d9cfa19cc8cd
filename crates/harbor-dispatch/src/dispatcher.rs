use std::time::Duration;

use chrono::{DateTime, Utc};
use harbor_core::{
    estimate_cost_usd, select_due, AppConfig, BatchRequest, BatchStatus, Prompt, SelectionFilter,
};
use harbor_db::{BatchTotals, NewExecutionBatch};
use harbor_llm::PromptExecutor;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::error::DispatchError;
use crate::hooks::run_post_batch_hooks;
use crate::results::build_prompt_results;
use crate::store::DispatchStore;

/// Errors kept in the batch row's `error_summary`.
const ERROR_SUMMARY_LIMIT: usize = 5;

pub const NO_DUE_PROMPTS_HINT: &str =
    "No prompts are due. Pass force=true to re-run prompts regardless of freshness.";
pub const ALL_CLAIMED_HINT: &str =
    "All due prompts are already claimed by another running batch.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSettings {
    /// Pause between consecutive prompts.
    pub inter_prompt_delay: Duration,
    /// How long a claimed prompt stays reserved for this batch.
    pub claim_lease: Duration,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            inter_prompt_delay: Duration::from_millis(500),
            claim_lease: Duration::from_secs(900),
        }
    }
}

impl DispatchSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            inter_prompt_delay: Duration::from_millis(config.inter_prompt_delay_ms),
            claim_lease: Duration::from_secs(config.claim_lease_secs),
        }
    }
}

/// Result of one batch run, returned to the caller as JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    pub batch_id: Uuid,
    pub status: BatchStatus,
    pub prompts_total: u32,
    pub prompts_completed: u32,
    pub prompts_failed: u32,
    pub total_tokens_used: u64,
    pub estimated_cost_usd: Decimal,
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

/// Outcome of a single prompt inside the batch loop.
enum PromptOutcome {
    Completed { tokens: u64 },
    Failed { tokens: u64, error: String },
}

/// Selects due prompts, runs them through the executor, and records the batch.
pub struct Dispatcher<S, E> {
    store: S,
    executor: E,
    settings: DispatchSettings,
}

impl<S: DispatchStore, E: PromptExecutor> Dispatcher<S, E> {
    pub fn new(store: S, executor: E, settings: DispatchSettings) -> Self {
        Self {
            store,
            executor,
            settings,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Runs one batch to completion.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] when the batch cannot be set up or finished.
    /// If the batch row was already created it is marked `failed` on a
    /// best-effort basis first. Failures of individual prompts are not errors.
    pub async fn run_batch(&self, request: &BatchRequest) -> Result<BatchSummary, DispatchError> {
        let run_started: DateTime<Utc> = Utc::now();
        let priority = request.priority.map(harbor_core::PriorityTier::as_str);

        let batch = self
            .store
            .create_batch(&NewExecutionBatch {
                batch_type: &request.batch_type,
                trigger_source: request.trigger_source.as_str(),
                topic_filter: request.topic.as_deref(),
                priority_filter: priority,
                forced: request.force,
            })
            .await
            .map_err(DispatchError::CreateBatch)?;

        tracing::info!(
            batch_id = batch.id,
            public_id = %batch.public_id,
            batch_size = request.batch_size,
            topic = request.topic.as_deref().unwrap_or("*"),
            priority = priority.unwrap_or("*"),
            force = request.force,
            trigger = %request.trigger_source,
            "execution batch started"
        );

        let selected = match self.select(request, run_started).await {
            Ok(prompts) => prompts,
            Err(e) => {
                self.fail_batch_best_effort(batch.id, &BatchTotals::default(), &e.to_string())
                    .await;
                return Err(e);
            }
        };

        if selected.is_empty() {
            return self
                .finish_empty(batch.id, batch.public_id, NO_DUE_PROMPTS_HINT)
                .await;
        }

        let lease_until = run_started
            + chrono::Duration::from_std(self.settings.claim_lease)
                .unwrap_or_else(|_| chrono::Duration::minutes(15));
        let selected_ids: Vec<i64> = selected.iter().map(|p| p.id).collect();
        let claimed = match self.store.claim_prompts(&selected_ids, lease_until).await {
            Ok(ids) => ids,
            Err(e) => {
                let err = DispatchError::ClaimPrompts(e);
                self.fail_batch_best_effort(batch.id, &BatchTotals::default(), &err.to_string())
                    .await;
                return Err(err);
            }
        };

        let prompts: Vec<Prompt> = selected
            .into_iter()
            .filter(|p| claimed.binary_search(&p.id).is_ok())
            .collect();
        let skipped = selected_ids.len() - prompts.len();
        if skipped > 0 {
            tracing::info!(batch_id = batch.id, skipped, "prompts claimed by another batch");
        }
        if prompts.is_empty() {
            return self
                .finish_empty(batch.id, batch.public_id, ALL_CLAIMED_HINT)
                .await;
        }

        let tracked_brands = match self.store.tracked_brands().await {
            Ok(brands) => brands,
            Err(e) => {
                let err = DispatchError::TrackedBrands(e);
                self.release_best_effort(batch.id, &claimed).await;
                self.fail_batch_best_effort(batch.id, &BatchTotals::default(), &err.to_string())
                    .await;
                return Err(err);
            }
        };

        let mut completed_ids: Vec<i64> = Vec::new();
        let mut failed_ids: Vec<i64> = Vec::new();
        let mut errors: Vec<String> = Vec::new();
        let mut total_tokens: u64 = 0;

        for (index, prompt) in prompts.iter().enumerate() {
            if index > 0 && !self.settings.inter_prompt_delay.is_zero() {
                tokio::time::sleep(self.settings.inter_prompt_delay).await;
            }

            match self.run_prompt(batch.id, prompt, &tracked_brands).await {
                PromptOutcome::Completed { tokens } => {
                    total_tokens = total_tokens.saturating_add(tokens);
                    completed_ids.push(prompt.id);
                }
                PromptOutcome::Failed { tokens, error } => {
                    total_tokens = total_tokens.saturating_add(tokens);
                    tracing::warn!(batch_id = batch.id, prompt_id = prompt.id, error = %error, "prompt failed");
                    failed_ids.push(prompt.id);
                    errors.push(error);
                }
            }
        }

        let totals = BatchTotals {
            prompts_total: to_i32(prompts.len()),
            prompts_completed: to_i32(completed_ids.len()),
            prompts_failed: to_i32(failed_ids.len()),
            total_tokens_used: i64::try_from(total_tokens).unwrap_or(i64::MAX),
            estimated_cost_usd: estimate_cost_usd(total_tokens),
        };

        if let Err(e) = self.store.mark_executed(&completed_ids, run_started).await {
            let err = DispatchError::MarkExecuted(e);
            self.release_best_effort(batch.id, &claimed).await;
            self.fail_batch_best_effort(batch.id, &totals, &err.to_string())
                .await;
            return Err(err);
        }
        self.release_best_effort(batch.id, &failed_ids).await;

        let status = if completed_ids.is_empty() {
            BatchStatus::Failed
        } else {
            BatchStatus::Completed
        };
        let finished = match status {
            BatchStatus::Failed => {
                let summary = error_summary(&errors);
                self.store.fail_batch(batch.id, &totals, &summary).await
            }
            _ => self.store.complete_batch(batch.id, &totals).await,
        };
        if let Err(source) = finished {
            let err = DispatchError::FinishBatch {
                batch_id: batch.id,
                source,
            };
            self.fail_batch_best_effort(batch.id, &totals, &err.to_string())
                .await;
            return Err(err);
        }

        tracing::info!(
            batch_id = batch.id,
            status = %status,
            prompts_total = totals.prompts_total,
            prompts_completed = totals.prompts_completed,
            prompts_failed = totals.prompts_failed,
            total_tokens,
            estimated_cost_usd = %totals.estimated_cost_usd,
            "execution batch finished"
        );

        if completed_ids.is_empty() {
            tracing::info!(batch_id = batch.id, "no prompts completed; skipping post-batch hooks");
        } else {
            run_post_batch_hooks(&self.store, batch.id).await;
        }

        Ok(BatchSummary {
            batch_id: batch.public_id,
            status,
            prompts_total: to_u32(prompts.len()),
            prompts_completed: to_u32(completed_ids.len()),
            prompts_failed: to_u32(failed_ids.len()),
            total_tokens_used: total_tokens,
            estimated_cost_usd: totals.estimated_cost_usd,
            errors,
            hint: None,
        })
    }

    async fn select(
        &self,
        request: &BatchRequest,
        now: DateTime<Utc>,
    ) -> Result<Vec<Prompt>, DispatchError> {
        let candidates = self
            .store
            .load_claimable(request.topic.as_deref(), request.priority)
            .await
            .map_err(DispatchError::LoadPrompts)?;
        let filter = SelectionFilter {
            topic: request.topic.clone(),
            priority: request.priority,
        };
        let limit = usize::try_from(request.batch_size).unwrap_or(usize::MAX);
        Ok(select_due(candidates, now, request.force, &filter, limit))
    }

    async fn run_prompt(
        &self,
        batch_id: i64,
        prompt: &Prompt,
        tracked_brands: &[String],
    ) -> PromptOutcome {
        let outputs = match self.executor.execute(&prompt.text).await {
            Ok(outputs) => outputs,
            Err(e) => {
                return PromptOutcome::Failed {
                    tokens: 0,
                    error: format!("prompt {}: {e}", prompt.id),
                }
            }
        };
        let tokens: u64 = outputs.iter().map(|o| o.tokens_used).sum();

        let results = build_prompt_results(prompt, &outputs, tracked_brands);
        if let Err(e) = self
            .store
            .persist_results(batch_id, prompt.id, &results)
            .await
        {
            return PromptOutcome::Failed {
                tokens,
                error: format!("prompt {}: failed to persist results: {e}", prompt.id),
            };
        }

        if outputs.iter().any(harbor_llm::ModelOutput::succeeded) {
            return PromptOutcome::Completed { tokens };
        }

        let error = if outputs.is_empty() {
            format!("prompt {}: no model providers configured", prompt.id)
        } else {
            let detail = outputs
                .iter()
                .map(|o| {
                    format!(
                        "{}: {}",
                        o.model,
                        o.error.as_deref().unwrap_or("empty response")
                    )
                })
                .collect::<Vec<_>>()
                .join("; ");
            format!("prompt {}: all models failed ({detail})", prompt.id)
        };
        PromptOutcome::Failed { tokens, error }
    }

    async fn finish_empty(
        &self,
        batch_id: i64,
        public_id: Uuid,
        hint: &str,
    ) -> Result<BatchSummary, DispatchError> {
        let totals = BatchTotals::default();
        if let Err(source) = self.store.complete_batch(batch_id, &totals).await {
            let err = DispatchError::FinishBatch { batch_id, source };
            self.fail_batch_best_effort(batch_id, &totals, &err.to_string())
                .await;
            return Err(err);
        }
        tracing::info!(batch_id, hint, "execution batch had nothing to run");

        Ok(BatchSummary {
            batch_id: public_id,
            status: BatchStatus::Completed,
            prompts_total: 0,
            prompts_completed: 0,
            prompts_failed: 0,
            total_tokens_used: 0,
            estimated_cost_usd: totals.estimated_cost_usd,
            errors: Vec::new(),
            hint: Some(hint.to_string()),
        })
    }

    /// Attempt to mark the batch as failed, logging any secondary error.
    async fn fail_batch_best_effort(&self, batch_id: i64, totals: &BatchTotals, message: &str) {
        if let Err(mark_err) = self.store.fail_batch(batch_id, totals, message).await {
            tracing::error!(
                batch_id,
                error = %mark_err,
                "failed to mark execution batch as failed"
            );
        }
    }

    async fn release_best_effort(&self, batch_id: i64, ids: &[i64]) {
        if ids.is_empty() {
            return;
        }
        if let Err(e) = self.store.release_prompts(ids).await {
            tracing::warn!(batch_id, error = %e, "failed to release prompt claims");
        }
    }
}

fn error_summary(errors: &[String]) -> String {
    let mut summary = errors
        .iter()
        .take(ERROR_SUMMARY_LIMIT)
        .cloned()
        .collect::<Vec<_>>()
        .join("; ");
    if errors.len() > ERROR_SUMMARY_LIMIT {
        summary.push_str(&format!(
            " (+{} more)",
            errors.len() - ERROR_SUMMARY_LIMIT
        ));
    }
    summary
}

fn to_i32(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

fn to_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}
