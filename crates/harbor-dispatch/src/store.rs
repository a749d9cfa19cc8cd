//! Persistence seam for the dispatcher.
//!
//! [`PgStore`] forwards to `harbor_db`; tests substitute an in-memory store.

use std::future::Future;

use chrono::{DateTime, Utc};
use harbor_core::{PriorityTier, Prompt};
use harbor_db::{BatchTotals, DbError, ExecutionBatchRow, NewExecutionBatch, PromptResults};
use sqlx::PgPool;

pub trait DispatchStore: Send + Sync {
    fn create_batch(
        &self,
        batch: &NewExecutionBatch<'_>,
    ) -> impl Future<Output = Result<ExecutionBatchRow, DbError>> + Send;

    /// Active prompts matching the filters, freshness not yet applied.
    fn load_candidates(
        &self,
        topic: Option<&str>,
        priority: Option<PriorityTier>,
    ) -> impl Future<Output = Result<Vec<Prompt>, DbError>> + Send;

    /// Like [`Self::load_candidates`], minus prompts under another batch's live lease.
    fn load_claimable(
        &self,
        topic: Option<&str>,
        priority: Option<PriorityTier>,
    ) -> impl Future<Output = Result<Vec<Prompt>, DbError>> + Send;

    /// Claims `ids` until `lease_until`; returns the ids actually claimed.
    fn claim_prompts(
        &self,
        ids: &[i64],
        lease_until: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<i64>, DbError>> + Send;

    fn release_prompts(&self, ids: &[i64]) -> impl Future<Output = Result<u64, DbError>> + Send;

    fn tracked_brands(&self) -> impl Future<Output = Result<Vec<String>, DbError>> + Send;

    fn persist_results(
        &self,
        batch_id: i64,
        prompt_id: i64,
        results: &PromptResults,
    ) -> impl Future<Output = Result<usize, DbError>> + Send;

    fn mark_executed(
        &self,
        ids: &[i64],
        executed_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<u64, DbError>> + Send;

    fn complete_batch(
        &self,
        batch_id: i64,
        totals: &BatchTotals,
    ) -> impl Future<Output = Result<(), DbError>> + Send;

    fn fail_batch(
        &self,
        batch_id: i64,
        totals: &BatchTotals,
        error_summary: &str,
    ) -> impl Future<Output = Result<(), DbError>> + Send;

    fn run_recompute(&self, procedure: &str) -> impl Future<Output = Result<(), DbError>> + Send;
}

/// Postgres-backed store.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl DispatchStore for PgStore {
    async fn create_batch(
        &self,
        batch: &NewExecutionBatch<'_>,
    ) -> Result<ExecutionBatchRow, DbError> {
        harbor_db::create_execution_batch(&self.pool, batch).await
    }

    async fn load_candidates(
        &self,
        topic: Option<&str>,
        priority: Option<PriorityTier>,
    ) -> Result<Vec<Prompt>, DbError> {
        harbor_db::list_active_prompts(&self.pool, topic, priority).await
    }

    async fn load_claimable(
        &self,
        topic: Option<&str>,
        priority: Option<PriorityTier>,
    ) -> Result<Vec<Prompt>, DbError> {
        harbor_db::list_claimable_prompts(&self.pool, topic, priority).await
    }

    async fn claim_prompts(
        &self,
        ids: &[i64],
        lease_until: DateTime<Utc>,
    ) -> Result<Vec<i64>, DbError> {
        harbor_db::claim_prompts(&self.pool, ids, lease_until).await
    }

    async fn release_prompts(&self, ids: &[i64]) -> Result<u64, DbError> {
        harbor_db::release_prompt_claims(&self.pool, ids).await
    }

    async fn tracked_brands(&self) -> Result<Vec<String>, DbError> {
        harbor_db::list_tracked_brand_names(&self.pool).await
    }

    async fn persist_results(
        &self,
        batch_id: i64,
        prompt_id: i64,
        results: &PromptResults,
    ) -> Result<usize, DbError> {
        harbor_db::persist_prompt_results(&self.pool, batch_id, prompt_id, results).await
    }

    async fn mark_executed(&self, ids: &[i64], executed_at: DateTime<Utc>) -> Result<u64, DbError> {
        harbor_db::mark_prompts_executed(&self.pool, ids, executed_at).await
    }

    async fn complete_batch(&self, batch_id: i64, totals: &BatchTotals) -> Result<(), DbError> {
        harbor_db::complete_execution_batch(&self.pool, batch_id, totals).await
    }

    async fn fail_batch(
        &self,
        batch_id: i64,
        totals: &BatchTotals,
        error_summary: &str,
    ) -> Result<(), DbError> {
        harbor_db::fail_execution_batch(&self.pool, batch_id, totals, error_summary).await
    }

    async fn run_recompute(&self, procedure: &str) -> Result<(), DbError> {
        harbor_db::call_recompute_procedure(&self.pool, procedure).await
    }
}
