//! Database operations for `prompt_execution_batches`.
//!
//! A batch is inserted as `running` and moves exactly once to `completed` or
//! `failed`. Terminal rows are never updated again.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

const BATCH_COLUMNS: &str = "id, public_id, batch_type, trigger_source, status, \
     prompts_total, prompts_completed, prompts_failed, total_tokens_used, \
     estimated_cost_usd, topic_filter, priority_filter, forced, started_at, \
     finished_at, error_summary";

/// A row from the `prompt_execution_batches` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ExecutionBatchRow {
    pub id: i64,
    pub public_id: Uuid,
    pub batch_type: String,
    pub trigger_source: String,
    pub status: String,
    pub prompts_total: i32,
    pub prompts_completed: i32,
    pub prompts_failed: i32,
    pub total_tokens_used: i64,
    pub estimated_cost_usd: Decimal,
    pub topic_filter: Option<String>,
    pub priority_filter: Option<String>,
    pub forced: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error_summary: Option<String>,
}

/// Input for [`create_execution_batch`].
#[derive(Debug, Clone)]
pub struct NewExecutionBatch<'a> {
    pub batch_type: &'a str,
    pub trigger_source: &'a str,
    pub topic_filter: Option<&'a str>,
    pub priority_filter: Option<&'a str>,
    pub forced: bool,
}

/// Final counters written when a batch leaves `running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchTotals {
    pub prompts_total: i32,
    pub prompts_completed: i32,
    pub prompts_failed: i32,
    pub total_tokens_used: i64,
    pub estimated_cost_usd: Decimal,
}

/// Inserts a new batch in `running` status and returns the full row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_execution_batch(
    pool: &PgPool,
    batch: &NewExecutionBatch<'_>,
) -> Result<ExecutionBatchRow, DbError> {
    let row = sqlx::query_as::<_, ExecutionBatchRow>(&format!(
        "INSERT INTO prompt_execution_batches \
             (public_id, batch_type, trigger_source, status, topic_filter, priority_filter, forced) \
         VALUES ($1, $2, $3, 'running', $4, $5, $6) \
         RETURNING {BATCH_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(batch.batch_type)
    .bind(batch.trigger_source)
    .bind(batch.topic_filter)
    .bind(batch.priority_filter)
    .bind(batch.forced)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Marks a running batch `completed` with its final totals.
///
/// # Errors
///
/// Returns [`DbError::InvalidBatchTransition`] if the batch is not `running`,
/// or [`DbError::Sqlx`] if the update fails.
pub async fn complete_execution_batch(
    pool: &PgPool,
    id: i64,
    totals: &BatchTotals,
) -> Result<(), DbError> {
    finish_execution_batch(pool, id, "completed", totals, None).await
}

/// Marks a running batch `failed` with its final totals and an error summary.
///
/// # Errors
///
/// Returns [`DbError::InvalidBatchTransition`] if the batch is not `running`,
/// or [`DbError::Sqlx`] if the update fails.
pub async fn fail_execution_batch(
    pool: &PgPool,
    id: i64,
    totals: &BatchTotals,
    error_summary: &str,
) -> Result<(), DbError> {
    finish_execution_batch(pool, id, "failed", totals, Some(error_summary)).await
}

async fn finish_execution_batch(
    pool: &PgPool,
    id: i64,
    status: &str,
    totals: &BatchTotals,
    error_summary: Option<&str>,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE prompt_execution_batches \
         SET status = $1, prompts_total = $2, prompts_completed = $3, prompts_failed = $4, \
             total_tokens_used = $5, estimated_cost_usd = $6, error_summary = $7, \
             finished_at = NOW() \
         WHERE id = $8 AND status = 'running'",
    )
    .bind(status)
    .bind(totals.prompts_total)
    .bind(totals.prompts_completed)
    .bind(totals.prompts_failed)
    .bind(totals.total_tokens_used)
    .bind(totals.estimated_cost_usd)
    .bind(error_summary)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidBatchTransition {
            id,
            expected_status: "running",
        });
    }

    Ok(())
}

/// Fetches a single batch by its internal `id`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists, or [`DbError::Sqlx`] if
/// the query fails.
pub async fn get_execution_batch(pool: &PgPool, id: i64) -> Result<ExecutionBatchRow, DbError> {
    sqlx::query_as::<_, ExecutionBatchRow>(&format!(
        "SELECT {BATCH_COLUMNS} FROM prompt_execution_batches WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Fetches a single batch by its public UUID.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists, or [`DbError::Sqlx`] if
/// the query fails.
pub async fn get_execution_batch_by_public_id(
    pool: &PgPool,
    public_id: Uuid,
) -> Result<ExecutionBatchRow, DbError> {
    sqlx::query_as::<_, ExecutionBatchRow>(&format!(
        "SELECT {BATCH_COLUMNS} FROM prompt_execution_batches WHERE public_id = $1"
    ))
    .bind(public_id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Returns the most recent `limit` batches, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_execution_batches(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<ExecutionBatchRow>, DbError> {
    let rows = sqlx::query_as::<_, ExecutionBatchRow>(&format!(
        "SELECT {BATCH_COLUMNS} FROM prompt_execution_batches \
         ORDER BY started_at DESC, id DESC \
         LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
