//! Database operations for `seed_prompts`.

use chrono::{DateTime, Utc};
use harbor_core::{PriorityTier, Prompt};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `seed_prompts` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PromptRow {
    pub id: i64,
    pub prompt_text: String,
    pub topic: String,
    pub priority: String,
    pub frequency_days: i32,
    pub is_active: bool,
    pub last_executed_at: Option<DateTime<Utc>>,
    pub claimed_until: Option<DateTime<Utc>>,
}

impl TryFrom<PromptRow> for Prompt {
    type Error = DbError;

    fn try_from(row: PromptRow) -> Result<Self, Self::Error> {
        let priority: PriorityTier = row.priority.parse().map_err(|e| DbError::InvalidRow {
            table: "seed_prompts",
            reason: format!("prompt {}: {e}", row.id),
        })?;

        Ok(Prompt {
            id: row.id,
            text: row.prompt_text,
            topic: row.topic,
            priority,
            frequency_days: row.frequency_days,
            is_active: row.is_active,
            last_executed_at: row.last_executed_at,
        })
    }
}

const ACTIVE_PROMPTS_SQL: &str = "SELECT id, prompt_text, topic, priority, frequency_days, is_active, \
            last_executed_at, claimed_until \
     FROM seed_prompts \
     WHERE is_active = true \
       AND ($1::TEXT IS NULL OR topic = $1) \
       AND ($2::TEXT IS NULL OR priority = $2)";

const UNLEASED: &str = " AND (claimed_until IS NULL OR claimed_until < NOW())";

const ORDER_BY_STALENESS: &str = " ORDER BY last_executed_at ASC NULLS FIRST, id ASC";

async fn fetch_prompts(
    pool: &PgPool,
    sql: &str,
    topic: Option<&str>,
    priority: Option<PriorityTier>,
) -> Result<Vec<Prompt>, DbError> {
    let rows = sqlx::query_as::<_, PromptRow>(sql)
        .bind(topic)
        .bind(priority.map(PriorityTier::as_str))
        .fetch_all(pool)
        .await?;

    rows.into_iter().map(Prompt::try_from).collect()
}

/// Returns every active prompt, optionally narrowed by topic and priority.
///
/// Freshness is not evaluated here; callers apply
/// [`harbor_core::select_due`] so the predicate uses each prompt's own
/// `frequency_days`. Prompts leased by a running batch are included.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails, or [`DbError::InvalidRow`]
/// if a row carries an unknown priority.
pub async fn list_active_prompts(
    pool: &PgPool,
    topic: Option<&str>,
    priority: Option<PriorityTier>,
) -> Result<Vec<Prompt>, DbError> {
    let sql = format!("{ACTIVE_PROMPTS_SQL}{ORDER_BY_STALENESS}");
    fetch_prompts(pool, &sql, topic, priority).await
}

/// Like [`list_active_prompts`], but skips prompts under a live lease so a
/// batch never spends its slots on work another batch already holds.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails, or [`DbError::InvalidRow`]
/// if a row carries an unknown priority.
pub async fn list_claimable_prompts(
    pool: &PgPool,
    topic: Option<&str>,
    priority: Option<PriorityTier>,
) -> Result<Vec<Prompt>, DbError> {
    let sql = format!("{ACTIVE_PROMPTS_SQL}{UNLEASED}{ORDER_BY_STALENESS}");
    fetch_prompts(pool, &sql, topic, priority).await
}

/// Atomically claims the given prompts until `lease_until`.
///
/// Only prompts without a live lease are claimed, so two overlapping batches
/// never receive the same prompt. Returns the ids that were claimed by this
/// call, in ascending order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn claim_prompts(
    pool: &PgPool,
    ids: &[i64],
    lease_until: DateTime<Utc>,
) -> Result<Vec<i64>, DbError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut claimed: Vec<i64> = sqlx::query_scalar(
        "UPDATE seed_prompts \
         SET claimed_until = $2, updated_at = NOW() \
         WHERE id = ANY($1) \
           AND is_active = true \
           AND (claimed_until IS NULL OR claimed_until < NOW()) \
         RETURNING id",
    )
    .bind(ids)
    .bind(lease_until)
    .fetch_all(pool)
    .await?;

    claimed.sort_unstable();
    tracing::debug!(
        requested = ids.len(),
        claimed = claimed.len(),
        "claimed prompt leases"
    );
    Ok(claimed)
}

/// Clears the lease on prompts without touching `last_executed_at`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn release_prompt_claims(pool: &PgPool, ids: &[i64]) -> Result<u64, DbError> {
    if ids.is_empty() {
        return Ok(0);
    }

    let result = sqlx::query(
        "UPDATE seed_prompts SET claimed_until = NULL, updated_at = NOW() WHERE id = ANY($1)",
    )
    .bind(ids)
    .execute(pool)
    .await?;

    tracing::debug!(released = result.rows_affected(), "released prompt leases");
    Ok(result.rows_affected())
}

/// Sets `last_executed_at = executed_at` and clears the lease.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn mark_prompts_executed(
    pool: &PgPool,
    ids: &[i64],
    executed_at: DateTime<Utc>,
) -> Result<u64, DbError> {
    if ids.is_empty() {
        return Ok(0);
    }

    let result = sqlx::query(
        "UPDATE seed_prompts \
         SET last_executed_at = $2, claimed_until = NULL, updated_at = NOW() \
         WHERE id = ANY($1)",
    )
    .bind(ids)
    .bind(executed_at)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}
