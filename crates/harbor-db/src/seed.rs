use harbor_core::PromptSeed;
use sqlx::PgPool;

use crate::DbError;

/// Upsert prompts from the seed file, keyed by prompt text.
///
/// Existing prompts keep their `last_executed_at`; topic, priority and
/// frequency are overwritten and the prompt is re-activated. All upserts run
/// inside a single transaction.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any database operation fails.
pub async fn seed_prompts(pool: &PgPool, seeds: &[PromptSeed]) -> Result<usize, DbError> {
    let mut tx = pool.begin().await?;
    let mut count = 0usize;

    for seed in seeds {
        sqlx::query(
            "INSERT INTO seed_prompts (prompt_text, topic, priority, frequency_days, is_active) \
             VALUES ($1, $2, $3, $4, true) \
             ON CONFLICT (prompt_text) DO UPDATE SET \
                 topic = EXCLUDED.topic, \
                 priority = EXCLUDED.priority, \
                 frequency_days = EXCLUDED.frequency_days, \
                 is_active = true, \
                 updated_at = NOW()",
        )
        .bind(seed.text.trim())
        .bind(seed.topic.trim())
        .bind(seed.priority.as_str())
        .bind(seed.frequency_days)
        .execute(&mut *tx)
        .await?;

        count += 1;
    }

    tx.commit().await?;
    Ok(count)
}
