//! Writes to the per-model result tables.

use sqlx::{PgConnection, PgPool};

use crate::DbError;

#[derive(Debug, Clone, PartialEq)]
pub struct NewConversationResult {
    pub model: String,
    pub response_text: Option<String>,
    pub response_hash: Option<String>,
    pub tokens_used: i64,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewShoppingResult {
    pub model: String,
    pub category: String,
    pub brand_name: String,
    pub rank: Option<i32>,
    pub weight: f32,
    pub is_tracked_brand: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewBrandResult {
    pub model: String,
    pub brand_name: String,
    pub descriptor: Option<String>,
    pub sentiment: String,
    pub sentiment_score: f32,
    pub is_tracked_brand: bool,
}

/// Everything one prompt produced across all models.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PromptResults {
    pub conversations: Vec<NewConversationResult>,
    pub shopping: Vec<NewShoppingResult>,
    pub brand: Vec<NewBrandResult>,
}

/// Writes all result rows for one prompt of one batch in a single transaction.
///
/// Returns the number of rows inserted across the three tables.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any insert fails; nothing is written in that case.
pub async fn persist_prompt_results(
    pool: &PgPool,
    batch_id: i64,
    prompt_id: i64,
    results: &PromptResults,
) -> Result<usize, DbError> {
    let mut tx = pool.begin().await?;

    for row in &results.conversations {
        insert_conversation_result(&mut tx, batch_id, prompt_id, row).await?;
    }
    insert_shopping_results(&mut tx, batch_id, prompt_id, &results.shopping).await?;
    insert_brand_results(&mut tx, batch_id, prompt_id, &results.brand).await?;

    tx.commit().await?;
    Ok(results.conversations.len() + results.shopping.len() + results.brand.len())
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_conversation_result(
    conn: &mut PgConnection,
    batch_id: i64,
    prompt_id: i64,
    row: &NewConversationResult,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO results_conversations \
             (batch_id, prompt_id, model, response_text, response_hash, tokens_used, error) \
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(batch_id)
    .bind(prompt_id)
    .bind(&row.model)
    .bind(&row.response_text)
    .bind(&row.response_hash)
    .bind(row.tokens_used)
    .bind(&row.error)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if any insert fails.
pub async fn insert_shopping_results(
    conn: &mut PgConnection,
    batch_id: i64,
    prompt_id: i64,
    rows: &[NewShoppingResult],
) -> Result<(), DbError> {
    for row in rows {
        sqlx::query(
            "INSERT INTO results_shopping \
                 (batch_id, prompt_id, model, category, brand_name, rank, weight, is_tracked_brand) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(batch_id)
        .bind(prompt_id)
        .bind(&row.model)
        .bind(&row.category)
        .bind(&row.brand_name)
        .bind(row.rank)
        .bind(row.weight)
        .bind(row.is_tracked_brand)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if any insert fails.
pub async fn insert_brand_results(
    conn: &mut PgConnection,
    batch_id: i64,
    prompt_id: i64,
    rows: &[NewBrandResult],
) -> Result<(), DbError> {
    for row in rows {
        sqlx::query(
            "INSERT INTO results_brand \
                 (batch_id, prompt_id, model, brand_name, descriptor, sentiment, \
                  sentiment_score, is_tracked_brand) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(batch_id)
        .bind(prompt_id)
        .bind(&row.model)
        .bind(&row.brand_name)
        .bind(&row.descriptor)
        .bind(&row.sentiment)
        .bind(row.sentiment_score)
        .bind(row.is_tracked_brand)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Names of active tracked brands, used to flag the client's own mentions.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_tracked_brand_names(pool: &PgPool) -> Result<Vec<String>, DbError> {
    let names = sqlx::query_scalar::<_, String>(
        "SELECT name FROM tracked_brands WHERE is_active = true ORDER BY name",
    )
    .fetch_all(pool)
    .await?;

    Ok(names)
}
