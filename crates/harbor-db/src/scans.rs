//! Read path for `/api/scan/latest`: the newest finished scan and its rows.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ScanRow {
    pub id: Uuid,
    pub dashboard_id: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ShoppingResultRow {
    pub id: i64,
    pub batch_id: Option<i64>,
    pub prompt_id: Option<i64>,
    pub model: String,
    pub category: String,
    pub brand_name: String,
    pub rank: Option<i32>,
    pub weight: f32,
    pub is_tracked_brand: bool,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BrandResultRow {
    pub id: i64,
    pub batch_id: Option<i64>,
    pub prompt_id: Option<i64>,
    pub model: String,
    pub brand_name: String,
    pub descriptor: Option<String>,
    pub sentiment: String,
    pub sentiment_score: f32,
    pub is_tracked_brand: bool,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ConversationResultRow {
    pub model: String,
    pub tokens_used: i64,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WebsiteResultRow {
    pub url: String,
    pub has_schema: bool,
    pub issue_severity: Option<String>,
    pub issue_message: Option<String>,
}

/// Returns the most recent scan with `status = 'done'` for a dashboard.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_latest_done_scan(
    pool: &PgPool,
    dashboard_id: &str,
) -> Result<Option<ScanRow>, DbError> {
    let row = sqlx::query_as::<_, ScanRow>(
        "SELECT id, dashboard_id, status, created_at, completed_at \
         FROM scans \
         WHERE dashboard_id = $1 AND status = 'done' \
         ORDER BY created_at DESC \
         LIMIT 1",
    )
    .bind(dashboard_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_shopping_results_for_scan(
    pool: &PgPool,
    scan_id: Uuid,
) -> Result<Vec<ShoppingResultRow>, DbError> {
    let rows = sqlx::query_as::<_, ShoppingResultRow>(
        "SELECT id, batch_id, prompt_id, model, category, brand_name, rank, weight, \
                is_tracked_brand \
         FROM results_shopping \
         WHERE scan_id = $1 \
         ORDER BY id",
    )
    .bind(scan_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_brand_results_for_scan(
    pool: &PgPool,
    scan_id: Uuid,
) -> Result<Vec<BrandResultRow>, DbError> {
    let rows = sqlx::query_as::<_, BrandResultRow>(
        "SELECT id, batch_id, prompt_id, model, brand_name, descriptor, sentiment, \
                sentiment_score, is_tracked_brand \
         FROM results_brand \
         WHERE scan_id = $1 \
         ORDER BY id",
    )
    .bind(scan_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_conversation_results_for_scan(
    pool: &PgPool,
    scan_id: Uuid,
) -> Result<Vec<ConversationResultRow>, DbError> {
    let rows = sqlx::query_as::<_, ConversationResultRow>(
        "SELECT model, tokens_used, error, created_at \
         FROM results_conversations \
         WHERE scan_id = $1 \
         ORDER BY id",
    )
    .bind(scan_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_website_results_for_scan(
    pool: &PgPool,
    scan_id: Uuid,
) -> Result<Vec<WebsiteResultRow>, DbError> {
    let rows = sqlx::query_as::<_, WebsiteResultRow>(
        "SELECT url, has_schema, issue_severity, issue_message \
         FROM results_website \
         WHERE scan_id = $1 \
         ORDER BY id",
    )
    .bind(scan_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
