use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderMap},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use harbor_core::{BatchRequest, PriorityTier};
use harbor_dispatch::{stale_report, BatchSummary, StaleReport};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState};

const RECENT_BATCH_LIMIT: i64 = 10;

#[derive(Debug, Deserialize)]
pub(super) struct TriggerQuery {
    pub manual: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct ExecuteBatchBody {
    pub batch_size: Option<u32>,
    pub batch_type: Option<String>,
    pub topic: Option<String>,
    pub priority: Option<String>,
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Deserialize)]
pub(super) struct BatchStatusQuery {
    pub batch_id: Option<String>,
    pub check_stale: Option<String>,
    pub topic: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct BatchItem {
    pub batch_id: Uuid,
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

impl From<harbor_db::ExecutionBatchRow> for BatchItem {
    fn from(row: harbor_db::ExecutionBatchRow) -> Self {
        Self {
            batch_id: row.public_id,
            batch_type: row.batch_type,
            trigger_source: row.trigger_source,
            status: row.status,
            prompts_total: row.prompts_total,
            prompts_completed: row.prompts_completed,
            prompts_failed: row.prompts_failed,
            total_tokens_used: row.total_tokens_used,
            estimated_cost_usd: row.estimated_cost_usd.normalize(),
            topic_filter: row.topic_filter,
            priority_filter: row.priority_filter,
            forced: row.forced,
            started_at: row.started_at,
            finished_at: row.finished_at,
            error_summary: row.error_summary,
        }
    }
}

/// The three read modes of `GET /api/prompts/execute-batch`.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub(super) enum BatchStatusView {
    Batch(BatchItem),
    Stale(StaleReport),
    Recent(Vec<BatchItem>),
}

fn is_true(flag: Option<&str>) -> bool {
    flag.is_some_and(|v| v.eq_ignore_ascii_case("true"))
}

/// Parses the optional JSON body; an empty body means all defaults.
fn parse_body(request_id: &str, body: &[u8]) -> Result<ExecuteBatchBody, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ExecuteBatchBody::default());
    }
    serde_json::from_slice(body).map_err(|e| {
        ApiError::new(
            request_id,
            "validation_error",
            format!("invalid request body: {e}"),
        )
    })
}

fn build_request(
    request_id: &str,
    body: ExecuteBatchBody,
    trigger: harbor_core::TriggerSource,
) -> Result<BatchRequest, ApiError> {
    let priority = body
        .priority
        .as_deref()
        .map(str::parse::<PriorityTier>)
        .transpose()
        .map_err(|e| ApiError::new(request_id, "validation_error", e.to_string()))?;

    Ok(BatchRequest::new(
        body.batch_size,
        body.batch_type,
        body.topic,
        priority,
        body.force,
        trigger,
    ))
}

pub(super) async fn execute_batch(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<TriggerQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ApiResponse<BatchSummary>>, ApiError> {
    let Some(trigger) = state.cron_auth.authorize(
        headers.get(header::AUTHORIZATION),
        is_true(query.manual.as_deref()),
    ) else {
        tracing::warn!(request_id = %req_id.0, "rejected batch trigger: bad or missing secret");
        return Err(ApiError::new(req_id.0, "unauthorized", "Unauthorized"));
    };

    let request = build_request(&req_id.0, parse_body(&req_id.0, &body)?, trigger)?;

    match state.dispatcher.run_batch(&request).await {
        Ok(summary) => Ok(Json(ApiResponse::new(summary, req_id.0))),
        Err(e) => {
            tracing::error!(request_id = %req_id.0, error = %e, "batch execution failed");
            Err(ApiError::new(
                req_id.0,
                "internal_error",
                "Batch execution failed",
            ))
        }
    }
}

pub(super) async fn batch_status(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<BatchStatusQuery>,
) -> Result<Json<ApiResponse<BatchStatusView>>, ApiError> {
    if let Some(raw) = query.batch_id.as_deref() {
        let public_id = Uuid::parse_str(raw.trim()).map_err(|_| {
            ApiError::new(
                req_id.0.clone(),
                "validation_error",
                "batch_id must be a UUID",
            )
        })?;
        let row = harbor_db::get_execution_batch_by_public_id(&state.pool, public_id)
            .await
            .map_err(|e| match e {
                harbor_db::DbError::NotFound => {
                    ApiError::new(req_id.0.clone(), "not_found", "batch not found")
                }
                other => map_db_error(req_id.0.clone(), &other),
            })?;
        return Ok(Json(ApiResponse::new(
            BatchStatusView::Batch(row.into()),
            req_id.0,
        )));
    }

    if is_true(query.check_stale.as_deref()) {
        let topic = query.topic.as_deref().map(str::trim).filter(|t| !t.is_empty());
        let report = stale_report(state.dispatcher.store(), topic, Utc::now())
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "stale prompt report failed");
                ApiError::new(req_id.0.clone(), "internal_error", "stale check failed")
            })?;
        return Ok(Json(ApiResponse::new(
            BatchStatusView::Stale(report),
            req_id.0,
        )));
    }

    let rows = harbor_db::list_execution_batches(&state.pool, RECENT_BATCH_LIMIT)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    let items = rows.into_iter().map(BatchItem::from).collect();
    Ok(Json(ApiResponse::new(BatchStatusView::Recent(items), req_id.0)))
}
