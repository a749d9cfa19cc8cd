use std::collections::{BTreeMap, BTreeSet};

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use harbor_db::{BrandResultRow, ConversationResultRow, ScanRow, ShoppingResultRow, WebsiteResultRow};
use harbor_scoring::{
    calculate_brand_visibility_score, calculate_harbor_score, calculate_visibility_score,
    calculate_website_readiness_score, BrandData, BrandVisibilityScore, CategoryRank,
    IssueSeverity, SentimentCounts, ShoppingData, VisibilityScore, WebsiteData, WebsiteIssue,
    WebsiteReadinessScore,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct LatestScanQuery {
    #[serde(rename = "dashboardId")]
    pub dashboard_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct ScanItem {
    pub id: Uuid,
    pub dashboard_id: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<ScanRow> for ScanItem {
    fn from(row: ScanRow) -> Self {
        Self {
            id: row.id,
            dashboard_id: row.dashboard_id,
            status: row.status,
            created_at: row.created_at,
            completed_at: row.completed_at,
        }
    }
}

#[derive(Debug, Default, PartialEq, Eq, Serialize)]
pub(super) struct ConversationSummary {
    pub total: u32,
    pub failed: u32,
    pub tokens_used: i64,
    pub by_model: BTreeMap<String, u32>,
}

#[derive(Debug, Default, Serialize)]
pub(super) struct LatestScanData {
    pub scan: Option<ScanItem>,
    pub shopping: VisibilityScore,
    pub brand: BrandVisibilityScore,
    pub website: WebsiteReadinessScore,
    pub conversations: ConversationSummary,
    pub harbor_score: u8,
}

/// Rows of one scan, as read from the four result tables.
#[derive(Debug, Default)]
pub(super) struct ScanRows {
    pub shopping: Vec<ShoppingResultRow>,
    pub brand: Vec<BrandResultRow>,
    pub conversations: Vec<ConversationResultRow>,
    pub website: Vec<WebsiteResultRow>,
}

fn count_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// Identifies the model response a result row was extracted from.
///
/// Rows written by a batch carry their prompt; rows without one are taken
/// to be their own response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum ResponseKey<'a> {
    Prompt {
        batch_id: Option<i64>,
        prompt_id: i64,
        model: &'a str,
    },
    Row { id: i64, model: &'a str },
}

impl<'a> ResponseKey<'a> {
    fn new(row_id: i64, batch_id: Option<i64>, prompt_id: Option<i64>, model: &'a str) -> Self {
        match prompt_id {
            Some(prompt_id) => Self::Prompt {
                batch_id,
                prompt_id,
                model,
            },
            None => Self::Row { id: row_id, model },
        }
    }

    fn model(self) -> &'a str {
        match self {
            Self::Prompt { model, .. } | Self::Row { model, .. } => model,
        }
    }
}

pub(super) fn shape_shopping(
    rows: &[ShoppingResultRow],
    conversations: &[ConversationResultRow],
) -> ShoppingData {
    let mut categories: BTreeMap<&str, CategoryRank> = BTreeMap::new();
    let mut competitor_mentions: BTreeMap<String, u32> = BTreeMap::new();
    let mut mentioned: BTreeSet<ResponseKey<'_>> = BTreeSet::new();
    let mut category_mentions: BTreeSet<(&str, ResponseKey<'_>)> = BTreeSet::new();

    for row in rows {
        let entry = categories
            .entry(row.category.as_str())
            .or_insert_with(|| CategoryRank {
                category: row.category.clone(),
                best_rank: None,
                mentions: 0,
            });

        if row.is_tracked_brand {
            let response = ResponseKey::new(row.id, row.batch_id, row.prompt_id, &row.model);
            mentioned.insert(response);
            if category_mentions.insert((row.category.as_str(), response)) {
                entry.mentions += 1;
            }
            let rank = row.rank.and_then(|r| u32::try_from(r).ok()).filter(|r| *r > 0);
            entry.best_rank = match (entry.best_rank, rank) {
                (Some(best), Some(r)) => Some(best.min(r)),
                (best, r) => best.or(r),
            };
        } else {
            *competitor_mentions.entry(row.brand_name.clone()).or_default() += 1;
        }
    }

    let mut model_mentions: BTreeMap<String, u32> = BTreeMap::new();
    for response in &mentioned {
        *model_mentions
            .entry(response.model().to_string())
            .or_default() += 1;
    }

    let models: BTreeSet<&str> = conversations
        .iter()
        .map(|c| c.model.as_str())
        .chain(rows.iter().map(|r| r.model.as_str()))
        .collect();

    ShoppingData {
        total_queries: count_u32(conversations.len()),
        total_mentions: count_u32(mentioned.len()),
        categories: categories.into_values().collect(),
        competitor_mentions,
        model_mentions,
        models_queried: count_u32(models.len()),
    }
}

pub(super) fn shape_brand(
    rows: &[BrandResultRow],
    conversations: &[ConversationResultRow],
) -> BrandData {
    let mut sentiment = SentimentCounts::default();
    let mut descriptors = Vec::new();
    let mut mentioned: BTreeSet<ResponseKey<'_>> = BTreeSet::new();

    for row in rows.iter().filter(|r| r.is_tracked_brand) {
        mentioned.insert(ResponseKey::new(
            row.id,
            row.batch_id,
            row.prompt_id,
            &row.model,
        ));
        match row.sentiment.as_str() {
            "positive" => sentiment.positive += 1,
            "negative" => sentiment.negative += 1,
            _ => sentiment.neutral += 1,
        }
        if let Some(descriptor) = row.descriptor.as_deref().filter(|d| !d.trim().is_empty()) {
            descriptors.push(descriptor.to_string());
        }
    }

    BrandData {
        total_responses: count_u32(conversations.iter().filter(|c| c.error.is_none()).count()),
        mentioned_responses: count_u32(mentioned.len()),
        sentiment,
        descriptors,
    }
}

/// Collapses per-issue rows into distinct pages; a page counts as having
/// schema if any of its rows says so.
pub(super) fn shape_website(rows: &[WebsiteResultRow]) -> WebsiteData {
    let mut pages: BTreeMap<&str, bool> = BTreeMap::new();
    let mut issues = Vec::new();

    for row in rows {
        let has_schema = pages.entry(row.url.as_str()).or_insert(false);
        *has_schema |= row.has_schema;

        if let Some(severity) = row.issue_severity.as_deref() {
            issues.push(WebsiteIssue {
                severity: IssueSeverity::from_label(severity),
                message: row.issue_message.clone().unwrap_or_default(),
            });
        }
    }

    let with_schema = pages.values().filter(|s| **s).count();
    let schema_coverage_pct = if pages.is_empty() {
        0.0
    } else {
        f64::from(count_u32(with_schema)) / f64::from(count_u32(pages.len())) * 100.0
    };

    WebsiteData {
        schema_coverage_pct,
        pages_analyzed: count_u32(pages.len()),
        issues,
    }
}

pub(super) fn summarize_conversations(rows: &[ConversationResultRow]) -> ConversationSummary {
    let mut summary = ConversationSummary {
        total: count_u32(rows.len()),
        ..ConversationSummary::default()
    };
    for row in rows {
        if row.error.is_some() {
            summary.failed += 1;
        }
        summary.tokens_used += row.tokens_used;
        *summary.by_model.entry(row.model.clone()).or_default() += 1;
    }
    summary
}

pub(super) fn build_latest_scan(scan: ScanRow, rows: &ScanRows) -> LatestScanData {
    let shopping = shape_shopping(&rows.shopping, &rows.conversations);
    let brand = shape_brand(&rows.brand, &rows.conversations);
    let website = shape_website(&rows.website);

    LatestScanData {
        scan: Some(scan.into()),
        shopping: calculate_visibility_score(&shopping),
        brand: calculate_brand_visibility_score(&brand),
        website: calculate_website_readiness_score(&website),
        conversations: summarize_conversations(&rows.conversations),
        harbor_score: calculate_harbor_score(&shopping, &brand, &website),
    }
}

pub(super) async fn latest_scan(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<LatestScanQuery>,
) -> Result<Json<ApiResponse<LatestScanData>>, ApiError> {
    let Some(dashboard_id) = query
        .dashboard_id
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
    else {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "dashboardId is required",
        ));
    };

    let scan = harbor_db::get_latest_done_scan(&state.pool, dashboard_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let Some(scan) = scan else {
        return Ok(Json(ApiResponse::new(LatestScanData::default(), req_id.0)));
    };

    let (shopping, brand, conversations) = futures::try_join!(
        harbor_db::list_shopping_results_for_scan(&state.pool, scan.id),
        harbor_db::list_brand_results_for_scan(&state.pool, scan.id),
        harbor_db::list_conversation_results_for_scan(&state.pool, scan.id),
    )
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let website = harbor_db::list_website_results_for_scan(&state.pool, scan.id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let rows = ScanRows {
        shopping,
        brand,
        conversations,
        website,
    };
    tracing::debug!(
        scan_id = %scan.id,
        shopping_rows = rows.shopping.len(),
        brand_rows = rows.brand.len(),
        conversation_rows = rows.conversations.len(),
        website_rows = rows.website.len(),
        "scoring latest scan"
    );

    Ok(Json(ApiResponse::new(build_latest_scan(scan, &rows), req_id.0)))
}

#[cfg(test)]
mod tests {
    use super::super::tests::{body_json, test_state};
    use super::super::{build_app, default_rate_limit_state};
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn conversation(model: &str, error: Option<&str>) -> ConversationResultRow {
        ConversationResultRow {
            model: model.to_string(),
            tokens_used: 100,
            error: error.map(str::to_string),
            created_at: Utc::now(),
        }
    }

    fn shopping(
        prompt_id: i64,
        model: &str,
        category: &str,
        brand: &str,
        rank: i32,
        tracked: bool,
    ) -> ShoppingResultRow {
        ShoppingResultRow {
            id: 0,
            batch_id: Some(1),
            prompt_id: Some(prompt_id),
            model: model.to_string(),
            category: category.to_string(),
            brand_name: brand.to_string(),
            rank: Some(rank),
            weight: 1.0,
            is_tracked_brand: tracked,
        }
    }

    fn brand(
        prompt_id: i64,
        model: &str,
        name: &str,
        descriptor: Option<&str>,
        sentiment: &str,
        tracked: bool,
    ) -> BrandResultRow {
        BrandResultRow {
            id: 0,
            batch_id: Some(1),
            prompt_id: Some(prompt_id),
            model: model.to_string(),
            brand_name: name.to_string(),
            descriptor: descriptor.map(str::to_string),
            sentiment: sentiment.to_string(),
            sentiment_score: 0.0,
            is_tracked_brand: tracked,
        }
    }

    fn website(url: &str, has_schema: bool, severity: Option<&str>) -> WebsiteResultRow {
        WebsiteResultRow {
            url: url.to_string(),
            has_schema,
            issue_severity: severity.map(str::to_string),
            issue_message: severity.map(|s| format!("{s} issue")),
        }
    }

    #[test]
    fn shopping_rows_split_tracked_and_competitor_mentions() {
        let rows = vec![
            shopping(1, "chatgpt", "shoes", "Acme", 2, true),
            shopping(1, "claude", "shoes", "Acme", 1, true),
            shopping(1, "chatgpt", "shoes", "Rival", 1, false),
            shopping(1, "claude", "jackets", "Rival", 3, false),
        ];
        let conversations = vec![
            conversation("chatgpt", None),
            conversation("claude", None),
            conversation("perplexity", Some("timeout")),
        ];

        let data = shape_shopping(&rows, &conversations);

        assert_eq!(data.total_queries, 3);
        assert_eq!(data.total_mentions, 2);
        assert_eq!(data.models_queried, 3);
        assert_eq!(data.competitor_mentions.get("Rival"), Some(&2));
        assert_eq!(data.model_mentions.len(), 2);
        assert_eq!(data.categories.len(), 2);
        let shoes = &data.categories[1];
        assert_eq!(shoes.category, "shoes");
        assert_eq!(shoes.best_rank, Some(1));
        assert_eq!(shoes.mentions, 2);
        assert_eq!(data.categories[0].mentions, 0);
    }

    #[test]
    fn brand_rows_count_only_tracked_brands_and_successful_responses() {
        let rows = vec![
            brand(1, "chatgpt", "Acme", Some("reliable"), "positive", true),
            brand(1, "claude", "Acme", None, "neutral", true),
            brand(1, "claude", "Rival", Some("cheap"), "negative", false),
        ];
        let conversations = vec![conversation("chatgpt", None), conversation("claude", Some("x"))];

        let data = shape_brand(&rows, &conversations);

        assert_eq!(data.total_responses, 1);
        assert_eq!(data.mentioned_responses, 2);
        assert_eq!(data.sentiment.positive, 1);
        assert_eq!(data.sentiment.neutral, 1);
        assert_eq!(data.sentiment.negative, 0);
        assert_eq!(data.descriptors, vec!["reliable".to_string()]);
    }

    #[test]
    fn response_naming_two_tracked_brands_counts_once() {
        let rows = vec![
            shopping(1, "chatgpt", "shoes", "Acme", 1, true),
            shopping(1, "chatgpt", "shoes", "Acme Outdoor", 2, true),
            shopping(1, "claude", "shoes", "Rival", 1, false),
        ];
        let conversations = vec![conversation("chatgpt", None), conversation("claude", None)];

        let data = shape_shopping(&rows, &conversations);

        assert_eq!(data.total_queries, 2);
        assert_eq!(data.total_mentions, 1);
        assert_eq!(data.categories[0].mentions, 1);
        assert_eq!(data.model_mentions.get("chatgpt"), Some(&1));
        let score = calculate_visibility_score(&data);
        assert!((score.breakdown.mention_rate - 15.0).abs() < f64::EPSILON);
    }

    #[test]
    fn same_model_on_different_prompts_counts_each_response() {
        let rows = vec![
            shopping(1, "chatgpt", "shoes", "Acme", 1, true),
            shopping(2, "chatgpt", "shoes", "Acme", 3, true),
        ];
        let conversations = vec![conversation("chatgpt", None), conversation("chatgpt", None)];

        let data = shape_shopping(&rows, &conversations);

        assert_eq!(data.total_mentions, 2);
        assert_eq!(data.model_mentions.get("chatgpt"), Some(&2));
    }

    #[test]
    fn brand_recognition_counts_responses_not_brands() {
        let rows = vec![
            brand(1, "chatgpt", "Acme", Some("reliable"), "positive", true),
            brand(1, "chatgpt", "Acme Outdoor", Some("rugged"), "positive", true),
        ];
        let conversations = vec![conversation("chatgpt", None), conversation("claude", None)];

        let data = shape_brand(&rows, &conversations);

        assert_eq!(data.total_responses, 2);
        assert_eq!(data.mentioned_responses, 1);
        assert_eq!(data.sentiment.positive, 2);
        let score = calculate_brand_visibility_score(&data);
        assert!((score.breakdown.recognition - 15.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rows_without_prompt_are_separate_responses() {
        let mut first = shopping(1, "chatgpt", "shoes", "Acme", 1, true);
        first.id = 10;
        first.prompt_id = None;
        let mut second = first.clone();
        second.id = 11;

        let data = shape_shopping(&[first, second], &[]);

        assert_eq!(data.total_mentions, 2);
    }

    #[test]
    fn website_rows_dedupe_pages_for_schema_coverage() {
        let rows = vec![
            website("https://acme.test/", true, Some("warning")),
            website("https://acme.test/", true, Some("info")),
            website("https://acme.test/shop", false, Some("critical")),
            website("https://acme.test/about", false, None),
            website("https://acme.test/faq", true, None),
        ];

        let data = shape_website(&rows);

        assert_eq!(data.pages_analyzed, 4);
        assert!((data.schema_coverage_pct - 50.0).abs() < f64::EPSILON);
        assert_eq!(data.issues.len(), 3);
        assert_eq!(data.issues[2].severity, IssueSeverity::Critical);
    }

    #[test]
    fn conversation_summary_counts_failures_and_tokens() {
        let rows = vec![
            conversation("chatgpt", None),
            conversation("chatgpt", Some("rate limited")),
            conversation("claude", None),
        ];
        let summary = summarize_conversations(&rows);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.tokens_used, 300);
        assert_eq!(summary.by_model.get("chatgpt"), Some(&2));
    }

    #[test]
    fn empty_skeleton_is_all_zero() {
        let json = serde_json::to_value(LatestScanData::default()).expect("serialize");
        assert!(json["scan"].is_null());
        assert_eq!(json["harbor_score"], 0);
        assert_eq!(json["shopping"]["total"], 0);
        assert_eq!(json["brand"]["total"], 0);
        assert_eq!(json["website"]["total"], 0);
    }

    #[tokio::test]
    async fn missing_dashboard_id_is_a_validation_error() {
        let app = build_app(
            test_state(super::super::tests::lazy_pool()),
            default_rate_limit_state(),
        );
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/scan/latest?dashboardId=%20")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    async fn insert_scan(pool: &sqlx::PgPool, dashboard: &str, status: &str, age_mins: i32) -> Uuid {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO scans (id, dashboard_id, status, created_at, completed_at) \
             VALUES ($1, $2, $3, NOW() - make_interval(mins => $4), NOW())",
        )
        .bind(id)
        .bind(dashboard)
        .bind(status)
        .bind(age_mins)
        .execute(pool)
        .await
        .expect("insert scan");
        id
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn latest_scan_without_done_scan_returns_skeleton(pool: sqlx::PgPool) {
        insert_scan(&pool, "dash-1", "running", 0).await;
        let app = build_app(test_state(pool), default_rate_limit_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/scan/latest?dashboardId=dash-1")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert!(json["data"]["scan"].is_null());
        assert_eq!(json["data"]["harbor_score"], 0);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn latest_scan_scores_newest_done_scan(pool: sqlx::PgPool) {
        let older = insert_scan(&pool, "dash-1", "done", 60).await;
        let newest = insert_scan(&pool, "dash-1", "done", 5).await;
        insert_scan(&pool, "dash-1", "failed", 1).await;

        for model in ["chatgpt", "claude"] {
            sqlx::query(
                "INSERT INTO results_conversations (scan_id, model, response_text, tokens_used) \
                 VALUES ($1, $2, 'answer', 250)",
            )
            .bind(newest)
            .bind(model)
            .execute(&pool)
            .await
            .expect("insert conversation");
        }
        sqlx::query(
            "INSERT INTO results_shopping \
             (scan_id, model, category, brand_name, rank, weight, is_tracked_brand) \
             VALUES ($1, 'chatgpt', 'shoes', 'Acme', 1, 1.0, true), \
                    ($1, 'claude', 'shoes', 'Acme', 1, 1.0, true)",
        )
        .bind(newest)
        .execute(&pool)
        .await
        .expect("insert shopping");
        sqlx::query(
            "INSERT INTO results_brand \
             (scan_id, model, brand_name, descriptor, sentiment, sentiment_score) \
             VALUES ($1, 'chatgpt', 'Acme', 'reliable', 'positive', 0.8)",
        )
        .bind(newest)
        .execute(&pool)
        .await
        .expect("insert brand");
        sqlx::query(
            "INSERT INTO results_website (scan_id, url, has_schema) \
             VALUES ($1, 'https://acme.test/', true)",
        )
        .bind(newest)
        .execute(&pool)
        .await
        .expect("insert website");
        sqlx::query(
            "INSERT INTO results_shopping \
             (scan_id, model, category, brand_name, rank, weight, is_tracked_brand) \
             VALUES ($1, 'chatgpt', 'shoes', 'Rival', 1, 1.0, false)",
        )
        .bind(older)
        .execute(&pool)
        .await
        .expect("insert older shopping");

        let app = build_app(test_state(pool), default_rate_limit_state());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/scan/latest?dashboardId=dash-1")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        let data = &json["data"];
        assert_eq!(data["scan"]["id"], newest.to_string());
        assert_eq!(data["shopping"]["total"], 100);
        assert_eq!(data["website"]["total"], 100);
        assert_eq!(data["conversations"]["total"], 2);
        assert_eq!(data["conversations"]["tokens_used"], 500);
        let harbor = data["harbor_score"].as_u64().expect("harbor score");
        assert!(harbor > 0 && harbor <= 100);
    }
}
