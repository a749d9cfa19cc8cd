//! Live integration tests for harbor-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database spun up by the
//! sqlx test harness. `"../../migrations"` resolves to the workspace
//! migration directory.

use chrono::{Duration, Utc};
use harbor_core::{estimate_cost_usd, PriorityTier, PromptSeed};
use harbor_db::{
    call_recompute_procedure, claim_prompts, complete_execution_batch, create_execution_batch,
    fail_execution_batch, get_execution_batch, get_execution_batch_by_public_id,
    get_latest_done_scan, list_active_prompts, list_claimable_prompts, list_execution_batches,
    list_shopping_results_for_scan, list_tracked_brand_names, mark_prompts_executed,
    persist_prompt_results, release_prompt_claims, seed_prompts, BatchTotals, DbError,
    NewConversationResult, NewExecutionBatch, NewShoppingResult, PromptResults,
};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn seed(text: &str, topic: &str, priority: PriorityTier) -> PromptSeed {
    PromptSeed {
        text: text.to_string(),
        topic: topic.to_string(),
        priority,
        frequency_days: 7,
    }
}

async fn seed_three(pool: &sqlx::PgPool) {
    seed_prompts(
        pool,
        &[
            seed("best running shoes", "running", PriorityTier::Core),
            seed("best trail shoes", "running", PriorityTier::LongTail),
            seed("best crm", "crm", PriorityTier::Core),
        ],
    )
    .await
    .expect("seed_prompts failed");
}

fn new_batch() -> NewExecutionBatch<'static> {
    NewExecutionBatch {
        batch_type: "standard",
        trigger_source: "manual",
        topic_filter: None,
        priority_filter: None,
        forced: false,
    }
}

fn totals(completed: i32, failed: i32, tokens: i64) -> BatchTotals {
    BatchTotals {
        prompts_total: completed + failed,
        prompts_completed: completed,
        prompts_failed: failed,
        total_tokens_used: tokens,
        estimated_cost_usd: estimate_cost_usd(u64::try_from(tokens).expect("non-negative")),
    }
}

// ---------------------------------------------------------------------------
// Prompts
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn list_active_prompts_applies_filters(pool: sqlx::PgPool) {
    seed_three(&pool).await;

    let all = list_active_prompts(&pool, None, None).await.expect("list");
    assert_eq!(all.len(), 3);

    let running = list_active_prompts(&pool, Some("running"), None)
        .await
        .expect("list running");
    assert_eq!(running.len(), 2);

    let core_running = list_active_prompts(&pool, Some("running"), Some(PriorityTier::Core))
        .await
        .expect("list core running");
    assert_eq!(core_running.len(), 1);
    assert_eq!(core_running[0].text, "best running shoes");
}

#[sqlx::test(migrations = "../../migrations")]
async fn seeding_twice_updates_in_place(pool: sqlx::PgPool) {
    seed_three(&pool).await;
    let mut changed = seed("best crm", "saas", PriorityTier::Standard);
    changed.frequency_days = 30;
    seed_prompts(&pool, &[changed]).await.expect("reseed");

    let prompts = list_active_prompts(&pool, Some("saas"), None)
        .await
        .expect("list");
    assert_eq!(prompts.len(), 1);
    assert_eq!(prompts[0].frequency_days, 30);
    assert_eq!(prompts[0].priority, PriorityTier::Standard);
}

#[sqlx::test(migrations = "../../migrations")]
async fn claim_is_exclusive_until_released(pool: sqlx::PgPool) {
    seed_three(&pool).await;
    let ids: Vec<i64> = list_active_prompts(&pool, None, None)
        .await
        .expect("list")
        .iter()
        .map(|p| p.id)
        .collect();
    let lease = Utc::now() + Duration::minutes(15);

    let first = claim_prompts(&pool, &ids, lease).await.expect("first claim");
    assert_eq!(first.len(), 3);

    let second = claim_prompts(&pool, &ids, lease).await.expect("second claim");
    assert!(second.is_empty(), "leased prompts must not be claimed twice");

    release_prompt_claims(&pool, &ids[..1]).await.expect("release");
    let third = claim_prompts(&pool, &ids, lease).await.expect("third claim");
    assert_eq!(third, vec![ids[0]]);
}

#[sqlx::test(migrations = "../../migrations")]
async fn claimable_prompts_skip_live_leases(pool: sqlx::PgPool) {
    seed_three(&pool).await;
    let ids: Vec<i64> = list_active_prompts(&pool, None, None)
        .await
        .expect("list")
        .iter()
        .map(|p| p.id)
        .collect();
    claim_prompts(&pool, &ids[..2], Utc::now() + Duration::minutes(15))
        .await
        .expect("claim");

    let claimable: Vec<i64> = list_claimable_prompts(&pool, None, None)
        .await
        .expect("claimable")
        .iter()
        .map(|p| p.id)
        .collect();
    assert_eq!(claimable, vec![ids[2]]);

    let active = list_active_prompts(&pool, None, None).await.expect("list");
    assert_eq!(active.len(), 3, "leased prompts stay visible to reports");
}

#[sqlx::test(migrations = "../../migrations")]
async fn expired_lease_can_be_reclaimed(pool: sqlx::PgPool) {
    seed_three(&pool).await;
    let ids: Vec<i64> = list_active_prompts(&pool, None, None)
        .await
        .expect("list")
        .iter()
        .map(|p| p.id)
        .collect();

    claim_prompts(&pool, &ids, Utc::now() - Duration::seconds(1))
        .await
        .expect("claim with expired lease");
    let again = claim_prompts(&pool, &ids, Utc::now() + Duration::minutes(5))
        .await
        .expect("reclaim");
    assert_eq!(again.len(), 3);
}

#[sqlx::test(migrations = "../../migrations")]
async fn mark_executed_sets_timestamp_and_clears_lease(pool: sqlx::PgPool) {
    seed_three(&pool).await;
    let prompts = list_active_prompts(&pool, Some("crm"), None)
        .await
        .expect("list");
    let id = prompts[0].id;
    claim_prompts(&pool, &[id], Utc::now() + Duration::minutes(15))
        .await
        .expect("claim");

    let ran_at = Utc::now();
    let updated = mark_prompts_executed(&pool, &[id], ran_at)
        .await
        .expect("mark executed");
    assert_eq!(updated, 1);

    let reloaded = list_active_prompts(&pool, Some("crm"), None)
        .await
        .expect("reload");
    let last = reloaded[0].last_executed_at.expect("timestamp set");
    assert!((last - ran_at).num_milliseconds().abs() < 1);

    let reclaimed = claim_prompts(&pool, &[id], Utc::now() + Duration::minutes(15))
        .await
        .expect("reclaim");
    assert_eq!(reclaimed, vec![id], "lease cleared after execution");
}

// ---------------------------------------------------------------------------
// Batches
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn batch_lifecycle_running_to_completed(pool: sqlx::PgPool) {
    let batch = create_execution_batch(&pool, &new_batch())
        .await
        .expect("create batch");
    assert_eq!(batch.status, "running");
    assert!(batch.finished_at.is_none());

    complete_execution_batch(&pool, batch.id, &totals(2, 1, 12_345))
        .await
        .expect("complete");

    let row = get_execution_batch(&pool, batch.id).await.expect("get");
    assert_eq!(row.status, "completed");
    assert_eq!(row.prompts_total, 3);
    assert_eq!(row.prompts_completed + row.prompts_failed, row.prompts_total);
    assert_eq!(row.estimated_cost_usd, estimate_cost_usd(12_345));
    assert!(row.finished_at.is_some());

    let by_public = get_execution_batch_by_public_id(&pool, batch.public_id)
        .await
        .expect("by public id");
    assert_eq!(by_public.id, batch.id);
}

#[sqlx::test(migrations = "../../migrations")]
async fn terminal_batch_cannot_transition_again(pool: sqlx::PgPool) {
    let batch = create_execution_batch(&pool, &new_batch())
        .await
        .expect("create batch");
    fail_execution_batch(&pool, batch.id, &totals(0, 2, 0), "all prompts failed")
        .await
        .expect("fail");

    let err = complete_execution_batch(&pool, batch.id, &totals(2, 0, 0))
        .await
        .expect_err("second transition");
    assert!(matches!(err, DbError::InvalidBatchTransition { .. }));

    let row = get_execution_batch(&pool, batch.id).await.expect("get");
    assert_eq!(row.status, "failed");
    assert_eq!(row.error_summary.as_deref(), Some("all prompts failed"));
}

#[sqlx::test(migrations = "../../migrations")]
async fn unbalanced_totals_are_rejected_by_schema(pool: sqlx::PgPool) {
    let batch = create_execution_batch(&pool, &new_batch())
        .await
        .expect("create batch");
    let bad = BatchTotals {
        prompts_total: 5,
        ..totals(1, 1, 0)
    };
    let err = complete_execution_batch(&pool, batch.id, &bad)
        .await
        .expect_err("check constraint");
    assert!(matches!(err, DbError::Sqlx(_)));
}

#[sqlx::test(migrations = "../../migrations")]
async fn missing_batch_is_not_found(pool: sqlx::PgPool) {
    let err = get_execution_batch_by_public_id(&pool, Uuid::new_v4())
        .await
        .expect_err("not found");
    assert!(matches!(err, DbError::NotFound));
}

#[sqlx::test(migrations = "../../migrations")]
async fn list_batches_returns_newest_first(pool: sqlx::PgPool) {
    let first = create_execution_batch(&pool, &new_batch()).await.expect("first");
    let second = create_execution_batch(&pool, &new_batch()).await.expect("second");

    let rows = list_execution_batches(&pool, 10).await.expect("list");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].id, second.id);
    assert_eq!(rows[1].id, first.id);

    let limited = list_execution_batches(&pool, 1).await.expect("limited");
    assert_eq!(limited.len(), 1);
}

// ---------------------------------------------------------------------------
// Results, scans, recompute
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn persist_prompt_results_writes_all_tables(pool: sqlx::PgPool) {
    seed_three(&pool).await;
    let prompt_id = list_active_prompts(&pool, Some("crm"), None)
        .await
        .expect("list")[0]
        .id;
    let batch = create_execution_batch(&pool, &new_batch()).await.expect("batch");

    let results = PromptResults {
        conversations: vec![NewConversationResult {
            model: "chatgpt".to_string(),
            response_text: Some("1. **HubSpot** - free tier".to_string()),
            response_hash: Some("abc".to_string()),
            tokens_used: 120,
            error: None,
        }],
        shopping: vec![NewShoppingResult {
            model: "chatgpt".to_string(),
            category: "crm".to_string(),
            brand_name: "HubSpot".to_string(),
            rank: Some(1),
            weight: 1.0,
            is_tracked_brand: false,
        }],
        brand: Vec::new(),
    };

    let written = persist_prompt_results(&pool, batch.id, prompt_id, &results)
        .await
        .expect("persist");
    assert_eq!(written, 2);

    let shopping_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM results_shopping WHERE batch_id = $1")
            .bind(batch.id)
            .fetch_one(&pool)
            .await
            .expect("count");
    assert_eq!(shopping_count, 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn latest_done_scan_ignores_in_progress_scans(pool: sqlx::PgPool) {
    let done_id = Uuid::new_v4();
    let running_id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO scans (id, dashboard_id, status, created_at) VALUES \
         ($1, 'dash-1', 'done', NOW() - INTERVAL '1 hour'), \
         ($2, 'dash-1', 'running', NOW())",
    )
    .bind(done_id)
    .bind(running_id)
    .execute(&pool)
    .await
    .expect("insert scans");

    sqlx::query(
        "INSERT INTO results_shopping (scan_id, model, category, brand_name, rank, weight, is_tracked_brand) \
         VALUES ($1, 'claude', 'crm', 'Acme', 2, 0.5, true)",
    )
    .bind(done_id)
    .execute(&pool)
    .await
    .expect("insert shopping row");

    let scan = get_latest_done_scan(&pool, "dash-1")
        .await
        .expect("query")
        .expect("done scan");
    assert_eq!(scan.id, done_id);

    let rows = list_shopping_results_for_scan(&pool, scan.id)
        .await
        .expect("rows");
    assert_eq!(rows.len(), 1);
    assert!(rows[0].is_tracked_brand);

    assert!(get_latest_done_scan(&pool, "dash-2")
        .await
        .expect("query")
        .is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn recompute_procedures_exist_and_run(pool: sqlx::PgPool) {
    for procedure in harbor_db::RECOMPUTE_PROCEDURES {
        call_recompute_procedure(&pool, procedure)
            .await
            .unwrap_or_else(|e| panic!("{procedure} failed: {e}"));
    }

    let err = call_recompute_procedure(&pool, "drop_everything")
        .await
        .expect_err("not allowed");
    assert!(matches!(err, DbError::UnknownProcedure(_)));
}

#[sqlx::test(migrations = "../../migrations")]
async fn tracked_brand_names_only_lists_active(pool: sqlx::PgPool) {
    sqlx::query(
        "INSERT INTO tracked_brands (name, is_active) VALUES ('Acme', true), ('Retired', false)",
    )
    .execute(&pool)
    .await
    .expect("insert brands");

    let names = list_tracked_brand_names(&pool).await.expect("names");
    assert_eq!(names, vec!["Acme".to_string()]);
}
