//! Batch execution and inspection commands.

use chrono::Utc;
use harbor_core::{AppConfig, BatchRequest};
use harbor_dispatch::{stale_report, DispatchSettings, Dispatcher, PgStore};
use harbor_llm::LlmExecutor;

const PROMPT_PREVIEW_CHARS: usize = 60;

/// Run one batch against the configured providers and print its summary.
///
/// # Errors
///
/// Returns an error if the providers cannot be configured or the batch
/// cannot be set up or finished.
pub(crate) async fn run_batch(
    pool: sqlx::PgPool,
    config: &AppConfig,
    request: &BatchRequest,
) -> anyhow::Result<()> {
    let executor = LlmExecutor::from_config(config)?;
    executor.warn_if_unconfigured();

    let dispatcher = Dispatcher::new(
        PgStore::new(pool),
        executor,
        DispatchSettings::from_app_config(config),
    );
    tracing::info!(
        batch_size = request.batch_size,
        topic = request.topic.as_deref().unwrap_or("*"),
        force = request.force,
        "starting execution batch from cli"
    );
    let summary = dispatcher.run_batch(request).await?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

/// Print the staleness report for due prompts.
///
/// # Errors
///
/// Returns an error if prompts cannot be loaded.
pub(crate) async fn run_stale(pool: sqlx::PgPool, topic: Option<&str>) -> anyhow::Result<()> {
    let store = PgStore::new(pool);
    let report = stale_report(&store, topic, Utc::now()).await?;

    if report.total_stale == 0 {
        println!("no prompts are due");
        return Ok(());
    }

    println!("{} prompt(s) due", report.total_stale);
    println!();
    println!("{:<24}COUNT", "TOPIC");
    for (topic, count) in &report.by_topic {
        println!("{topic:<24}{count}");
    }
    println!();
    println!("{:<24}COUNT", "PRIORITY");
    for (priority, count) in &report.by_priority {
        println!("{priority:<24}{count}");
    }
    println!();
    println!("{:<8}{:<12}{:<22}PROMPT", "ID", "PRIORITY", "LAST EXECUTED");
    for sample in &report.sample {
        let last = sample.last_executed_at.map_or_else(
            || "never".to_string(),
            |t| t.format("%Y-%m-%d %H:%M").to_string(),
        );
        println!(
            "{:<8}{:<12}{:<22}{}",
            sample.id,
            sample.priority.as_str(),
            last,
            preview(&sample.prompt_text)
        );
    }

    Ok(())
}

/// List the most recent execution batches.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub(crate) async fn run_list_batches(pool: &sqlx::PgPool, limit: i64) -> anyhow::Result<()> {
    let batches = harbor_db::list_execution_batches(pool, limit.clamp(1, 100)).await?;

    if batches.is_empty() {
        println!("no execution batches found; run `run-batch` first");
        return Ok(());
    }

    println!(
        "{:<38}{:<11}{:<11}{:<8}{:<8}{:<10}STARTED",
        "BATCH", "STATUS", "TRIGGER", "DONE", "FAILED", "TOKENS"
    );
    for batch in &batches {
        println!(
            "{:<38}{:<11}{:<11}{:<8}{:<8}{:<10}{}",
            batch.public_id,
            batch.status,
            batch.trigger_source,
            batch.prompts_completed,
            batch.prompts_failed,
            batch.total_tokens_used,
            batch.started_at.format("%Y-%m-%d %H:%M")
        );
    }

    Ok(())
}

pub(crate) fn preview(text: &str) -> String {
    if text.chars().count() > PROMPT_PREVIEW_CHARS {
        format!(
            "{}...",
            text.chars().take(PROMPT_PREVIEW_CHARS).collect::<String>()
        )
    } else {
        text.to_string()
    }
}
