//! Offline unit tests for harbor-db pool configuration and row conversion.
//! These tests do not require a live database connection.

use harbor_core::{AppConfig, Environment, PriorityTier, Prompt};
use harbor_db::{DbError, PoolConfig, PromptRow, RECOMPUTE_PROCEDURES};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

fn app_config() -> AppConfig {
    AppConfig {
        database_url: "postgres://example".to_string(),
        env: Environment::Test,
        bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000),
        log_level: "info".to_string(),
        prompts_path: PathBuf::from("./config/prompts.yaml"),
        cron_secret: None,
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        providers: Vec::new(),
        llm_request_timeout_secs: 60,
        llm_max_retries: 0,
        llm_retry_backoff_ms: 1_000,
        inter_prompt_delay_ms: 500,
        claim_lease_secs: 900,
        batch_cron: None,
    }
}

fn prompt_row(priority: &str) -> PromptRow {
    PromptRow {
        id: 11,
        prompt_text: "best crm for startups".to_string(),
        topic: "crm".to_string(),
        priority: priority.to_string(),
        frequency_days: 3,
        is_active: true,
        last_executed_at: None,
        claimed_until: None,
    }
}

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let pool_config = PoolConfig::from_app_config(&app_config());
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

#[test]
fn prompt_row_converts_to_domain_prompt() {
    let prompt = Prompt::try_from(prompt_row("long-tail")).expect("valid row");
    assert_eq!(prompt.id, 11);
    assert_eq!(prompt.text, "best crm for startups");
    assert_eq!(prompt.priority, PriorityTier::LongTail);
    assert_eq!(prompt.frequency_days, 3);
}

#[test]
fn prompt_row_with_unknown_priority_is_rejected() {
    let err = Prompt::try_from(prompt_row("urgent")).expect_err("invalid priority");
    assert!(matches!(err, DbError::InvalidRow { table: "seed_prompts", .. }));
}

#[test]
fn recompute_allow_list_names_all_three_hooks() {
    assert_eq!(RECOMPUTE_PROCEDURES.len(), 3);
    assert!(RECOMPUTE_PROCEDURES.contains(&"refresh_university_visibility"));
}
