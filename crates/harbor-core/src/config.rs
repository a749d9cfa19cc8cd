use crate::app_config::{AppConfig, Environment, ProviderConfig};
use crate::{ConfigError, ModelProvider};

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    // Empty strings count as unset so `CRON_SECRET=` in a .env keeps auth open.
    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let database_url = require("DATABASE_URL")?;

    let env_raw = lookup("HARBOR_ENV")
        .or_else(|_| lookup("NODE_ENV"))
        .unwrap_or_else(|_| "development".to_string());
    let env = parse_environment(&env_raw);

    let bind_addr = parse_addr("HARBOR_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("HARBOR_LOG_LEVEL", "info");
    let prompts_path = PathBuf::from(or_default("HARBOR_PROMPTS_PATH", "./config/prompts.yaml"));
    let cron_secret = optional("CRON_SECRET");

    let db_max_connections = parse_u32("HARBOR_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("HARBOR_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("HARBOR_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let providers = ModelProvider::ALL
        .into_iter()
        .filter_map(|provider| {
            optional(provider.api_key_var()).map(|api_key| ProviderConfig {
                provider,
                api_key,
                model: or_default(provider.model_var(), provider.default_model()),
            })
        })
        .collect();

    let llm_request_timeout_secs = parse_u64("HARBOR_LLM_TIMEOUT_SECS", "60")?;
    let llm_max_retries = parse_u32("HARBOR_LLM_MAX_RETRIES", "0")?;
    let llm_retry_backoff_ms = parse_u64("HARBOR_LLM_RETRY_BACKOFF_MS", "1000")?;
    let inter_prompt_delay_ms = parse_u64("HARBOR_INTER_PROMPT_DELAY_MS", "500")?;
    let claim_lease_secs = parse_u64("HARBOR_CLAIM_LEASE_SECS", "900")?;
    if claim_lease_secs == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "HARBOR_CLAIM_LEASE_SECS".to_string(),
            reason: "lease must be at least one second".to_string(),
        });
    }
    let batch_cron = optional("HARBOR_BATCH_CRON");

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        prompts_path,
        cron_secret,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        providers,
        llm_request_timeout_secs,
        llm_max_retries,
        llm_retry_backoff_ms,
        inter_prompt_delay_ms,
        claim_lease_secs,
        batch_cron,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
