mod api;
mod middleware;
mod scheduler;

use std::sync::Arc;

use harbor_dispatch::{DispatchSettings, Dispatcher, PgStore};
use harbor_llm::LlmExecutor;
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, default_rate_limit_state, AppState},
    middleware::CronAuth,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(harbor_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = harbor_db::PoolConfig::from_app_config(&config);
    let pool = harbor_db::connect_pool(&config.database_url, pool_config).await?;
    harbor_db::run_migrations(&pool).await?;

    let executor = LlmExecutor::from_config(&config)?;
    executor.warn_if_unconfigured();
    let dispatcher = Arc::new(Dispatcher::new(
        PgStore::new(pool.clone()),
        executor,
        DispatchSettings::from_app_config(&config),
    ));

    let _scheduler = match config.batch_cron.as_deref() {
        Some(cron) => Some(scheduler::build_scheduler(Arc::clone(&dispatcher), cron).await?),
        None => None,
    };

    let state = AppState {
        pool,
        dispatcher,
        cron_auth: CronAuth::new(config.cron_secret.as_deref()),
    };
    let app = build_app(state, default_rate_limit_state());

    tracing::info!(bind_addr = %config.bind_addr, env = ?config.env, "harbor-server listening");
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
