mod batch;
mod db;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "harbor-cli")]
#[command(about = "Harbor prompt pipeline command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Load seed prompts from the YAML seed file
    Seed {
        /// Seed file to load (defaults to `HARBOR_PROMPTS_PATH`)
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Run one execution batch in the foreground
    RunBatch {
        /// Maximum number of prompts to execute
        #[arg(long)]
        batch_size: Option<u32>,
        /// Label recorded on the batch row
        #[arg(long)]
        batch_type: Option<String>,
        /// Only run prompts in this topic
        #[arg(long)]
        topic: Option<String>,
        /// Only run prompts with this priority (core, standard, long-tail)
        #[arg(long)]
        priority: Option<harbor_core::PriorityTier>,
        /// Ignore freshness and run prompts even if recently executed
        #[arg(long)]
        force: bool,
    },
    /// Report prompts that are due for execution
    Stale {
        /// Restrict the report to a topic
        #[arg(long)]
        topic: Option<String>,
    },
    /// List recent execution batches
    Batches {
        /// Maximum number of batches to show
        #[arg(long, default_value = "10")]
        limit: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = harbor_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = harbor_db::PoolConfig::from_app_config(&config);
    let pool = harbor_db::connect_pool(&config.database_url, pool_config).await?;

    match cli.command {
        Commands::Migrate => db::run_migrate(&pool).await?,
        Commands::Seed { path } => {
            let path = path.unwrap_or_else(|| config.prompts_path.clone());
            db::run_seed(&pool, &path).await?;
        }
        Commands::RunBatch {
            batch_size,
            batch_type,
            topic,
            priority,
            force,
        } => {
            let request = harbor_core::BatchRequest::new(
                batch_size,
                batch_type,
                topic,
                priority,
                force,
                harbor_core::TriggerSource::Cli,
            );
            batch::run_batch(pool, &config, &request).await?;
        }
        Commands::Stale { topic } => batch::run_stale(pool, topic.as_deref()).await?,
        Commands::Batches { limit } => batch::run_list_batches(&pool, limit).await?,
    }

    Ok(())
}
