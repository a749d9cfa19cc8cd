//! Database maintenance commands.

use std::path::Path;

/// Apply pending migrations.
///
/// # Errors
///
/// Returns an error if any migration fails.
pub(crate) async fn run_migrate(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let applied = harbor_db::run_migrations(pool).await?;
    println!("applied {applied} migration(s)");
    Ok(())
}

/// Load the seed file and upsert its prompts.
///
/// # Errors
///
/// Returns an error if the file cannot be read or validated, or the upsert
/// fails.
pub(crate) async fn run_seed(pool: &sqlx::PgPool, path: &Path) -> anyhow::Result<()> {
    let file = harbor_core::load_prompt_seeds(path)?;
    let written = harbor_db::seed_prompts(pool, &file.prompts).await?;
    println!(
        "seeded {written} prompt(s) from {} ({} in file)",
        path.display(),
        file.prompts.len()
    );
    Ok(())
}
