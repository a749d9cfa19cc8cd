//! SQL-side aggregate refreshes run after a batch.

use sqlx::PgPool;

use crate::DbError;

/// Procedures that may be invoked through [`call_recompute_procedure`].
pub const RECOMPUTE_PROCEDURES: &[&str] = &[
    "refresh_citation_stats",
    "refresh_brand_visibility",
    "refresh_university_visibility",
];

/// Runs `SELECT <procedure>()`.
///
/// The name is interpolated into SQL, so it must be one of
/// [`RECOMPUTE_PROCEDURES`].
///
/// # Errors
///
/// Returns [`DbError::UnknownProcedure`] for names outside the allow-list, or
/// [`DbError::Sqlx`] if the function is missing or raises.
pub async fn call_recompute_procedure(pool: &PgPool, procedure: &str) -> Result<(), DbError> {
    if !RECOMPUTE_PROCEDURES.contains(&procedure) {
        return Err(DbError::UnknownProcedure(procedure.to_string()));
    }

    sqlx::query(&format!("SELECT {procedure}()"))
        .execute(pool)
        .await?;

    Ok(())
}
