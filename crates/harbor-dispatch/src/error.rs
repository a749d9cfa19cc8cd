use harbor_db::DbError;
use thiserror::Error;

/// Failures that abort a whole batch run.
///
/// Per-prompt failures never surface here; they are counted in the batch
/// summary instead.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("could not create execution batch: {0}")]
    CreateBatch(#[source] DbError),

    #[error("could not load candidate prompts: {0}")]
    LoadPrompts(#[source] DbError),

    #[error("could not claim prompts: {0}")]
    ClaimPrompts(#[source] DbError),

    #[error("could not load tracked brands: {0}")]
    TrackedBrands(#[source] DbError),

    #[error("could not update prompt freshness: {0}")]
    MarkExecuted(#[source] DbError),

    #[error("could not finish execution batch {batch_id}: {source}")]
    FinishBatch {
        batch_id: i64,
        #[source]
        source: DbError,
    },
}
