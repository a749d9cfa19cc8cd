//! In-process cron trigger for execution batches.

use std::sync::Arc;

use harbor_core::{BatchRequest, TriggerSource};
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::api::HarborDispatcher;

/// Batch type recorded for scheduler-triggered runs.
const SCHEDULED_BATCH_TYPE: &str = "scheduled";

/// Builds and starts the scheduler with the batch job on `cron`.
///
/// The returned [`JobScheduler`] must be kept alive for the lifetime of the
/// process; dropping it stops the job.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised, the
/// cron expression is invalid, or the scheduler fails to start.
pub async fn build_scheduler(
    dispatcher: Arc<HarborDispatcher>,
    cron: &str,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    register_batch_job(&scheduler, dispatcher, cron).await?;

    scheduler.start().await?;
    tracing::info!(cron, "scheduler: batch job registered");
    Ok(scheduler)
}

async fn register_batch_job(
    scheduler: &JobScheduler,
    dispatcher: Arc<HarborDispatcher>,
    cron: &str,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(cron, move |_uuid, _lock| {
        let dispatcher = Arc::clone(&dispatcher);

        Box::pin(async move {
            tracing::info!("scheduler: starting execution batch");
            let request = BatchRequest::new(
                None,
                Some(SCHEDULED_BATCH_TYPE.to_string()),
                None,
                None,
                false,
                TriggerSource::Scheduler,
            );
            match dispatcher.run_batch(&request).await {
                Ok(summary) => tracing::info!(
                    batch_id = %summary.batch_id,
                    status = %summary.status,
                    completed = summary.prompts_completed,
                    failed = summary.prompts_failed,
                    "scheduler: execution batch finished"
                ),
                Err(e) => tracing::error!(error = %e, "scheduler: execution batch failed"),
            }
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}
