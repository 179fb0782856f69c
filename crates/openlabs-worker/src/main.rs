use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

mod error;
mod jobs;
mod state;

use openlabs_core::config::Settings;
use openlabs_provisioner::driver::TerraformDriver;
use openlabs_queue::{JobQueue, QueuedJob, RedisJobQueue};
use state::WorkerState;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let settings = Settings::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&settings.postgres_url)
        .await?;

    let queue = RedisJobQueue::connect(&settings.redis_url).await?;

    let state = WorkerState {
        pool,
        queue: Arc::new(queue),
        driver: Arc::new(TerraformDriver::new()),
        settings: Arc::new(settings),
    };

    let concurrency = state.settings.worker_concurrency.max(1);
    tracing::info!(concurrency, "openlabs-worker starting poll loop");

    let mut handles = Vec::with_capacity(concurrency);
    for worker_id in 0..concurrency {
        let state = state.clone();
        handles.push(tokio::spawn(async move {
            poll_loop(worker_id, state).await;
        }));
    }

    for handle in handles {
        let _ = handle.await;
    }

    Ok(())
}

async fn poll_loop(worker_id: usize, state: WorkerState) {
    loop {
        let job = match state.queue.dequeue().await {
            Ok(Some(job)) => job,
            Ok(None) => continue,
            Err(e) => {
                tracing::error!(worker_id, error = %e, "dequeue failed, retrying");
                continue;
            }
        };

        let queue_job_id = job.queue_job_id().to_string();
        if let Err(e) = state.queue.mark_in_progress(&queue_job_id).await {
            tracing::error!(worker_id, %queue_job_id, error = %e, "failed to mark job in progress");
        }

        let result = match job {
            QueuedJob::DeployRange { queue_job_id, args } => jobs::deploy_range(&state, &queue_job_id, args).await,
            QueuedJob::DestroyRange { queue_job_id, args } => jobs::destroy_range(&state, &queue_job_id, args).await,
        };

        if let Err(e) = result {
            tracing::warn!(worker_id, %queue_job_id, error = %e, "job finished with an error, already recorded");
        }
    }
}
