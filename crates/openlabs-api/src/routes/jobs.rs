use axum::extract::{Path, State};
use axum::Json;

use openlabs_queue::QueueJobStatus;

use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// Queue-side status takes precedence over the `jobs` table row.
/// Falls back to the row only once the queue has expired its own
/// record of the job.
pub async fn get_job(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    Path(job_id): Path<String>,
) -> Result<Json<QueueJobStatus>, ApiError> {
    if let Some(status) = state.queue.status(&job_id).await? {
        return Ok(Json(status));
    }

    let record = openlabs_store::jobs::get_job(&state.pool, &job_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("no job found for id {job_id}")))?;

    Ok(Json(QueueJobStatus {
        queue_job_id: record.queue_job_id,
        status: match record.status {
            openlabs_core::models::JobStatus::Queued => openlabs_queue::QueueJobState::Queued,
            openlabs_core::models::JobStatus::InProgress => openlabs_queue::QueueJobState::InProgress,
            openlabs_core::models::JobStatus::Complete => openlabs_queue::QueueJobState::Complete,
            openlabs_core::models::JobStatus::Failed => openlabs_queue::QueueJobState::Failed,
        },
        enqueue_time: record.submitted_at,
        result: None,
        error: record.detail,
    }))
}
