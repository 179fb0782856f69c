use openlabs_core::models::{JobName, JobRecord, JobStatus};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::StoreError;

fn job_name_str(name: JobName) -> &'static str {
    name.as_str()
}

fn parse_job_name(s: &str) -> Result<JobName, StoreError> {
    match s {
        "deploy_range" => Ok(JobName::DeployRange),
        "destroy_range" => Ok(JobName::DestroyRange),
        other => Err(StoreError::Validation(
            openlabs_core::error::CoreError::Validation(format!("unknown job name: {other}")),
        )),
    }
}

fn job_status_str(status: JobStatus) -> &'static str {
    match status {
        JobStatus::Queued => "queued",
        JobStatus::InProgress => "in_progress",
        JobStatus::Complete => "complete",
        JobStatus::Failed => "failed",
    }
}

fn parse_job_status(s: &str) -> Result<JobStatus, StoreError> {
    match s {
        "queued" => Ok(JobStatus::Queued),
        "in_progress" => Ok(JobStatus::InProgress),
        "complete" => Ok(JobStatus::Complete),
        "failed" => Ok(JobStatus::Failed),
        other => Err(StoreError::Validation(
            openlabs_core::error::CoreError::Validation(format!("unknown job status: {other}")),
        )),
    }
}

/// Inserts the bookkeeping row for a just-enqueued job. Callers are
/// expected to treat a failure here as non-fatal to the HTTP response —
/// they still have the queue-assigned id to return.
pub async fn insert_job(
    pool: &PgPool,
    queue_job_id: &str,
    name: JobName,
    owner_id: Uuid,
) -> Result<JobRecord, StoreError> {
    let submitted_at = jiff::Timestamp::now();
    sqlx::query(
        "INSERT INTO jobs (queue_job_id, name, owner_id, submitted_at, status, detail)
         VALUES ($1, $2, $3, $4, $5, NULL)",
    )
    .bind(queue_job_id)
    .bind(job_name_str(name))
    .bind(owner_id)
    .bind(submitted_at.to_string())
    .bind(job_status_str(JobStatus::Queued))
    .execute(pool)
    .await?;

    Ok(JobRecord {
        queue_job_id: queue_job_id.to_string(),
        name,
        owner_id,
        submitted_at,
        status: JobStatus::Queued,
        detail: None,
    })
}

pub async fn get_job(pool: &PgPool, queue_job_id: &str) -> Result<Option<JobRecord>, StoreError> {
    #[derive(sqlx::FromRow)]
    struct Row {
        queue_job_id: String,
        name: String,
        owner_id: Uuid,
        submitted_at: String,
        status: String,
        detail: Option<String>,
    }

    let Some(row) = sqlx::query_as::<_, Row>("SELECT * FROM jobs WHERE queue_job_id = $1")
        .bind(queue_job_id)
        .fetch_optional(pool)
        .await?
    else {
        return Ok(None);
    };

    Ok(Some(JobRecord {
        queue_job_id: row.queue_job_id,
        name: parse_job_name(&row.name)?,
        owner_id: row.owner_id,
        submitted_at: row.submitted_at.parse().map_err(|e: jiff::Error| {
            StoreError::Validation(openlabs_core::error::CoreError::Validation(e.to_string()))
        })?,
        status: parse_job_status(&row.status)?,
        detail: row.detail,
    }))
}

/// Job status progresses monotonically — callers are expected to only
/// move forward through `{queued, in_progress, complete, failed}`; this
/// function does not itself enforce ordering, relying on each job
/// having exactly one worker driving it at a time.
pub async fn update_job_status(
    pool: &PgPool,
    queue_job_id: &str,
    status: JobStatus,
    detail: Option<&str>,
) -> Result<(), StoreError> {
    sqlx::query("UPDATE jobs SET status = $1, detail = $2 WHERE queue_job_id = $3")
        .bind(job_status_str(status))
        .bind(detail)
        .bind(queue_job_id)
        .execute(pool)
        .await?;
    Ok(())
}
