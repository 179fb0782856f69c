//! Redis-backed `JobQueue`, implemented as a plain `LPUSH`/`BRPOPLPUSH`
//! list queue: a dequeue moves the payload onto a processing list
//! (visible for operator inspection if a worker dies mid-job) and
//! immediately removes it there, since re-delivery on crash is not
//! this queue's job — only the worker's retries need to *converge* (on
//! the deterministic `deployed_range_id`), not the queue itself
//! guaranteeing redelivery. A per-job status key with a TTL tracks
//! queue-side job-info bookkeeping.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use uuid::Uuid;

use crate::error::QueueError;
use crate::jobs::{DeployJobArgs, DestroyJobArgs, QueueJobState, QueueJobStatus, QueuedJob};
use crate::queue::JobQueue;

const WORK_LIST_KEY: &str = "openlabs:jobs:pending";
const PROCESSING_LIST_KEY: &str = "openlabs:jobs:processing";
const STATUS_KEY_PREFIX: &str = "openlabs:jobs:status:";
const STATUS_TTL_SECONDS: i64 = 60 * 60 * 24;
const DEQUEUE_TIMEOUT_SECONDS: f64 = 5.0;

pub struct RedisJobQueue {
    conn: ConnectionManager,
}

impl RedisJobQueue {
    pub async fn connect(redis_url: &str) -> Result<Self, QueueError> {
        let client = redis::Client::open(redis_url)?;
        let conn = client.get_connection_manager().await?;
        Ok(Self { conn })
    }

    fn status_key(queue_job_id: &str) -> String {
        format!("{STATUS_KEY_PREFIX}{queue_job_id}")
    }

    async fn write_initial_status(&self, queue_job_id: &str) -> Result<(), QueueError> {
        let status = QueueJobStatus {
            queue_job_id: queue_job_id.to_string(),
            status: QueueJobState::Queued,
            enqueue_time: jiff::Timestamp::now(),
            result: None,
            error: None,
        };
        let mut conn = self.conn.clone();
        let payload = serde_json::to_string(&status)?;
        let _: () = conn
            .set_ex(Self::status_key(queue_job_id), payload, STATUS_TTL_SECONDS as u64)
            .await?;
        Ok(())
    }

    async fn update_status(
        &self,
        queue_job_id: &str,
        f: impl FnOnce(&mut QueueJobStatus),
    ) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        let key = Self::status_key(queue_job_id);
        let existing: Option<String> = conn.get(&key).await?;
        let mut status = match existing {
            Some(raw) => serde_json::from_str(&raw)?,
            None => QueueJobStatus {
                queue_job_id: queue_job_id.to_string(),
                status: QueueJobState::Queued,
                enqueue_time: jiff::Timestamp::now(),
                result: None,
                error: None,
            },
        };
        f(&mut status);
        let payload = serde_json::to_string(&status)?;
        let _: () = conn.set_ex(key, payload, STATUS_TTL_SECONDS as u64).await?;
        Ok(())
    }
}

#[async_trait]
impl JobQueue for RedisJobQueue {
    async fn enqueue_deploy(&self, args: DeployJobArgs) -> Result<String, QueueError> {
        let queue_job_id = Uuid::new_v4().to_string();
        let job = QueuedJob::DeployRange {
            queue_job_id: queue_job_id.clone(),
            args,
        };
        let mut conn = self.conn.clone();
        let payload = serde_json::to_string(&job)?;
        let _: () = conn.lpush(WORK_LIST_KEY, payload).await?;
        self.write_initial_status(&queue_job_id).await?;
        Ok(queue_job_id)
    }

    async fn enqueue_destroy(&self, args: DestroyJobArgs) -> Result<String, QueueError> {
        let queue_job_id = Uuid::new_v4().to_string();
        let job = QueuedJob::DestroyRange {
            queue_job_id: queue_job_id.clone(),
            args,
        };
        let mut conn = self.conn.clone();
        let payload = serde_json::to_string(&job)?;
        let _: () = conn.lpush(WORK_LIST_KEY, payload).await?;
        self.write_initial_status(&queue_job_id).await?;
        Ok(queue_job_id)
    }

    async fn status(&self, queue_job_id: &str) -> Result<Option<QueueJobStatus>, QueueError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(Self::status_key(queue_job_id)).await?;
        raw.map(|r| serde_json::from_str(&r).map_err(QueueError::from))
            .transpose()
    }

    async fn dequeue(&self) -> Result<Option<QueuedJob>, QueueError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn
            .brpoplpush(WORK_LIST_KEY, PROCESSING_LIST_KEY, DEQUEUE_TIMEOUT_SECONDS)
            .await?;
        let Some(raw) = raw else { return Ok(None) };
        let job: QueuedJob = serde_json::from_str(&raw)?;

        let _: () = conn.lrem(PROCESSING_LIST_KEY, 1, &raw).await?;
        self.update_status(job.queue_job_id(), |s| s.status = QueueJobState::InProgress)
            .await?;
        Ok(Some(job))
    }

    async fn mark_in_progress(&self, queue_job_id: &str) -> Result<(), QueueError> {
        self.update_status(queue_job_id, |s| s.status = QueueJobState::InProgress)
            .await
    }

    async fn mark_complete(&self, queue_job_id: &str, result: serde_json::Value) -> Result<(), QueueError> {
        self.update_status(queue_job_id, |s| {
            s.status = QueueJobState::Complete;
            s.result = Some(result);
        })
        .await
    }

    async fn mark_failed(&self, queue_job_id: &str, error: String) -> Result<(), QueueError> {
        self.update_status(queue_job_id, |s| {
            s.status = QueueJobState::Failed;
            s.error = Some(error);
        })
        .await
    }
}
