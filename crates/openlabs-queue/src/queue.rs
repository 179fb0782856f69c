use async_trait::async_trait;

use crate::error::QueueError;
use crate::jobs::{DeployJobArgs, DestroyJobArgs, QueueJobStatus, QueuedJob};

/// A durable job queue: the join point between the admission path
/// (`openlabs-api`) and the worker pool (`openlabs-worker`). The queue
/// itself guarantees at-most-one in-flight executor per `queue_job_id`;
/// this trait does not add its own locking.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Enqueues a deploy job, returning the queue-assigned id.
    async fn enqueue_deploy(&self, args: DeployJobArgs) -> Result<String, QueueError>;

    /// Enqueues a destroy job, returning the queue-assigned id.
    async fn enqueue_destroy(&self, args: DestroyJobArgs) -> Result<String, QueueError>;

    /// Queue-side status lookup for `GET /jobs/{id}`. `None` means the
    /// queue has never heard of this id (distinct from an id that
    /// existed and expired, which the API falls back to the `jobs`
    /// table row to resolve).
    async fn status(&self, queue_job_id: &str) -> Result<Option<QueueJobStatus>, QueueError>;

    /// Worker-side: blocks (up to the queue's own timeout) for the next
    /// job. `None` on a poll timeout with nothing available.
    async fn dequeue(&self) -> Result<Option<QueuedJob>, QueueError>;

    async fn mark_in_progress(&self, queue_job_id: &str) -> Result<(), QueueError>;
    async fn mark_complete(&self, queue_job_id: &str, result: serde_json::Value) -> Result<(), QueueError>;
    async fn mark_failed(&self, queue_job_id: &str, error: String) -> Result<(), QueueError>;
}
