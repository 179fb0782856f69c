//! In-memory `JobQueue` test double, swapping the real Redis-backed
//! queue for a fake one so route and worker tests don't need a live
//! Redis instance.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::QueueError;
use crate::jobs::{DeployJobArgs, DestroyJobArgs, QueueJobState, QueueJobStatus, QueuedJob};
use crate::queue::JobQueue;

#[derive(Default)]
pub struct MemoryJobQueue {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    pending: VecDeque<QueuedJob>,
    status: HashMap<String, QueueJobStatus>,
}

impl MemoryJobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert_status(&self, queue_job_id: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.status.insert(
            queue_job_id.to_string(),
            QueueJobStatus {
                queue_job_id: queue_job_id.to_string(),
                status: QueueJobState::Queued,
                enqueue_time: jiff::Timestamp::now(),
                result: None,
                error: None,
            },
        );
    }
}

#[async_trait]
impl JobQueue for MemoryJobQueue {
    async fn enqueue_deploy(&self, args: DeployJobArgs) -> Result<String, QueueError> {
        let queue_job_id = Uuid::new_v4().to_string();
        self.insert_status(&queue_job_id);
        let mut inner = self.inner.lock().unwrap();
        inner.pending.push_back(QueuedJob::DeployRange {
            queue_job_id: queue_job_id.clone(),
            args,
        });
        Ok(queue_job_id)
    }

    async fn enqueue_destroy(&self, args: DestroyJobArgs) -> Result<String, QueueError> {
        let queue_job_id = Uuid::new_v4().to_string();
        self.insert_status(&queue_job_id);
        let mut inner = self.inner.lock().unwrap();
        inner.pending.push_back(QueuedJob::DestroyRange {
            queue_job_id: queue_job_id.clone(),
            args,
        });
        Ok(queue_job_id)
    }

    async fn status(&self, queue_job_id: &str) -> Result<Option<QueueJobStatus>, QueueError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.status.get(queue_job_id).cloned())
    }

    async fn dequeue(&self) -> Result<Option<QueuedJob>, QueueError> {
        let mut inner = self.inner.lock().unwrap();
        let job = inner.pending.pop_front();
        if let Some(job) = &job {
            let id = job.queue_job_id().to_string();
            if let Some(status) = inner.status.get_mut(&id) {
                status.status = QueueJobState::InProgress;
            }
        }
        Ok(job)
    }

    async fn mark_in_progress(&self, queue_job_id: &str) -> Result<(), QueueError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(status) = inner.status.get_mut(queue_job_id) {
            status.status = QueueJobState::InProgress;
        }
        Ok(())
    }

    async fn mark_complete(&self, queue_job_id: &str, result: serde_json::Value) -> Result<(), QueueError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(status) = inner.status.get_mut(queue_job_id) {
            status.status = QueueJobState::Complete;
            status.result = Some(result);
        }
        Ok(())
    }

    async fn mark_failed(&self, queue_job_id: &str, error: String) -> Result<(), QueueError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(status) = inner.status.get_mut(queue_job_id) {
            status.status = QueueJobState::Failed;
            status.error = Some(error);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn sample_destroy_args() -> DestroyJobArgs {
        DestroyJobArgs {
            enc_key: "key".to_string(),
            deployed_range_id: Uuid::nil(),
            user_id: Uuid::nil(),
            is_admin: false,
        }
    }

    #[tokio::test]
    async fn enqueue_then_dequeue_returns_the_same_job() {
        let queue = MemoryJobQueue::new();
        let id = queue.enqueue_destroy(sample_destroy_args()).await.unwrap();

        let job = queue.dequeue().await.unwrap().unwrap();
        assert_eq!(job.queue_job_id(), id);
    }

    #[tokio::test]
    async fn status_progresses_through_the_lifecycle() {
        let queue = MemoryJobQueue::new();
        let id = queue.enqueue_destroy(sample_destroy_args()).await.unwrap();
        assert_eq!(
            queue.status(&id).await.unwrap().unwrap().status,
            QueueJobState::Queued
        );

        queue.dequeue().await.unwrap();
        assert_eq!(
            queue.status(&id).await.unwrap().unwrap().status,
            QueueJobState::InProgress
        );

        queue
            .mark_complete(&id, serde_json::json!({"deployed_range_id": Uuid::nil()}))
            .await
            .unwrap();
        assert_eq!(
            queue.status(&id).await.unwrap().unwrap().status,
            QueueJobState::Complete
        );
    }

    #[tokio::test]
    async fn unknown_job_id_has_no_status() {
        let queue = MemoryJobQueue::new();
        assert!(queue.status("does-not-exist").await.unwrap().is_none());
    }
}
