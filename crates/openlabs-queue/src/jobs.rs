//! Job argument payloads carried through the queue. These are the
//! structures serialized into the Redis list entry — not the
//! `openlabs_core::models::JobRecord` bookkeeping row, which lives in
//! Postgres and only tracks status.

use openlabs_core::models::BlueprintRange;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fields taken directly from `POST /ranges/deploy`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployRequest {
    pub blueprint_id: Uuid,
    pub name: String,
    pub region: String,
    pub description: Option<String>,
}

/// `enc_key` travels here, not in the `jobs` table: this payload
/// widens the trust boundary and must stay on a private network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployJobArgs {
    pub enc_key: String,
    pub deploy_request: DeployRequest,
    pub blueprint: BlueprintRange,
    pub user_id: Uuid,
    pub is_admin: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestroyJobArgs {
    pub enc_key: String,
    pub deployed_range_id: Uuid,
    pub user_id: Uuid,
    pub is_admin: bool,
}

/// One dequeued unit of work, tagged by job name so the worker can
/// dispatch without re-parsing an untyped payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum QueuedJob {
    DeployRange {
        queue_job_id: String,
        args: DeployJobArgs,
    },
    DestroyRange {
        queue_job_id: String,
        args: DestroyJobArgs,
    },
}

impl QueuedJob {
    pub fn queue_job_id(&self) -> &str {
        match self {
            QueuedJob::DeployRange { queue_job_id, .. } => queue_job_id,
            QueuedJob::DestroyRange { queue_job_id, .. } => queue_job_id,
        }
    }
}

/// Queue-side view of a job's progress, independent of the `jobs` table
/// row it is eventually reconciled against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueJobStatus {
    pub queue_job_id: String,
    pub status: QueueJobState,
    pub enqueue_time: jiff::Timestamp,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueJobState {
    Queued,
    InProgress,
    Complete,
    Failed,
}
