use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum JobName {
    DeployRange,
    DestroyRange,
}

impl JobName {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobName::DeployRange => "deploy_range",
            JobName::DestroyRange => "destroy_range",
        }
    }
}

/// Job status progresses monotonically: `queued -> in_progress ->
/// {complete, failed}`. Never regresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    InProgress,
    Complete,
    Failed,
}

/// `queue_job_id` is assigned by the queue at enqueue time and is the
/// join key between this bookkeeping row and the queue's own state.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct JobRecord {
    pub queue_job_id: String,
    pub name: JobName,
    pub owner_id: Uuid,
    pub submitted_at: jiff::Timestamp,
    pub status: JobStatus,
    pub detail: Option<String>,
}
