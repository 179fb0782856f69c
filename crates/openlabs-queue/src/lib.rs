//! openlabs-queue
//!
//! The durable job queue behind deploy/destroy admission: a `JobQueue`
//! trait with a Redis-backed production implementation and an
//! in-memory test double, plus the job argument payloads carried
//! through it.

pub mod error;
pub mod jobs;
pub mod memory_queue;
pub mod queue;
pub mod redis_queue;

pub use error::QueueError;
pub use jobs::{
    DeployJobArgs, DeployRequest, DestroyJobArgs, QueueJobState, QueueJobStatus, QueuedJob,
};
pub use memory_queue::MemoryJobQueue;
pub use queue::JobQueue;
pub use redis_queue::RedisJobQueue;
