use std::sync::Arc;

use openlabs_core::config::Settings;
use openlabs_provisioner::driver::ProvisionerDriver;
use openlabs_queue::JobQueue;
use sqlx::PgPool;

/// Shared worker state, the worker-side counterpart to
/// `openlabs-api::state::AppState` — no HTTP surface, so this is
/// passed by reference into the poll loop rather than injected via
/// `.with_state()`.
#[derive(Clone)]
pub struct WorkerState {
    pub pool: PgPool,
    pub queue: Arc<dyn JobQueue>,
    pub driver: Arc<dyn ProvisionerDriver>,
    pub settings: Arc<Settings>,
}
