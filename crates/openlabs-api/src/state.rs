use std::sync::Arc;

use openlabs_core::config::Settings;
use openlabs_queue::JobQueue;
use sqlx::PgPool;

/// Shared application state, injected into all route handlers via Axum
/// state: a pool handle, a queue handle, and process-wide settings,
/// nothing else.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub queue: Arc<dyn JobQueue>,
    pub settings: Arc<Settings>,
}
