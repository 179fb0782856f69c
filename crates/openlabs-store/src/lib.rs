//! openlabs-store
//!
//! Relational persistence for the blueprint graph, deployed ranges, and
//! job bookkeeping rows. Free functions taking `&PgPool`, mirroring the
//! object-store access shape elsewhere in this codebase: callers pass
//! the handle in, nothing here is a method on a connection wrapper.
//!
//! Validation happens on ingest in `openlabs-core::validators`, not
//! here — these functions assume a pre-validated graph.

pub mod blueprints;
pub mod deployed;
pub mod error;
pub mod jobs;
pub mod secrets;
pub mod users;

pub use error::StoreError;

pub async fn run_migrations(pool: &sqlx::PgPool) -> Result<(), StoreError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
