use std::sync::Arc;

use base64::Engine;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

use openlabs_api::state::AppState;
use openlabs_core::config::Settings;
use openlabs_queue::RedisJobQueue;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let settings = Settings::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&settings.postgres_url)
        .await?;
    openlabs_store::run_migrations(&pool).await?;
    seed_admin(&pool, &settings).await?;

    let queue = RedisJobQueue::connect(&settings.redis_url).await?;

    let state = AppState {
        pool,
        queue: Arc::new(queue),
        settings: Arc::new(settings),
    };

    let app = openlabs_api::build_router(state);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:8000").await?;
    tracing::info!("openlabs-api listening on 0.0.0.0:8000");
    axum::serve(listener, app).await?;

    Ok(())
}

/// Bootstraps the configured admin account on first start, the Rust
/// equivalent of the original's `create_admin.py` script.
async fn seed_admin(pool: &sqlx::PgPool, settings: &Settings) -> eyre::Result<()> {
    let password_hash = openlabs_vault::crypto::hash_password(&settings.admin_password)?;
    let salt = openlabs_vault::crypto::generate_salt();
    let master_key = openlabs_vault::crypto::derive_master_key(&settings.admin_password, &salt);
    let (public_key, encrypted_private_key) = openlabs_vault::crypto::generate_keypair(&master_key)?;
    let key_salt = base64::engine::general_purpose::STANDARD.encode(salt);

    openlabs_store::users::seed_admin_user(
        pool,
        &settings.admin_email,
        &settings.admin_name,
        &password_hash,
        &key_salt,
        &public_key,
        &encrypted_private_key,
    )
    .await?;
    Ok(())
}
