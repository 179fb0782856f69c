//! HTTP surface for the control plane. Split into a library so the
//! router can be exercised from integration tests without going
//! through a live Redis/Postgres bootstrap in `main.rs`.

pub mod error;
pub mod extractors;
pub mod routes;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};

use state::AppState;

pub fn build_cors(settings: &openlabs_core::config::Settings) -> CorsLayer {
    if settings.cors_allowed_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(AllowOrigin::any())
            .allow_methods(tower_http::cors::Any)
            .allow_headers(tower_http::cors::Any)
    } else {
        let origins = settings
            .cors_allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect::<Vec<_>>();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(tower_http::cors::Any)
            .allow_headers(tower_http::cors::Any)
            .allow_credentials(true)
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = build_cors(&state.settings);

    Router::new()
        .route("/api/v1/auth/register", post(routes::auth::register))
        .route("/api/v1/auth/login", post(routes::auth::login))
        .route("/api/v1/auth/logout", post(routes::auth::logout))
        .route("/api/v1/users/me", get(routes::auth::me))
        .route(
            "/api/v1/blueprints/ranges",
            get(routes::blueprints::list_ranges).post(routes::blueprints::create_range),
        )
        .route(
            "/api/v1/blueprints/ranges/{id}",
            get(routes::blueprints::get_range).delete(routes::blueprints::delete_range),
        )
        .route(
            "/api/v1/blueprints/vpcs",
            get(routes::blueprints::list_vpcs).post(routes::blueprints::create_vpc),
        )
        .route("/api/v1/blueprints/vpcs/{id}", get(routes::blueprints::get_vpc))
        .route(
            "/api/v1/blueprints/subnets",
            get(routes::blueprints::list_subnets).post(routes::blueprints::create_subnet),
        )
        .route("/api/v1/blueprints/subnets/{id}", get(routes::blueprints::get_subnet))
        .route(
            "/api/v1/blueprints/hosts",
            get(routes::blueprints::list_hosts).post(routes::blueprints::create_host),
        )
        .route("/api/v1/blueprints/hosts/{id}", get(routes::blueprints::get_host))
        .route("/api/v1/ranges", get(routes::ranges::list_ranges))
        .route("/api/v1/ranges/{id}", get(routes::ranges::get_range).delete(routes::ranges::destroy))
        .route("/api/v1/ranges/{id}/key", get(routes::ranges::get_range_key))
        .route("/api/v1/ranges/deploy", post(routes::ranges::deploy))
        .route("/api/v1/jobs/{job_id}", get(routes::jobs::get_job))
        .route("/api/v1/secrets", get(routes::secrets::list_secrets))
        .route("/api/v1/secrets/{provider}", post(routes::secrets::upload_secret))
        .layer(cors)
        .with_state(state)
}
