//! End-to-end pass over the deploy admission path: register, create a
//! blueprint, attempt deploy without credentials (422), upload a
//! credential, deploy (202), poll job status, then destroy. Runs
//! against a `MemoryJobQueue` — no worker process, no provisioner
//! subprocess — since the admission path is what this crate owns.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use ipnet::Ipv4Net;
use openlabs_core::config::Settings;
use openlabs_queue::MemoryJobQueue;
use serde_json::{json, Value};
use tower::ServiceExt;

use openlabs_api::state::AppState;

fn test_settings() -> Settings {
    Settings {
        postgres_url: String::new(),
        redis_url: String::new(),
        secret_key: "test-secret-key".to_string(),
        access_token_expire_minutes: 60,
        cdktf_dir: std::env::temp_dir(),
        admin_email: "admin@openlabs.local".to_string(),
        admin_password: "changeme".to_string(),
        admin_name: "Administrator".to_string(),
        cors_allowed_origins: Vec::new(),
        worker_concurrency: 1,
    }
}

async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    cookie: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value, Option<String>) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let request = if let Some(body) = body {
        builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap()
    } else {
        builder.body(Body::empty()).unwrap()
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let set_cookie = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().split(';').next().unwrap().to_string())
        .collect::<Vec<_>>()
        .join("; ");
    let set_cookie = if set_cookie.is_empty() { None } else { Some(set_cookie) };

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value, set_cookie)
}

fn sample_range_body() -> Value {
    let vpc_cidr: Ipv4Net = "10.0.0.0/16".parse().unwrap();
    let subnet_cidr: Ipv4Net = "10.0.1.0/24".parse().unwrap();
    json!({
        "id": "00000000-0000-0000-0000-000000000000",
        "name": "range-1",
        "provider": "aws",
        "region": "us_east_1",
        "vnc": false,
        "vpn": false,
        "owner_id": "00000000-0000-0000-0000-000000000000",
        "vpcs": [{
            "id": "00000000-0000-0000-0000-000000000000",
            "name": "vpc-1",
            "cidr": vpc_cidr.to_string(),
            "parent_range_id": null,
            "subnets": [{
                "id": "00000000-0000-0000-0000-000000000000",
                "name": "subnet-1",
                "cidr": subnet_cidr.to_string(),
                "parent_vpc_id": null,
                "hosts": [{
                    "id": "00000000-0000-0000-0000-000000000000",
                    "hostname": "h1",
                    "os": "debian_11",
                    "spec": "tiny",
                    "disk_size_gb": 8,
                    "tags": ["linux"],
                    "parent_subnet_id": null
                }]
            }]
        }]
    })
}

#[sqlx::test]
async fn register_login_deploy_requires_credentials_then_succeeds(pool: sqlx::PgPool) {
    openlabs_store::run_migrations(&pool).await.unwrap();

    let state = AppState {
        pool,
        queue: Arc::new(MemoryJobQueue::new()),
        settings: Arc::new(test_settings()),
    };
    let app = openlabs_api::build_router(state);

    let (status, _body, _) = send(
        &app,
        "POST",
        "/api/v1/auth/register",
        None,
        Some(json!({"email": "user@example.com", "password": "hunter2", "name": "Test User"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _body, cookies) = send(
        &app,
        "POST",
        "/api/v1/auth/login",
        None,
        Some(json!({"email": "user@example.com", "password": "hunter2"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let cookie = cookies.expect("login should set session cookies");

    let (status, range_body, _) =
        send(&app, "POST", "/api/v1/blueprints/ranges", Some(&cookie), Some(sample_range_body())).await;
    assert_eq!(status, StatusCode::OK);
    let blueprint_id = range_body["id"].as_str().unwrap().to_string();

    let (status, body, _) = send(
        &app,
        "POST",
        "/api/v1/ranges/deploy",
        Some(&cookie),
        Some(json!({"blueprint_id": blueprint_id, "name": "range-1", "region": "us_east_1", "description": null})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "deploy without credentials must be rejected: {body:?}");

    let (status, _body, _) = send(
        &app,
        "POST",
        "/api/v1/secrets/aws",
        Some(&cookie),
        Some(json!({"access_key_id": "AKIAEXAMPLE", "secret_access_key": "shh"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body, _) = send(
        &app,
        "POST",
        "/api/v1/ranges/deploy",
        Some(&cookie),
        Some(json!({"blueprint_id": blueprint_id, "name": "range-1", "region": "us_east_1", "description": null})),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED, "deploy with credentials on file should be accepted: {body:?}");
    let queue_job_id = body["arq_job_id"].as_str().unwrap().to_string();
    assert_eq!(body["detail"], "DB_SAVE_SUCCESS");

    let (status, job_body, _) = send(&app, "GET", &format!("/api/v1/jobs/{queue_job_id}"), Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(job_body["status"], "queued");
}

#[sqlx::test]
async fn deploy_without_a_session_is_unauthenticated(pool: sqlx::PgPool) {
    openlabs_store::run_migrations(&pool).await.unwrap();

    let state = AppState {
        pool,
        queue: Arc::new(MemoryJobQueue::new()),
        settings: Arc::new(test_settings()),
    };
    let app = openlabs_api::build_router(state);

    let (status, _body, _) = send(
        &app,
        "POST",
        "/api/v1/ranges/deploy",
        None,
        Some(json!({"blueprint_id": "00000000-0000-0000-0000-000000000000", "name": "x", "region": "us_east_1", "description": null})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
