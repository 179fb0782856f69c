//! Deployed range reads plus the deploy/destroy admission path.
//! Admission runs synchronously here; the actual provisioning happens
//! in `openlabs-worker`, reached only through `openlabs_queue::JobQueue`.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use axum_extra::extract::cookie::CookieJar;
use base64::Engine;
use serde::Serialize;
use uuid::Uuid;

use openlabs_core::models::{DeployedRange, JobName};
use openlabs_queue::{DeployJobArgs, DeployRequest, DestroyJobArgs};
use openlabs_store::deployed::{self, DeployedRangeHeader};

use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::state::AppState;

fn scope(user: &openlabs_core::models::User) -> Option<Uuid> {
    if user.is_admin {
        None
    } else {
        Some(user.id)
    }
}

pub async fn list_ranges(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<DeployedRangeHeader>>, ApiError> {
    let headers = deployed::list_deployed_range_headers(&state.pool, scope(&user)).await?;
    Ok(Json(headers))
}

pub async fn get_range(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<DeployedRange>, ApiError> {
    let range = deployed::get_deployed_range(&state.pool, id, scope(&user))
        .await?
        .ok_or(ApiError::Forbidden)?;
    Ok(Json(range))
}

#[derive(Debug, Serialize)]
pub struct RangeKeyResponse {
    pub private_ssh_key: String,
}

pub async fn get_range_key(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    jar: CookieJar,
    Path(id): Path<Uuid>,
) -> Result<Json<RangeKeyResponse>, ApiError> {
    let master_key = decode_enc_key_cookie(&jar)?
        .ok_or_else(|| ApiError::Unauthenticated("no encryption key available for this account".to_string()))?;

    let range = deployed::get_deployed_range(&state.pool, id, scope(&user))
        .await?
        .ok_or(ApiError::Forbidden)?;

    let ciphertext = range
        .private_ssh_key
        .ok_or_else(|| ApiError::Internal("range has no jumpbox key on file".to_string()))?;

    let plaintext = openlabs_vault::crypto::decrypt_for_user(&user.encrypted_private_key, &master_key, &ciphertext)?;

    Ok(Json(RangeKeyResponse {
        private_ssh_key: String::from_utf8_lossy(&plaintext).into_owned(),
    }))
}

#[derive(Debug, Serialize)]
pub struct JobAcceptedResponse {
    pub arq_job_id: String,
    pub detail: String,
}

pub async fn deploy(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    jar: CookieJar,
    Json(req): Json<DeployRequest>,
) -> Result<(StatusCode, Json<JobAcceptedResponse>), ApiError> {
    let enc_key_raw = raw_enc_key_cookie(&jar)?;

    let blueprint = openlabs_store::blueprints::get_blueprint_range(&state.pool, req.blueprint_id, scope(&user))
        .await?
        .ok_or(ApiError::Forbidden)?;

    // A legacy account with no key_salt carries an empty enc_key cookie
    // and can never decrypt secrets; that's indistinguishable from
    // having none on file as far as this endpoint is concerned.
    let has_secrets = match decode_enc_key_cookie(&jar)? {
        Some(master_key) => {
            let records = openlabs_store::secrets::list_secret_records(&state.pool, user.id).await?;
            let bundle =
                openlabs_vault::crypto::get_decrypted_secrets(&user.encrypted_private_key, &master_key, &records);
            bundle.has_secrets(blueprint.provider)
        }
        None => false,
    };
    if !has_secrets {
        return Err(ApiError::NoCredentials(blueprint.provider.to_string()));
    }

    let args = DeployJobArgs {
        enc_key: enc_key_raw,
        deploy_request: req,
        blueprint,
        user_id: user.id,
        is_admin: user.is_admin,
    };

    let queue_job_id = state.queue.enqueue_deploy(args).await?;
    let detail = match openlabs_store::jobs::insert_job(&state.pool, &queue_job_id, JobName::DeployRange, user.id).await
    {
        Ok(_) => "DB_SAVE_SUCCESS".to_string(),
        Err(e) => {
            tracing::error!(error = %e, "failed to persist job record after enqueue");
            "DB_SAVE_FAILURE".to_string()
        }
    };

    Ok((
        StatusCode::ACCEPTED,
        Json(JobAcceptedResponse {
            arq_job_id: queue_job_id,
            detail,
        }),
    ))
}

pub async fn destroy(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    jar: CookieJar,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<JobAcceptedResponse>), ApiError> {
    let enc_key_raw = raw_enc_key_cookie(&jar)?;

    deployed::get_deployed_range(&state.pool, id, scope(&user))
        .await?
        .ok_or(ApiError::Forbidden)?;

    let args = DestroyJobArgs {
        enc_key: enc_key_raw,
        deployed_range_id: id,
        user_id: user.id,
        is_admin: user.is_admin,
    };

    let queue_job_id = state.queue.enqueue_destroy(args).await?;
    let detail = match openlabs_store::jobs::insert_job(&state.pool, &queue_job_id, JobName::DestroyRange, user.id)
        .await
    {
        Ok(_) => "DB_SAVE_SUCCESS".to_string(),
        Err(e) => {
            tracing::error!(error = %e, "failed to persist job record after enqueue");
            "DB_SAVE_FAILURE".to_string()
        }
    };

    Ok((
        StatusCode::ACCEPTED,
        Json(JobAcceptedResponse {
            arq_job_id: queue_job_id,
            detail,
        }),
    ))
}

fn raw_enc_key_cookie(jar: &CookieJar) -> Result<String, ApiError> {
    jar.get("enc_key")
        .map(|c| c.value().to_string())
        .ok_or_else(|| ApiError::Unauthenticated("missing encryption key cookie".to_string()))
}

/// Decodes the `enc_key` cookie. A present-but-empty cookie is a legacy
/// account with no key_salt on file (see `auth::login`); that's `Ok(None)`,
/// not an error — callers fall back to treating it as absent credentials.
fn decode_enc_key_cookie(jar: &CookieJar) -> Result<Option<[u8; 32]>, ApiError> {
    let raw = raw_enc_key_cookie(jar)?;
    if raw.is_empty() {
        return Ok(None);
    }
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(raw)
        .map_err(|_| ApiError::Unauthenticated("encryption key cookie is not valid base64".to_string()))?;
    let key = bytes
        .try_into()
        .map_err(|_| ApiError::Unauthenticated("encryption key cookie has the wrong length".to_string()))?;
    Ok(Some(key))
}
