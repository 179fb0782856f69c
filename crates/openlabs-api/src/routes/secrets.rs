use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use openlabs_core::models::Provider;

use crate::error::ApiError;
use crate::extractors::{AuthUser, EncKey};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SecretPresence {
    pub provider: Provider,
    pub present: bool,
}

/// Lists which providers the caller has credentials on file for,
/// without ever touching the plaintext.
pub async fn list_secrets(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    EncKey(enc_key): EncKey,
) -> Result<Json<Vec<SecretPresence>>, ApiError> {
    let records = openlabs_store::secrets::list_secret_records(&state.pool, user.id).await?;
    let bundle = openlabs_vault::crypto::get_decrypted_secrets(&user.encrypted_private_key, &enc_key, &records);

    Ok(Json(vec![
        SecretPresence {
            provider: Provider::Aws,
            present: bundle.has_secrets(Provider::Aws),
        },
        SecretPresence {
            provider: Provider::Azure,
            present: bundle.has_secrets(Provider::Azure),
        },
    ]))
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SecretUploadRequest {
    Aws {
        access_key_id: String,
        secret_access_key: String,
    },
    Azure {
        client_id: String,
        client_secret: String,
        tenant_id: String,
        subscription_id: String,
    },
}

/// Encrypts and upserts one provider's credentials under the caller's
/// public key. The master key never enters this handler — envelope
/// encryption only needs the public key, so uploading credentials
/// doesn't require an unlocked session.
pub async fn upload_secret(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(provider): Path<String>,
    Json(req): Json<SecretUploadRequest>,
) -> Result<Json<SecretPresence>, ApiError> {
    let provider = parse_provider(&provider)?;
    validate_provider_shape(provider, &req)?;

    let plaintext = serde_json::to_vec(&req)?;
    let ciphertext = openlabs_vault::crypto::encrypt_for_user(&user.public_key, &plaintext)?;

    openlabs_store::secrets::upsert_secret_record(&state.pool, user.id, provider, &ciphertext).await?;

    Ok(Json(SecretPresence {
        provider,
        present: true,
    }))
}

fn parse_provider(raw: &str) -> Result<Provider, ApiError> {
    match raw {
        "aws" => Ok(Provider::Aws),
        "azure" => Ok(Provider::Azure),
        other => Err(ApiError::ValidationFailed(format!("unknown provider: {other}"))),
    }
}

fn validate_provider_shape(provider: Provider, req: &SecretUploadRequest) -> Result<(), ApiError> {
    match (provider, req) {
        (Provider::Aws, SecretUploadRequest::Aws { .. }) => Ok(()),
        (Provider::Azure, SecretUploadRequest::Azure { .. }) => Ok(()),
        _ => Err(ApiError::ValidationFailed(
            "credential payload does not match the provider in the URL".to_string(),
        )),
    }
}
