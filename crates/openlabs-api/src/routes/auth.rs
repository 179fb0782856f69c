use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::Engine;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub id: Uuid,
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    if openlabs_store::users::get_user_by_email(&state.pool, &req.email)
        .await?
        .is_some()
    {
        return Err(ApiError::ValidationFailed(format!(
            "an account already exists for {}",
            req.email
        )));
    }

    let password_hash = openlabs_vault::crypto::hash_password(&req.password)?;
    let salt = openlabs_vault::crypto::generate_salt();
    let master_key = openlabs_vault::crypto::derive_master_key(&req.password, &salt);
    let (public_key, encrypted_private_key) = openlabs_vault::crypto::generate_keypair(&master_key)?;
    let key_salt = base64::engine::general_purpose::STANDARD.encode(salt);

    let user = openlabs_store::users::create_user(
        &state.pool,
        &req.email,
        &req.name,
        &password_hash,
        &key_salt,
        &public_key,
        &encrypted_private_key,
        false,
    )
    .await?;

    Ok((StatusCode::OK, Json(RegisterResponse { id: user.id })))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, StatusCode), ApiError> {
    let user = openlabs_store::users::get_user_by_email(&state.pool, &req.email)
        .await?
        .ok_or_else(|| ApiError::Unauthenticated("invalid email or password".to_string()))?;

    let verified = openlabs_vault::crypto::verify_password(&req.password, &user.password_hash)?;
    if !verified {
        return Err(ApiError::Unauthenticated("invalid email or password".to_string()));
    }

    // A legacy account with no key_salt on file has no way to derive a
    // master key at all; the cookie is set to an empty string rather
    // than failing login, so the session still carries a valid `token`
    // and only credential-decrypting endpoints are affected.
    let enc_key = match &user.key_salt {
        Some(key_salt) => {
            let salt = base64::engine::general_purpose::STANDARD
                .decode(key_salt)
                .map_err(|e| ApiError::Internal(e.to_string()))?;
            let master_key = openlabs_vault::crypto::derive_master_key(&req.password, &salt);
            base64::engine::general_purpose::STANDARD.encode(master_key)
        }
        None => String::new(),
    };

    let token = openlabs_vault::jwt::issue_token(
        user.id,
        &state.settings.secret_key,
        state.settings.access_token_expire_minutes,
    )?;

    let token_cookie = session_cookie("token", token, &state);
    let enc_key_cookie = session_cookie("enc_key", enc_key, &state);
    let jar = jar.add(token_cookie).add(enc_key_cookie);

    Ok((jar, StatusCode::OK))
}

pub async fn logout(jar: CookieJar) -> (CookieJar, StatusCode) {
    let jar = jar.remove(Cookie::from("token")).remove(Cookie::from("enc_key"));
    (jar, StatusCode::OK)
}

pub async fn me(AuthUser(user): AuthUser) -> Json<openlabs_core::models::User> {
    Json(user)
}

fn session_cookie(name: &'static str, value: String, state: &AppState) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(true)
        .max_age(time::Duration::minutes(state.settings.access_token_expire_minutes))
        .build()
}
