//! Cookie-based session extractors. A session lives in the `token`/
//! `enc_key` cookie pair rather than an `Authorization` header, so
//! authentication is implemented as two `FromRequestParts` impls
//! instead of a `tower` middleware layer.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::cookie::CookieJar;
use base64::Engine;
use openlabs_core::models::User;

use crate::error::ApiError;
use crate::state::AppState;

/// The authenticated user, resolved from the `token` cookie.
pub struct AuthUser(pub User);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar
            .get("token")
            .map(|c| c.value().to_string())
            .ok_or_else(|| ApiError::Unauthenticated("missing session cookie".to_string()))?;

        let user_id = openlabs_vault::jwt::validate_token(&token, &state.settings.secret_key)
            .map_err(|_| ApiError::Unauthenticated("invalid or expired session".to_string()))?;

        let user = openlabs_store::users::get_user_by_id(&state.pool, user_id)
            .await?
            .ok_or_else(|| ApiError::Unauthenticated("session refers to an unknown user".to_string()))?;

        Ok(AuthUser(user))
    }
}

/// The base64-decoded master key carried in the `enc_key` cookie.
/// Present only once a user has logged in; absence is surfaced as
/// `Unauthenticated` rather than folded silently into a default.
pub struct EncKey(pub [u8; 32]);

impl FromRequestParts<AppState> for EncKey {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &AppState) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let raw = jar
            .get("enc_key")
            .map(|c| c.value().to_string())
            .ok_or_else(|| ApiError::Unauthenticated("missing encryption key cookie".to_string()))?;

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(raw)
            .map_err(|_| ApiError::Unauthenticated("encryption key cookie is not valid base64".to_string()))?;

        let key: [u8; 32] = bytes
            .try_into()
            .map_err(|_| ApiError::Unauthenticated("encryption key cookie has the wrong length".to_string()))?;

        Ok(EncKey(key))
    }
}
