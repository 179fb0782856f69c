use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::VaultError;

/// Claims embedded in the `token` session cookie. `sub` carries the
/// user id as a string, matching the original's `{"user": str(user_id)}`
/// claim shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
}

pub fn issue_token(user_id: Uuid, secret_key: &str, expire_minutes: i64) -> Result<String, VaultError> {
    let exp = jiff::Timestamp::now()
        .as_second()
        .saturating_add(expire_minutes.saturating_mul(60));
    let claims = Claims {
        sub: user_id.to_string(),
        exp,
    };
    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret_key.as_bytes()),
    )?)
}

pub fn validate_token(token: &str, secret_key: &str) -> Result<Uuid, VaultError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret_key.as_bytes()),
        &validation,
    )
    .map_err(|_| VaultError::AuthenticationFailure)?;

    Uuid::parse_str(&data.claims.sub).map_err(|_| VaultError::AuthenticationFailure)
}
