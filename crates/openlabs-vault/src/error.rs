use thiserror::Error;

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("invalid encryption key")]
    InvalidEncryptionKey,

    #[error("authentication failure unwrapping private key")]
    AuthenticationFailure,

    #[error("no credentials found for provider: {0}")]
    NoCredentials(String),

    #[error("rsa error: {0}")]
    Rsa(#[from] rsa::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("password hashing error: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),

    #[error("jwt error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}
