use thiserror::Error;

#[derive(Debug, Error)]
pub enum MaterializerError {
    #[error("io error writing plan: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("unsupported provider for materialization: {0}")]
    UnsupportedProvider(String),
}
