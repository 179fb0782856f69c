use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProvisionerError {
    #[error("{tool} not found on PATH (expected binary `{binary}`)")]
    ToolMissing { tool: String, binary: &'static str },

    #[error("{step} exited with status {status:?}: {stderr}")]
    ProvisionerFailed {
        step: &'static str,
        status: Option<i32>,
        stderr: String,
    },

    #[error("synthesis failed: {0}")]
    SynthesisFailed(#[from] openlabs_materializer::error::MaterializerError),

    #[error("apply was not preceded by synthesize")]
    NotSynthesized,

    #[error("destroy requires a persisted state blob")]
    MissingState,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
