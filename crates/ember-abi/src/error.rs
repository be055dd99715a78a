use thiserror::Error;

/// Failure reported by an [`InferenceEngine`](crate::engine::InferenceEngine)
/// implementation. Reasons are free text from the engine; the core maps these
/// onto its own error taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("model load failed: {0}")]
    ModelLoad(String),

    #[error("context creation failed: {0}")]
    ContextCreation(String),

    #[error("tokenization failed: {0}")]
    Tokenize(String),

    #[error("decode failed with code {0}")]
    Decode(i32),

    #[error("sampler failure: {0}")]
    Sampler(String),

    #[error("chat template failure: {0}")]
    Template(String),

    #[error("token {0} has no text form: {1}")]
    Piece(i32, String),
}
