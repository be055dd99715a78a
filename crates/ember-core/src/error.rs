use std::path::PathBuf;

use ember_abi::EngineError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmberError {
    #[error("no model loaded")]
    NotLoaded,

    #[error("failed to load model from {}", path.display())]
    ModelLoadFailed {
        path: PathBuf,
        #[source]
        source: EngineError,
    },

    #[error("failed to create inference context")]
    ContextCreationFailed {
        #[source]
        source: EngineError,
    },

    #[error("invalid chat input: {0}")]
    InvalidChatInput(String),

    #[error("no chat template produced a prompt")]
    TemplateUnavailable,

    #[error("tokenization failed: {0}")]
    TokenizationFailed(String),

    #[error("prompt evaluation failed")]
    DecodeFailed {
        #[source]
        source: EngineError,
    },

    #[error("failed to build sampler chain")]
    SamplerInit {
        #[source]
        source: EngineError,
    },
}

/// Stable, serializable name of an [`EmberError`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotLoaded,
    ModelLoadFailed,
    ContextCreationFailed,
    InvalidChatInput,
    TemplateUnavailable,
    TokenizationFailed,
    DecodeFailed,
    SamplerInit,
}

impl EmberError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EmberError::NotLoaded => ErrorKind::NotLoaded,
            EmberError::ModelLoadFailed { .. } => ErrorKind::ModelLoadFailed,
            EmberError::ContextCreationFailed { .. } => ErrorKind::ContextCreationFailed,
            EmberError::InvalidChatInput(_) => ErrorKind::InvalidChatInput,
            EmberError::TemplateUnavailable => ErrorKind::TemplateUnavailable,
            EmberError::TokenizationFailed(_) => ErrorKind::TokenizationFailed,
            EmberError::DecodeFailed { .. } => ErrorKind::DecodeFailed,
            EmberError::SamplerInit { .. } => ErrorKind::SamplerInit,
        }
    }

    /// One-line message including the engine's reason, for the diagnostic
    /// side channel.
    pub fn detail(&self) -> String {
        match std::error::Error::source(self) {
            Some(src) => format!("{self}: {src}"),
            None => self.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EmberError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_includes_engine_reason() {
        let e = EmberError::ContextCreationFailed {
            source: EngineError::ContextCreation("out of memory".into()),
        };
        assert_eq!(e.kind(), ErrorKind::ContextCreationFailed);
        assert_eq!(
            e.detail(),
            "failed to create inference context: context creation failed: out of memory"
        );
    }

    #[test]
    fn kind_serializes_snake_case() {
        let js = serde_json::to_string(&ErrorKind::InvalidChatInput).unwrap();
        assert_eq!(js, "\"invalid_chat_input\"");
    }
}
