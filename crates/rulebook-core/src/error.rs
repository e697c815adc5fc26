use std::sync::Arc;

use rulebook_index::{ErrorKind, IndexError};
use rulebook_llm::LlmError;

#[derive(Debug, thiserror::Error)]
pub enum AnswerError {
    #[error("generation failed: {0}")]
    Generation(#[from] LlmError),
}

#[derive(Debug, thiserror::Error)]
pub enum AskError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("index unavailable: {0}")]
    Index(Arc<IndexError>),

    #[error("retrieval failed: {0}")]
    Retrieval(#[from] IndexError),

    #[error(transparent)]
    Answer(#[from] AnswerError),
}

impl AskError {
    /// Stable failure class for logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::Index(e) => e.kind().as_str(),
            Self::Retrieval(e) => match e.kind() {
                ErrorKind::Configuration => ErrorKind::Configuration.as_str(),
                _ => ErrorKind::EmbeddingService.as_str(),
            },
            Self::Answer(_) => "generation_service",
        }
    }

    /// Whether the caller, not the service, is at fault.
    #[must_use]
    pub fn is_invalid_request(&self) -> bool {
        matches!(self, Self::InvalidRequest(_))
    }
}
