use std::path::PathBuf;

use rulebook_llm::LlmError;

/// Coarse failure class used when reporting errors to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    DocumentLoad,
    EmbeddingService,
    Configuration,
}

impl ErrorKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DocumentLoad => "document_load",
            Self::EmbeddingService => "embedding_service",
            Self::Configuration => "configuration",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("failed to read document {}: {source}", path.display())]
    DocumentLoad {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("document {} is {size} bytes, limit is {limit}", path.display())]
    DocumentTooLarge { path: PathBuf, size: u64, limit: u64 },

    #[error("invalid splitter parameters: {0}")]
    InvalidSplitter(String),

    #[error("embedding failed: {0}")]
    Embedding(#[from] LlmError),

    #[error("malformed embedding response: {0}")]
    MalformedEmbedding(String),

    #[error("embedding dimension mismatch: index has {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("index build aborted: {0}")]
    BuildAborted(String),
}

impl IndexError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DocumentLoad { .. } | Self::DocumentTooLarge { .. } => ErrorKind::DocumentLoad,
            Self::InvalidSplitter(_) => ErrorKind::Configuration,
            Self::Embedding(_)
            | Self::MalformedEmbedding(_)
            | Self::DimensionMismatch { .. }
            | Self::BuildAborted(_) => ErrorKind::EmbeddingService,
        }
    }
}
