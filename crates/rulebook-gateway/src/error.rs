use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("failed to bind {0}: {1}")]
    Bind(String, std::io::Error),
    #[error("server error: {0}")]
    Server(String),
}

/// Whether a failed question was the caller's fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerErrorKind {
    BadRequest,
    Internal,
}

/// Failure reported by a [`crate::QuestionHandler`].
#[derive(Debug, Error)]
#[error("{message}")]
pub struct HandlerError {
    pub kind: HandlerErrorKind,
    /// Fine-grained failure class, logged but never sent to clients.
    pub class: &'static str,
    pub message: String,
}

impl HandlerError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            kind: HandlerErrorKind::BadRequest,
            class: "invalid_request",
            message: message.into(),
        }
    }

    pub fn internal(class: &'static str, message: impl Into<String>) -> Self {
        Self {
            kind: HandlerErrorKind::Internal,
            class,
            message: message.into(),
        }
    }
}
