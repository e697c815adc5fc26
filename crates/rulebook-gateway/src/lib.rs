//! HTTP gateway for rulebook questions with request tracing, CORS and health endpoints.

mod error;
mod handlers;
mod router;
mod server;

pub use error::{GatewayError, HandlerError, HandlerErrorKind};
pub use handlers::{INVALID_QUESTION, ROOT_TEXT};
pub use router::build_router;
pub use server::{AppState, GatewayServer, QuestionHandler};
