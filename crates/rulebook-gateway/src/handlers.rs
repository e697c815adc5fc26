use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::Value;

use super::error::HandlerErrorKind;
use super::server::AppState;

pub const INVALID_QUESTION: &str = "'question' must be a non-empty string.";
pub const ROOT_TEXT: &str = r#"API is running. POST /api/ask with { "question": "..." }"#;

#[derive(serde::Serialize)]
struct AnswerResponse {
    answer: String,
}

#[derive(serde::Serialize)]
struct ErrorResponse<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

#[derive(serde::Serialize)]
struct HealthResponse {
    status: &'static str,
    index_ready: bool,
    uptime_secs: u64,
}

fn error_response(status: StatusCode, error: &str, details: Option<String>) -> Response {
    (status, Json(ErrorResponse { error, details })).into_response()
}

/// The `question` field when it is a string with visible content.
fn question_of(body: &Value) -> Option<&str> {
    body.get("question")
        .and_then(Value::as_str)
        .filter(|q| !q.trim().is_empty())
}

pub(crate) async fn ask_handler(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Response {
    let body = match payload {
        Ok(Json(body)) => body,
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            return rejection.into_response();
        }
        Err(rejection) => {
            tracing::debug!("rejected ask body: {rejection}");
            return error_response(StatusCode::BAD_REQUEST, INVALID_QUESTION, None);
        }
    };

    let Some(question) = question_of(&body) else {
        return error_response(StatusCode::BAD_REQUEST, INVALID_QUESTION, None);
    };

    match state.handler.answer(question.to_owned()).await {
        Ok(answer) => Json(AnswerResponse { answer }).into_response(),
        Err(e) if e.kind == HandlerErrorKind::BadRequest => {
            error_response(StatusCode::BAD_REQUEST, &e.message, None)
        }
        Err(e) => {
            tracing::error!(kind = e.class, "error processing request: {e}");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Server error",
                Some(e.message),
            )
        }
    }
}

pub(crate) async fn root_handler() -> &'static str {
    ROOT_TEXT
}

pub(crate) async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        index_ready: state.handler.index_ready(),
        uptime_secs: state.started_at.elapsed().as_secs(),
    })
}
