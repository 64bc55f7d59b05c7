//! Axum handlers.
//!
//! Every response carries a JSON body: `{"response": ...}` on success,
//! `{"error": ...}` otherwise.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::conversation::DEFAULT_SESSION;

use super::AxumState;

const NO_MESSAGE: &str = "No message provided";

// ── Helpers ───────────────────────────────────────────────────────────────────

fn json_error(status: StatusCode, msg: impl std::fmt::Display) -> Response {
    (status, Json(json!({ "error": msg.to_string() }))).into_response()
}

/// Pull a non-empty string field out of a JSON object body.
fn text_field<'a>(body: &'a Value, key: &str) -> Option<&'a str> {
    body.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

// ── Handlers ──────────────────────────────────────────────────────────────────

/// POST /chat
///
/// The body is parsed by hand rather than through the `Json` extractor so
/// that a missing content type or an unparsable body still gets the JSON
/// `400` instead of axum's plain-text rejection.
pub(super) async fn chat(State(state): State<AxumState>, body: Bytes) -> Response {
    let parsed: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);

    let Some(message) = text_field(&parsed, "message") else {
        debug!(channel_id = %state.channel_id, "rejecting request without message");
        return json_error(StatusCode::BAD_REQUEST, NO_MESSAGE);
    };
    let session_id = text_field(&parsed, "session_id").unwrap_or(DEFAULT_SESSION);

    match state.chat.exchange(session_id, message).await {
        Ok(reply) => (StatusCode::OK, Json(json!({ "response": reply.content }))).into_response(),
        Err(e) if e.is_timeout() => {
            warn!(channel_id = %state.channel_id, %session_id, "completion timed out: {e}");
            json_error(StatusCode::GATEWAY_TIMEOUT, e)
        }
        Err(e) => {
            warn!(channel_id = %state.channel_id, %session_id, "completion failed: {e}");
            json_error(StatusCode::BAD_GATEWAY, e)
        }
    }
}

/// GET /health
pub(super) async fn health(State(state): State<AxumState>) -> Response {
    let provider = state.chat.gateway().provider();
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "provider": provider.name(),
            "model": provider.model(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_field_rejects_falsy_values() {
        let body = json!({ "a": "", "b": null, "c": 0, "d": false, "e": "ok" });
        assert_eq!(text_field(&body, "a"), None);
        assert_eq!(text_field(&body, "b"), None);
        assert_eq!(text_field(&body, "c"), None);
        assert_eq!(text_field(&body, "d"), None);
        assert_eq!(text_field(&body, "missing"), None);
        assert_eq!(text_field(&body, "e"), Some("ok"));
    }

    #[test]
    fn text_field_on_non_object() {
        assert_eq!(text_field(&Value::Null, "message"), None);
        assert_eq!(text_field(&json!(["message"]), "message"), None);
        assert_eq!(text_field(&json!("message"), "message"), None);
    }
}
