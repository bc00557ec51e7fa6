//! Response builders shared by the router fallbacks, policies and handlers.
//!
//! # Design Decisions
//! - Error bodies are always `{"message": "..."}`
//! - Internal error details never reach the body

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use crate::routing::middleware::Response;

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    message: &'a str,
}

/// JSON error response with a `message` field.
pub fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(ErrorBody { message })).into_response()
}

/// JSON response with the given status.
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response {
    (status, Json(body)).into_response()
}

/// Empty-bodied response.
pub fn empty_response(status: StatusCode) -> Response {
    status.into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header;

    #[tokio::test]
    async fn test_error_response_body() {
        let response = error_response(StatusCode::NOT_FOUND, "Not Found");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], br#"{"message":"Not Found"}"#);
    }

    #[test]
    fn test_empty_response() {
        let response = empty_response(StatusCode::NO_CONTENT);
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }
}
