//! Routing error types.
//!
//! Setup-time failures ([`RouterError`]) are fatal and stop the service from
//! starting. Request-time failures ([`HandlerError`]) are what the dispatcher's
//! error boundary catches.

use thiserror::Error;

use crate::store::StoreError;

/// Errors raised while registering routes and middleware bindings.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouterError {
    /// A route pattern contains a malformed parameter segment.
    #[error("invalid route pattern \"{pattern}\": {reason}")]
    InvalidRoutePattern { pattern: String, reason: String },

    /// `use_prefix` was called without any middleware.
    #[error("use_prefix(\"{prefix}\"): at least one middleware required")]
    EmptyMiddlewareList { prefix: String },
}

/// Errors a handler or middleware can fail with.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Key-value store failure.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Payload (de)serialization failure.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Response construction failure.
    #[error("http error: {0}")]
    Http(#[from] axum::http::Error),

    /// The handler panicked; the payload message is kept for logging.
    #[error("handler panicked: {0}")]
    Panicked(String),

    /// Any other failure.
    #[error("{0}")]
    Other(String),
}

impl HandlerError {
    pub fn other(message: impl Into<String>) -> Self {
        HandlerError::Other(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RouterError::InvalidRoutePattern {
            pattern: "/posts/:1d".into(),
            reason: "bad param name \"1d\"".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid route pattern \"/posts/:1d\": bad param name \"1d\""
        );

        let err = RouterError::EmptyMiddlewareList { prefix: "/api".into() };
        assert!(err.to_string().contains("/api"));

        let err = HandlerError::other("boom");
        assert_eq!(err.to_string(), "boom");
    }
}
