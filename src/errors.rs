use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

/// Application-specific error types.
#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
    /// The property feed could not be fetched or parsed.
    FeedUnavailable(String),
    /// A single feed entry lacked the fields needed to build a record.
    MalformedRecord(String),
    /// Resource not found error.
    NotFound(String),
    /// Bad request error (invalid input).
    BadRequest(String),
    /// Invalid or unreadable configuration (env vars, taxonomy file).
    ConfigError(String),
    /// Internal server error.
    InternalError(String),
    /// Error with context chain for better debugging.
    WithContext {
        /// The underlying source of the error.
        source: Box<AppError>,
        /// Additional context message.
        context: String,
    },
}

impl AppError {
    /// Returns the innermost error, skipping any context wrappers.
    pub fn root(&self) -> &AppError {
        match self {
            AppError::WithContext { source, .. } => source.root(),
            other => other,
        }
    }

    /// True when the root cause is a feed outage.
    pub fn is_feed_unavailable(&self) -> bool {
        matches!(self.root(), AppError::FeedUnavailable(_))
    }
}

impl fmt::Display for AppError {
    /// Formats the error for display.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::FeedUnavailable(msg) => write!(f, "Feed unavailable: {}", msg),
            AppError::MalformedRecord(msg) => write!(f, "Malformed record: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            AppError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            AppError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    /// Converts the error into an HTTP response.
    ///
    /// Maps each error variant to an appropriate HTTP status code and JSON body.
    /// Logs errors appropriately based on their severity.
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::FeedUnavailable(msg) => {
                tracing::error!("Feed unavailable: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Property feed unavailable".to_string(),
                )
            }
            AppError::MalformedRecord(msg) => {
                tracing::warn!("Malformed record: {}", msg);
                (StatusCode::BAD_GATEWAY, "Malformed feed record".to_string())
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::ConfigError(msg) | AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::WithContext { source, context } => {
                // Log full context chain for debugging
                tracing::error!("Error with context: {} -> {}", context, source);
                // Delegate to underlying error's response
                return (**source).clone().into_response();
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<quick_xml::Error> for AppError {
    /// XML the parser cannot make sense of.
    fn from(err: quick_xml::Error) -> Self {
        AppError::FeedUnavailable(format!("XML parse error: {}", err))
    }
}

/// Extension trait for adding context to errors.
/// Similar to `anyhow::Context` but for our `AppError` type.
pub trait ResultExt<T> {
    /// Add context to an error.
    ///
    /// # Arguments
    ///
    /// * `context` - The context message to add.
    fn context(self, context: impl Into<String>) -> Result<T, AppError>;

    /// Add context lazily (only evaluated on error).
    ///
    /// # Arguments
    ///
    /// * `f` - A closure that produces the context message.
    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T, AppError> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: f(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_chain_display() {
        let err: Result<(), AppError> =
            Err(AppError::FeedUnavailable("status 500".to_string()));
        let err = err.context("primary feed").unwrap_err();

        assert_eq!(err.to_string(), "primary feed: Feed unavailable: status 500");
        assert!(err.is_feed_unavailable());
    }

    #[test]
    fn test_root_skips_nested_context() {
        let inner = AppError::NotFound("N1234".to_string());
        let err = AppError::WithContext {
            source: Box::new(AppError::WithContext {
                source: Box::new(inner.clone()),
                context: "lookup".to_string(),
            }),
            context: "handler".to_string(),
        };

        assert_eq!(err.root(), &inner);
        assert!(!err.is_feed_unavailable());
    }

    #[test]
    fn test_feed_unavailable_maps_to_503() {
        let response = AppError::FeedUnavailable("timeout".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
