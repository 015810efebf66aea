use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        ApiError::Internal(err.to_string())
    }

    /// Connection failure talking to a collaborator. The request URL is
    /// dropped from the message since it can carry query credentials.
    pub fn transport(err: reqwest::Error) -> Self {
        ApiError::ServiceUnavailable(err.without_url().to_string())
    }

    /// Unreadable collaborator response, URL dropped as for `transport`.
    pub fn decode(err: reqwest::Error) -> Self {
        ApiError::Internal(err.without_url().to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        // Upstream failures surface as a bare status; the detail only goes to the log.
        let (status, message) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::ServiceUnavailable(detail) => {
                tracing::error!(error = %detail, "upstream service unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Service unavailable".to_string(),
                )
            }
            ApiError::Internal(detail) => {
                tracing::error!(error = %detail, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}

/// Startup configuration failures. Any of these keeps the process from
/// initialising.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting '{0}'")]
    Missing(String),
    #[error("invalid config at '{path}': {reason}")]
    Invalid { path: String, reason: String },
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(String),
}

impl ConfigError {
    pub fn invalid(path: &str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}
