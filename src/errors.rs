use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

pub type AppResult<T> = Result<T, AppError>;

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),
    #[error("authorization denied: {0}")]
    AuthorizationDenied(String),
    #[error("session resolution failed: {0}")]
    SessionTransport(String),
    #[error("session rejected: {0}")]
    SessionAuth(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("storage error")]
    Storage(#[from] std::io::Error),
    #[error("serialization error")]
    Serialization(#[from] serde_json::Error),
    #[error("internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::Unauthenticated(message.into())
    }

    pub fn denied(message: impl Into<String>) -> Self {
        Self::AuthorizationDenied(message.into())
    }

    pub fn session_transport(message: impl Into<String>) -> Self {
        Self::SessionTransport(message.into())
    }

    pub fn session_auth(message: impl Into<String>) -> Self {
        Self::SessionAuth(message.into())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::AuthorizationDenied(_) => StatusCode::FORBIDDEN,
            AppError::SessionTransport(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::SessionAuth(_) => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // storage and serialization details stay in the logs
        if matches!(self, AppError::Storage(_) | AppError::Serialization(_)) {
            tracing::error!(error = ?self, "request failed");
        }

        let message = self.to_string();
        let error = match &self {
            AppError::Unauthenticated(_) => "unauthenticated",
            AppError::AuthorizationDenied(_) => "authorization_denied",
            AppError::SessionTransport(_) => "session_transport",
            AppError::SessionAuth(_) => "session_auth",
            AppError::BadRequest(_) => "bad_request",
            AppError::Configuration(_) => "configuration",
            AppError::Storage(_) => "storage",
            AppError::Serialization(_) => "serialization",
            AppError::Internal(_) => "internal",
        };

        let payload = ErrorResponse {
            error: error.to_string(),
            message,
        };

        (status, Json(payload)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(value: anyhow::Error) -> Self {
        Self::Internal(value.to_string())
    }
}
