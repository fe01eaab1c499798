/// Unified error types for Petal Gallery
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the gallery service
#[derive(Error, Debug)]
pub enum GalleryError {
    /// Local database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Authorization errors
    #[error("Not authorized: {0}")]
    Authorization(String),

    /// Validation errors (bad file type/size, bad query parameters)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Object storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Hosted backend rejected a request
    #[error("Backend error ({status}): {message}")]
    Backend { status: u16, message: String },

    /// Transport errors talking to the hosted backend
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Conflict errors (e.g. a deletion already in flight)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JWT errors
    #[error("JWT error: {0}")]
    Jwt(String),
}

/// JSON error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Convert GalleryError to HTTP response
impl IntoResponse for GalleryError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            GalleryError::Authentication(_) | GalleryError::Jwt(_) => (
                StatusCode::UNAUTHORIZED,
                "AuthenticationRequired",
                self.to_string(),
            ),
            GalleryError::Authorization(_) => {
                (StatusCode::FORBIDDEN, "Forbidden", self.to_string())
            }
            GalleryError::Validation(_) => {
                (StatusCode::BAD_REQUEST, "InvalidRequest", self.to_string())
            }
            GalleryError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound", self.to_string()),
            GalleryError::Conflict(_) => (StatusCode::CONFLICT, "Conflict", self.to_string()),
            GalleryError::Storage(_) | GalleryError::Backend { .. } | GalleryError::Http(_) => (
                StatusCode::BAD_GATEWAY,
                "UpstreamFailure",
                self.to_string(),
            ),
            GalleryError::Database(_) | GalleryError::Internal(_) | GalleryError::Io(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "InternalServerError",
                "Internal server error".to_string(), // Don't leak details
            ),
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for gallery operations
pub type GalleryResult<T> = Result<T, GalleryError>;
