use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Error taxonomy shared by the store and the HTTP boundary.
///
/// Every domain failure carries a message and maps to one HTTP status.
/// Infrastructure failures (SQLite, JSON) are wrapped as [`ApiError::Internal`]
/// and never leak details to the client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or empty required input.
    #[error("{0}")]
    Validation(String),

    /// A non-deleted feature already carries the same title.
    #[error("Feature with the same title already exists")]
    DuplicateTitle,

    #[error("{0}")]
    NotFound(String),

    /// Ownership or role mismatch.
    #[error("{0}")]
    Forbidden(String),

    /// Missing or malformed identity headers on a protected route.
    #[error("Authentication required")]
    Unauthorized,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::DuplicateTitle => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn not_found(what: &str) -> Self {
        Self::NotFound(format!("{} not found", what))
    }

    pub fn forbidden() -> Self {
        Self::Forbidden("You are not authorized!".to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            // The full error is logged server-side; clients get a generic message.
            Self::Internal(e) => {
                tracing::error!("Internal error: {e:#}");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(serde_json::json!({
            "message": message,
            "statusCode": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

impl From<rusqlite::Error> for ApiError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Internal(e.into())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        Self::Internal(e.into())
    }
}
