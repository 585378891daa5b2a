use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use thiserror::Error;

use crate::schemas::ErrorResponse;

/// Rejections produced by the authentication gate.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No bearer header and no session cookie
    #[error("Authentication required")]
    Unauthenticated,

    /// Bad signature, expired, malformed or a non-numeric subject
    #[error("Invalid or expired token")]
    InvalidToken,

    /// The token is valid but its user no longer exists
    #[error("Session is no longer valid")]
    InvalidSession,

    #[error("Authentication failed: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AuthError::Unauthenticated => "UNAUTHENTICATED",
            AuthError::InvalidToken => "INVALID_TOKEN",
            AuthError::InvalidSession => "INVALID_SESSION",
            AuthError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.to_string(),
            code: self.code().to_string(),
            success: false,
        };
        (self.status(), Json(body)).into_response()
    }
}
