use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use compute::error::ComputeError;
use sea_orm::DbErr;
use thiserror::Error;
use tracing::error;

use crate::auth::AuthError;
use crate::schemas::ErrorResponse;

/// Error returned by every API handler.
///
/// Each variant maps to a status code and a machine-readable `code`; the body
/// is always an [`ErrorResponse`].
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{message}")]
    BadRequest { code: &'static str, message: String },

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("{message}")]
    Unauthorized { code: &'static str, message: String },

    #[error("{0}")]
    NotFound(String),

    #[error("{message}")]
    Conflict { code: &'static str, message: String },

    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("Email delivery failed: {0}")]
    Email(String),

    #[error("LLM request failed: {0}")]
    Llm(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        ApiError::BadRequest {
            code,
            message: message.into(),
        }
    }

    pub fn conflict(code: &'static str, message: impl Into<String>) -> Self {
        ApiError::Conflict {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(what: &str, id: i32) -> Self {
        ApiError::NotFound(format!("{} with id {} not found", what, id))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::Auth(err) => err.status(),
            ApiError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::Database(_)
            | ApiError::Email(_)
            | ApiError::Llm(_)
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::BadRequest { code, .. }
            | ApiError::Unauthorized { code, .. }
            | ApiError::Conflict { code, .. } => *code,
            ApiError::Auth(err) => err.code(),
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Database(_) => "DATABASE_ERROR",
            ApiError::Email(_) => "EMAIL_ERROR",
            ApiError::Llm(_) => "LLM_ERROR",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(code = self.code(), "Request failed: {}", self);
        }

        let body = ErrorResponse {
            error: self.to_string(),
            code: self.code().to_string(),
            success: false,
        };
        (status, Json(body)).into_response()
    }
}

impl From<ComputeError> for ApiError {
    fn from(err: ComputeError) -> Self {
        match err {
            ComputeError::Database(db) => ApiError::Database(db),
            ComputeError::InvalidPeriod(_) => ApiError::bad_request("INVALID_PERIOD", err.to_string()),
            ComputeError::InvalidRange { .. } => {
                ApiError::bad_request("INVALID_DATE_RANGE", err.to_string())
            }
            ComputeError::RangeTooLarge { .. } => {
                ApiError::bad_request("RANGE_TOO_LARGE", err.to_string())
            }
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let reasons: Vec<String> = errs
                    .iter()
                    .map(|e| {
                        e.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| e.code.to_string())
                    })
                    .collect();
                format!("{}: {}", field, reasons.join(", "))
            })
            .collect();
        fields.sort();
        ApiError::Validation(format!("Invalid request: {}", fields.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_and_codes() {
        let err = ApiError::bad_request("INVALID_BANK_ACCOUNT", "no such account");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "INVALID_BANK_ACCOUNT");

        let err = ApiError::not_found("Goal", 7);
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "Goal with id 7 not found");

        let err = ApiError::from(AuthError::InvalidSession);
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.code(), "INVALID_SESSION");

        let err = ApiError::Llm("timeout".to_string());
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code(), "LLM_ERROR");
    }

    #[test]
    fn test_compute_errors_are_client_errors() {
        let err = ApiError::from(ComputeError::InvalidPeriod("month 13".to_string()));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "INVALID_PERIOD");
    }
}
