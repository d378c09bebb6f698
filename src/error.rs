//! Application error taxonomy and its HTTP mapping.

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::DbErr;
use thiserror::Error;

use crate::models::response::{ApiResponse, ErrorDetails};
use crate::services::quote_provider::ProviderError;

#[derive(Debug, Error)]
pub enum AppError {
    /// Referenced currency or rate does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Malformed input to a query or manual-entry operation.
    #[error("{message}")]
    Validation { field: String, message: String },

    /// Duplicate rate for a key, or another uniqueness violation.
    #[error("{0}")]
    Conflict(String),

    #[error("Quote provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation { .. } | AppError::Conflict(_) => StatusCode::BAD_REQUEST,
            AppError::Provider(_) => StatusCode::BAD_GATEWAY,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Validation { .. } => "VALIDATION_ERROR",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Provider(_) => "PROVIDER_ERROR",
            AppError::Database(_) => "DATABASE_ERROR",
        }
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        let message = rejection.body_text();
        let field = rejected_field(&message).unwrap_or_else(|| "query".to_string());
        AppError::Validation { field, message }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        let message = rejection.body_text();
        let field = rejected_field(&message).unwrap_or_else(|| "body".to_string());
        AppError::Validation { field, message }
    }
}

/// Field named by a deserialization error, e.g. "missing field `startDate`"
/// or "...: startDate: input is out of range".
fn rejected_field(message: &str) -> Option<String> {
    if let Some((_, rest)) = message.split_once("missing field `") {
        return rest.split('`').next().map(str::to_string);
    }

    message
        .split(": ")
        .skip(1)
        .find(|segment| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
        })
        .map(str::to_string)
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let (message, details) = match &self {
            AppError::Validation { field, message } => (
                "Validation error".to_string(),
                ErrorDetails {
                    code: self.code().to_string(),
                    message: message.clone(),
                    field: Some(field.clone()),
                },
            ),
            AppError::Database(e) => {
                // Do not leak SQL details to callers
                tracing::error!("Database error: {}", e);
                (
                    "An unexpected error occurred. Please try again later.".to_string(),
                    ErrorDetails {
                        code: self.code().to_string(),
                        message: "Database error".to_string(),
                        field: None,
                    },
                )
            }
            other => {
                tracing::warn!("Request failed: {}", other);
                (
                    other.to_string(),
                    ErrorDetails {
                        code: self.code().to_string(),
                        message: other.to_string(),
                        field: None,
                    },
                )
            }
        };

        (status, Json(ApiResponse::<()>::error(message, details))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::validation("rate", "must be positive").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Conflict("dup".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Database(DbErr::Custom("boom".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_rejected_field_from_messages() {
        assert_eq!(
            rejected_field("Failed to deserialize query string: missing field `startDate`"),
            Some("startDate".to_string())
        );
        assert_eq!(
            rejected_field("Failed to deserialize query string: startDate: input is out of range"),
            Some("startDate".to_string())
        );
        assert_eq!(
            rejected_field(
                "Failed to deserialize the JSON body into the target type: rate: invalid type: boolean `true`"
            ),
            Some("rate".to_string())
        );
        assert_eq!(rejected_field("Expected request with `Content-Type: application/json`"), None);
    }

    #[test]
    fn test_validation_display_is_message() {
        let err = AppError::validation("baseCurrencyCode", "must be a 3-letter ISO code");
        assert_eq!(err.to_string(), "must be a 3-letter ISO code");
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }
}
