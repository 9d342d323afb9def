//! Unified error handling with Sentry integration.
//!
//! Every order operation returns `Result<T, AppError>`. The error carries a
//! machine-checkable [`ErrorKind`] and renders as a JSON body:
//!
//! ```json
//! {"kind": "not_found", "message": "Item(s) not found or inactive: 3, 7"}
//! ```
//!
//! Server-side failures are captured to Sentry before responding, and raw
//! storage errors never reach the client. Constraint violations are the one
//! exception: they carry a structured `detail` with the constraint name and
//! the database's detail line.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::db::{ConstraintViolation, RepositoryError};

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed or duplicate input.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// A referenced person, contact, item or order does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A referenced contact belongs to a different person.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Well-formed input that makes no sense as a whole.
    #[error("Unprocessable entity: {0}")]
    UnprocessableEntity(String),

    /// Storage operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Machine-checkable error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    BadRequest,
    NotFound,
    Conflict,
    UnprocessableEntity,
    TransientStorageConflict,
    Internal,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    kind: ErrorKind,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<ConstraintViolation>,
}

impl AppError {
    /// The error's category.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::BadRequest(_)
            | Self::Database(RepositoryError::Constraint(_) | RepositoryError::InvalidValue(_)) => {
                ErrorKind::BadRequest
            }
            Self::NotFound(_) | Self::Database(RepositoryError::NotFound) => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::UnprocessableEntity(_) => ErrorKind::UnprocessableEntity,
            Self::Database(RepositoryError::Transient { .. }) => {
                ErrorKind::TransientStorageConflict
            }
            Self::Database(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::UnprocessableEntity => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::TransientStorageConflict => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether re-running the whole operation may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self.kind(), ErrorKind::TransientStorageConflict)
    }

    /// Client-safe message.
    fn public_message(&self) -> String {
        match self {
            Self::BadRequest(msg)
            | Self::NotFound(msg)
            | Self::Conflict(msg)
            | Self::UnprocessableEntity(msg) => msg.clone(),
            Self::Database(RepositoryError::Transient { .. }) => {
                "Storage conflict with a concurrent request, please retry".to_owned()
            }
            Self::Database(RepositoryError::Constraint(_)) => {
                "Request violates a data constraint".to_owned()
            }
            Self::Database(RepositoryError::InvalidValue(_)) => {
                "Request contains a value that cannot be stored".to_owned()
            }
            Self::Database(RepositoryError::NotFound) => "Not found".to_owned(),
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_owned(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let kind = self.kind();

        // Capture server errors to Sentry
        match kind {
            ErrorKind::Internal => {
                let event_id = sentry::capture_error(&self);
                tracing::error!(
                    error = %self,
                    sentry_event_id = %event_id,
                    "Request error"
                );
            }
            ErrorKind::TransientStorageConflict => {
                tracing::warn!(error = %self, "Request failed on storage conflict");
            }
            _ => {}
        }

        let detail = match &self {
            Self::Database(RepositoryError::Constraint(violation)) => Some(violation.clone()),
            _ => None,
        };

        let body = ErrorBody {
            kind,
            message: self.public_message(),
            detail,
        };

        (self.status(), Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::ConflictClass;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("Person 999 not found".to_string());
        assert_eq!(err.to_string(), "Not found: Person 999 not found");

        let err = AppError::BadRequest("duplicate items".to_string());
        assert_eq!(err.to_string(), "Bad request: duplicate items");
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            err.into_response().status()
        }

        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Conflict("test".to_string())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AppError::UnprocessableEntity("test".to_string())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            get_status(AppError::Database(RepositoryError::transient(
                ConflictClass::DeadlockDetected
            ))),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_only_storage_conflicts_are_transient() {
        assert!(
            AppError::Database(RepositoryError::transient(ConflictClass::QueryCanceled))
                .is_transient()
        );
        assert!(!AppError::Conflict("test".to_string()).is_transient());
        assert!(!AppError::Database(RepositoryError::NotFound).is_transient());
        assert!(!AppError::Database(RepositoryError::DataCorruption("x".to_string())).is_transient());
    }

    #[tokio::test]
    async fn test_body_carries_kind_and_message() {
        let (status, body) = body_json(AppError::UnprocessableEntity(
            "delivery_date must not be before order_date".to_string(),
        ))
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["kind"], "unprocessable_entity");
        assert_eq!(
            body["message"],
            "delivery_date must not be before order_date"
        );
        assert!(body.get("detail").is_none());
    }

    #[tokio::test]
    async fn test_rejected_value_is_bad_request_without_driver_text() {
        let err = AppError::Database(RepositoryError::InvalidValue(
            "value too long for type character varying(64)".to_string(),
        ));
        assert!(!err.is_transient());

        let (status, body) = body_json(err).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "bad_request");
        assert_eq!(body["message"], "Request contains a value that cannot be stored");
    }

    #[tokio::test]
    async fn test_constraint_violation_exposes_safe_detail() {
        let err = AppError::Database(RepositoryError::Constraint(ConstraintViolation {
            constraint: Some("orders_order_number_key".to_string()),
            detail: Some("Key (order_number)=(PO-1) already exists.".to_string()),
        }));

        let (status, body) = body_json(err).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "bad_request");
        assert_eq!(body["detail"]["constraint"], "orders_order_number_key");
        assert_eq!(
            body["detail"]["detail"],
            "Key (order_number)=(PO-1) already exists."
        );
    }

    #[tokio::test]
    async fn test_internal_errors_hide_details() {
        let err = AppError::Database(RepositoryError::DataCorruption(
            "secret table layout".to_string(),
        ));

        let (status, body) = body_json(err).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["kind"], "internal");
        assert_eq!(body["message"], "Internal server error");
    }
}
