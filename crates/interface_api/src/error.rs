//! API error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use domain_ledger::LedgerError;
use domain_pos::{CheckoutError, SessionError};
use infra_db::{DatabaseError, RepositoryError};

use crate::auth::AuthError;

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Request was well-formed but a business rule rejected it
    #[error("Rejected: {0}")]
    Rejected(String),

    #[error("Invalid request body")]
    InvalidBody(Vec<String>),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message, details) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Unauthorized".to_string(),
                None,
            ),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg, None),
            ApiError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg, None)
            }
            ApiError::Database(msg) => {
                error!(%msg, "database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "database_error",
                    "Database error".to_string(),
                    None,
                )
            }
            ApiError::Validation(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "validation_error", msg, None)
            }
            ApiError::Rejected(msg) => (StatusCode::UNPROCESSABLE_ENTITY, "rejected", msg, None),
            ApiError::InvalidBody(details) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                "Invalid request body".to_string(),
                Some(details),
            ),
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message,
            details,
        };

        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::Database(err.to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidToken | AuthError::TokenExpired => ApiError::Unauthorized,
            AuthError::MissingPermission(_) => ApiError::Forbidden(err.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut details = Vec::new();
        collect_validation_errors("", &errors, &mut details);
        details.sort();
        ApiError::InvalidBody(details)
    }
}

/// Flattens nested validation errors into `path: message` lines
fn collect_validation_errors(
    prefix: &str,
    errors: &validator::ValidationErrors,
    out: &mut Vec<String>,
) {
    use validator::ValidationErrorsKind;

    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(errs) => {
                out.extend(errs.iter().map(|e| match &e.message {
                    Some(msg) => format!("{path}: {msg}"),
                    None => format!("{path}: {}", e.code),
                }));
            }
            ValidationErrorsKind::Struct(nested) => collect_validation_errors(&path, nested, out),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    collect_validation_errors(&format!("{path}[{index}]"), nested, out);
                }
            }
        }
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        let msg = err.to_string();
        match err {
            LedgerError::EntryNotFound(_) | LedgerError::AccountNotFound(_) => {
                ApiError::NotFound(msg)
            }
            LedgerError::AlreadyGenerated { .. }
            | LedgerError::AlreadyPosted(_)
            | LedgerError::NotPosted(_)
            | LedgerError::NotReversible(_)
            | LedgerError::AlreadyReversed { .. }
            | LedgerError::NotDraft { .. }
            | LedgerError::AccountAlreadyExists(_) => ApiError::Conflict(msg),
            LedgerError::Unbalanced { .. }
            | LedgerError::MissingMapping { .. }
            | LedgerError::EmptyEntry
            | LedgerError::InvalidLine(_)
            | LedgerError::Money(_) => ApiError::Rejected(msg),
        }
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        let msg = err.to_string();
        match err {
            CheckoutError::PriceOverrideDenied { .. }
            | CheckoutError::DiscountCapExceeded { .. }
            | CheckoutError::DailyDiscountLimitExceeded { .. } => ApiError::Forbidden(msg),
            CheckoutError::NoActiveSession { .. } => ApiError::Conflict(msg),
            CheckoutError::EmptyCart
            | CheckoutError::InvalidQuantity { .. }
            | CheckoutError::ProductNotFound(_)
            | CheckoutError::InvalidPriceOverride { .. }
            | CheckoutError::InvalidPaymentAmount(_)
            | CheckoutError::CurrencyMismatch { .. } => ApiError::Rejected(msg),
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        let msg = err.to_string();
        match err {
            SessionError::SessionAlreadyOpen { .. } | SessionError::SessionNotOpen(_) => {
                ApiError::Conflict(msg)
            }
            SessionError::InvalidAmount(_) => ApiError::Rejected(msg),
        }
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        let msg = err.to_string();
        match err {
            DatabaseError::NotFound(detail) => ApiError::NotFound(detail),
            DatabaseError::DuplicateEntry(_) => ApiError::Conflict(msg),
            DatabaseError::ForeignKeyViolation(_)
            | DatabaseError::ConstraintViolation(_) => ApiError::Rejected(msg),
            _ => ApiError::Database(msg),
        }
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Ledger(e) => e.into(),
            RepositoryError::Checkout(e) => e.into(),
            RepositoryError::Session(e) => e.into(),
            RepositoryError::Temporal(e) => ApiError::Internal(e.to_string()),
            RepositoryError::Database(e) => e.into(),
        }
    }
}
