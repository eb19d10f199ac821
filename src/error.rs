//! Error types for the Biblio server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

/// Numeric application error codes exposed to API clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Success = 0,
    Failure = 1,
    DbFailure = 2,
    NoSuchData = 3,
    NoAvailableCopy = 4,
    InvalidState = 5,
    DuplicateReservation = 6,
    CopyAvailable = 7,
    Forbidden = 8,
    EmptyCart = 9,
    CopyInUse = 10,
    CheckoutFailed = 11,
    TransactionConflict = 12,
    BadValue = 13,
}

/// One book that could not be checked out, with the reason
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FailedBook {
    pub book_id: Uuid,
    pub book_title: String,
    pub reason: String,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("No available copy: {0}")]
    NoAvailableCopy(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Duplicate reservation: {0}")]
    DuplicateReservation(String),

    #[error("Copy available: {0}")]
    CopyAvailable(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Copy in use: {0}")]
    CopyInUse(String),

    #[error("Checkout failed for {} book(s)", .0.len())]
    CheckoutFailed(Vec<FailedBook>),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_books: Option<Vec<FailedBook>>,
}

/// Postgres SQLSTATE codes signalling a retryable transaction conflict
/// (serialization failure, deadlock, lock-not-available).
fn is_transaction_conflict(err: &sqlx::Error) -> bool {
    matches!(
        err.as_database_error().and_then(|e| e.code()).as_deref(),
        Some("40001") | Some("40P01") | Some("55P03")
    )
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut failed_books = None;

        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorCode::NoSuchData, msg.clone()),
            AppError::NoAvailableCopy(msg) => {
                (StatusCode::CONFLICT, ErrorCode::NoAvailableCopy, msg.clone())
            }
            AppError::InvalidState(msg) => {
                (StatusCode::CONFLICT, ErrorCode::InvalidState, msg.clone())
            }
            AppError::DuplicateReservation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorCode::DuplicateReservation,
                msg.clone(),
            ),
            AppError::CopyAvailable(msg) => {
                (StatusCode::BAD_REQUEST, ErrorCode::CopyAvailable, msg.clone())
            }
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, ErrorCode::Forbidden, msg.clone()),
            AppError::EmptyCart => (
                StatusCode::BAD_REQUEST,
                ErrorCode::EmptyCart,
                "Cart is empty".to_string(),
            ),
            AppError::CopyInUse(msg) => (StatusCode::CONFLICT, ErrorCode::CopyInUse, msg.clone()),
            AppError::CheckoutFailed(books) => {
                failed_books = Some(books.clone());
                (
                    StatusCode::CONFLICT,
                    ErrorCode::CheckoutFailed,
                    "Checkout failed - some books are not available".to_string(),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone()),
            AppError::Database(e) if is_transaction_conflict(e) => {
                tracing::warn!("Transaction conflict: {:?}", e);
                (
                    StatusCode::CONFLICT,
                    ErrorCode::TransactionConflict,
                    "Transaction conflict, retry the operation".to_string(),
                )
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::DbFailure,
                    "Database error".to_string(),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::Failure,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
            failed_books,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkout_failed_message_counts_books() {
        let err = AppError::CheckoutFailed(vec![FailedBook {
            book_id: Uuid::new_v4(),
            book_title: "Dune".to_string(),
            reason: "No available copies".to_string(),
        }]);
        assert_eq!(err.to_string(), "Checkout failed for 1 book(s)");
    }

    #[test]
    fn plain_io_error_is_not_a_conflict() {
        let err = sqlx::Error::PoolTimedOut;
        assert!(!is_transaction_conflict(&err));
    }
}
