// src/error.rs
use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde_json::json;

use crate::services::costing::CostingError;
use crate::services::credit::CreditError;
use crate::services::stock::StockError;

#[derive(Debug)]
pub enum AppError {
    DatabaseError(sqlx::Error),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    ValidationError(String),
    Conflict(String),
    InsufficientCredit(String),
    InsufficientStock(String),
    Internal(String),
}

impl AppError {
    pub fn db(err: sqlx::Error) -> Self {
        AppError::from(err)
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        AppError::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        AppError::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::ValidationError(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        AppError::Conflict(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }

    /// Map unique (23505) and foreign key (23503) violations to client errors.
    pub fn from_constraint(err: sqlx::Error, on_unique: &str, on_foreign_key: &str) -> Self {
        if let Some(db_err) = err.as_database_error() {
            match db_err.code().as_deref() {
                Some("23505") => return AppError::conflict(on_unique),
                Some("23503") => return AppError::validation(on_foreign_key),
                _ => {}
            }
        }
        AppError::db(err)
    }

    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::DatabaseError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::ValidationError(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            AppError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            AppError::InsufficientCredit(_) => (StatusCode::UNPROCESSABLE_ENTITY, "insufficient_credit"),
            AppError::InsufficientStock(_) => (StatusCode::UNPROCESSABLE_ENTITY, "insufficient_stock"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let error_message = match self {
            AppError::DatabaseError(e) => {
                tracing::error!(error=%e, "Database error");
                "Database error occurred".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!(%msg, "Internal error");
                "Internal server error".to_string()
            }
            AppError::Unauthorized(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::ValidationError(msg)
            | AppError::Conflict(msg)
            | AppError::InsufficientCredit(msg)
            | AppError::InsufficientStock(msg) => msg,
        };

        let body = Json(json!({
            "error": error_message,
            "code": code,
        }));

        (status, body).into_response()
    }
}

/// SQLSTATEs for serialization failure and deadlock: the transaction was
/// rolled back and the same request can simply be sent again.
fn is_retryable(code: &str) -> bool {
    matches!(code, "40001" | "40P01")
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        let retryable = err
            .as_database_error()
            .and_then(|db_err| db_err.code())
            .is_some_and(|code| is_retryable(&code));
        if retryable {
            tracing::warn!(error=%err, "Transaction aborted by a concurrent update");
            return AppError::conflict("Concurrent update, please retry");
        }
        AppError::DatabaseError(err)
    }
}

impl From<CreditError> for AppError {
    fn from(err: CreditError) -> Self {
        match err {
            CreditError::LimitExceeded { .. } => AppError::InsufficientCredit(err.to_string()),
            CreditError::NonPositiveAmount(_) => AppError::validation(err.to_string()),
        }
    }
}

impl From<StockError> for AppError {
    fn from(err: StockError) -> Self {
        match err {
            StockError::Insufficient { .. } => AppError::InsufficientStock(err.to_string()),
            StockError::NonPositiveQuantity(_) => AppError::validation(err.to_string()),
        }
    }
}

impl From<CostingError> for AppError {
    fn from(err: CostingError) -> Self {
        AppError::validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_get_distinct_codes() {
        let credit: AppError = CreditError::LimitExceeded { limit: 100.0, used: 90.0, requested: 20.0 }.into();
        let stock: AppError = StockError::Insufficient { available: 1.0, requested: 2.0 }.into();
        assert_eq!(credit.status_and_code(), (StatusCode::UNPROCESSABLE_ENTITY, "insufficient_credit"));
        assert_eq!(stock.status_and_code(), (StatusCode::UNPROCESSABLE_ENTITY, "insufficient_stock"));
        assert_eq!(AppError::conflict("x").status_and_code().0, StatusCode::CONFLICT);
    }

    #[test]
    fn deadlocks_and_serialization_failures_are_retryable() {
        assert!(is_retryable("40P01"));
        assert!(is_retryable("40001"));
        assert!(!is_retryable("23505"));
        assert!(!is_retryable("XX000"));
    }

    #[test]
    fn database_errors_hide_details() {
        let resp = AppError::db(sqlx::Error::RowNotFound).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
