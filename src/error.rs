//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    extract::rejection::{FormRejection, JsonRejection, PathRejection, QueryRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::models::order::OrderStatus;

/// Application-wide error type.
///
/// Every variant is a deterministic rejection except `Database`, which is the
/// only transient class. None of them are retried by the core.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed (e.g., connection error, query error).
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Token missing, invalid, expired, of the wrong actor kind, or its actor is gone.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Could not validate credentials")]
    Unauthenticated,

    /// Login failed. Wrong password and unknown email are indistinguishable.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("Incorrect username or password")]
    InvalidCredentials,

    /// Authenticated as the right kind but not the owner of the resource.
    ///
    /// Returns HTTP 403 Forbidden.
    #[error("{0}")]
    Forbidden(String),

    /// Referenced entity does not exist.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("{0}")]
    NotFound(String),

    /// Uniqueness violation (duplicate dish line, category name, favorite, email).
    ///
    /// Returns HTTP 409 Conflict.
    #[error("{0}")]
    Conflict(String),

    /// Request body or parameters are malformed.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("{0}")]
    Validation(String),

    /// Status change that skips or reverses the order lifecycle.
    ///
    /// Returns HTTP 422 Unprocessable Entity.
    #[error("Cannot change order status from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// Unrecoverable server-side failure (signing, hashing).
    ///
    /// Returns HTTP 500; the message is logged, never sent.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(what: &str) -> Self {
        AppError::NotFound(format!("{what} not found"))
    }

    /// Stable machine-readable code used in the response body.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Database(_) | AppError::Internal(_) => "internal_error",
            AppError::Unauthenticated => "unauthenticated",
            AppError::InvalidCredentials => "invalid_credentials",
            AppError::Forbidden(_) => "forbidden",
            AppError::NotFound(_) => "not_found",
            AppError::Conflict(_) => "conflict",
            AppError::Validation(_) => "validation_error",
            AppError::InvalidTransition { .. } => "invalid_transition",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::InvalidCredentials | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::InvalidTransition { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

// Extractor rejections carry serde detail; it is logged, not returned.

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(error = %rejection, "rejected JSON body");
        let reason = match rejection {
            JsonRejection::MissingJsonContentType(_) => "Expected an application/json body",
            JsonRejection::JsonSyntaxError(_) => "Request body is not valid JSON",
            JsonRejection::JsonDataError(_) => "Request body has missing or invalid fields",
            _ => "Could not read request body",
        };
        AppError::Validation(reason.to_string())
    }
}

impl From<FormRejection> for AppError {
    fn from(rejection: FormRejection) -> Self {
        tracing::debug!(error = %rejection, "rejected form body");
        let reason = match rejection {
            FormRejection::InvalidFormContentType(_) => {
                "Expected an application/x-www-form-urlencoded body"
            }
            _ => "Form body has missing or invalid fields",
        };
        AppError::Validation(reason.to_string())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        tracing::debug!(error = %rejection, "rejected query string");
        AppError::Validation("Query string has missing or invalid parameters".to_string())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        tracing::debug!(error = %rejection, "rejected path parameters");
        AppError::Validation("Invalid path parameter".to_string())
    }
}

/// Convert AppError into an HTTP response.
///
/// # Response Format
///
/// ```json
/// {
///   "error": {
///     "status": 404,
///     "code": "not_found",
///     "reason": "Order not found"
///   }
/// }
/// ```
///
/// Server-side failures are logged and replaced by a generic reason so that no
/// SQL or internal detail reaches the client.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let reason = match &self {
            AppError::Database(e) => {
                tracing::error!(error = %e, "database error");
                "An internal error occurred".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": {
                "status": status.as_u16(),
                "code": self.code(),
                "reason": reason
            }
        }));

        if matches!(self, AppError::Unauthenticated) {
            return (status, [(header::WWW_AUTHENTICATE, "Bearer")], body).into_response();
        }

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_variants_to_status_codes() {
        assert_eq!(AppError::Unauthenticated.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::Forbidden("nope".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(AppError::not_found("Order").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::Conflict("dup".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::InvalidTransition {
                from: OrderStatus::Completed,
                to: OrderStatus::Pending
            }
            .status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn unauthenticated_response_carries_bearer_challenge() {
        let response = AppError::Unauthenticated.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Bearer"
        );
    }

    #[test]
    fn internal_errors_hide_details() {
        let err = AppError::Internal("signing key rejected".into());
        assert_eq!(err.code(), "internal_error");
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
