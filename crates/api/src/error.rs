//! API error types with HTTP response mapping.

use analytics::AnalyticsError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::{DomainError, ErrorKind};

/// API-level error type that maps to HTTP responses.
///
/// Every domain [`ErrorKind`] gets its own status or body `kind`, so a client
/// can tell a lost claim from a wrong code from a stale request.
#[derive(Debug)]
pub enum ApiError {
    /// No usable identity headers.
    Unauthenticated(String),
    /// Authenticated, but missing the role or the relationship.
    Forbidden(String),
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Domain logic error.
    Domain(DomainError),
    /// Analytics query error.
    Analytics(AnalyticsError),
    /// Internal server error.
    Internal(String),
}

impl ApiError {
    fn parts(self) -> (StatusCode, &'static str, String) {
        match self {
            ApiError::Unauthenticated(msg) => (StatusCode::UNAUTHORIZED, "unauthenticated", msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, ErrorKind::Unauthorized.as_str(), msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorKind::NotFound.as_str(), msg),
            ApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, ErrorKind::Validation.as_str(), msg)
            }
            ApiError::Domain(err) => domain_error_parts(err),
            ApiError::Analytics(err) => analytics_error_parts(err),
            ApiError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorKind::Internal.as_str(), msg)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, message) = self.parts();
        if status.is_server_error() {
            tracing::error!(error = %message, "internal server error");
        }

        let body = serde_json::json!({ "error": message, "kind": kind });
        (status, axum::Json(body)).into_response()
    }
}

fn domain_error_parts(err: DomainError) -> (StatusCode, &'static str, String) {
    let kind = err.kind();
    let status = match kind {
        ErrorKind::Unauthorized => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::InvalidTransition => StatusCode::CONFLICT,
        ErrorKind::ClaimConflict => StatusCode::CONFLICT,
        ErrorKind::CodeMismatch => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let message = match kind {
        ErrorKind::ClaimConflict => "order already taken".to_string(),
        _ => err.to_string(),
    };
    (status, kind.as_str(), message)
}

fn analytics_error_parts(err: AnalyticsError) -> (StatusCode, &'static str, String) {
    match &err {
        AnalyticsError::InvalidWindow { .. } => (
            StatusCode::BAD_REQUEST,
            ErrorKind::Validation.as_str(),
            err.to_string(),
        ),
        AnalyticsError::Projection(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::Internal.as_str(),
            err.to_string(),
        ),
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl From<AnalyticsError> for ApiError {
    fn from(err: AnalyticsError) -> Self {
        ApiError::Analytics(err)
    }
}

impl From<ledger::LedgerError> for ApiError {
    fn from(err: ledger::LedgerError) -> Self {
        ApiError::Internal(err.to_string())
    }
}
