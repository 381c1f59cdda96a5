//! Common API types and utilities

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;
use utoipa::ToSchema;

use lf_entitlement::EntitlementError;

/// Standard API error response
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiError {
    pub error: String,
    pub message: String,
}

/// Response wrapper turning [`EntitlementError`] into an HTTP status plus
/// an [`ApiError`] body. Handlers return `Result<_, ApiFailure>` and rely
/// on `?` conversion.
#[derive(Debug)]
pub struct ApiFailure(pub EntitlementError);

impl From<EntitlementError> for ApiFailure {
    fn from(err: EntitlementError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let (status, code) = match &self.0 {
            EntitlementError::CourseNotFound { .. }
            | EntitlementError::SeriesNotFound { .. }
            | EntitlementError::LedgerEntryNotFound { .. }
            | EntitlementError::AccountNotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            EntitlementError::DuplicatePurchase { .. }
            | EntitlementError::AccountExists { .. }
            | EntitlementError::InvalidTransition { .. } => (StatusCode::CONFLICT, "CONFLICT"),
            EntitlementError::MissingSourceEntry { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "MISSING_SOURCE")
            }
            EntitlementError::Validation { .. } => (StatusCode::BAD_REQUEST, "VALIDATION"),
            EntitlementError::Database(e) => {
                error!(error = %e, "database error serving request");
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL")
            }
        };

        let message = match &self.0 {
            // Never leak driver-level details to clients
            EntitlementError::Database(_) => "internal storage error".to_string(),
            other => other.to_string(),
        };

        (
            status,
            Json(ApiError {
                error: code.to_string(),
                message,
            }),
        )
            .into_response()
    }
}
