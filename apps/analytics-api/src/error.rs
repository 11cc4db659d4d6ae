//! Error types for the Analytics API.
//!
//! Every failure, whichever layer raised it, leaves the server as the same
//! JSON envelope:
//!
//! ```text
//! { "success": false, "error": "<message>" }
//!
//! Unauthenticated          → 401  "Authentication required"
//! MissingTenantContext     → 400  "Company association required"
//! Validation / bad range   → 400  message of the ValidationError or CoreError
//! Unknown route            → 404  "Not found"
//! Primary query failure    → 500  "Internal server error" (details logged)
//! ```

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use tally_core::{CoreError, ValidationError};
use tally_db::DbError;

/// Analytics API errors.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Company association required")]
    MissingTenant,

    #[error("{0}")]
    BadRequest(String),

    #[error("Not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::MissingTenant | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Database(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to the client. Server-side failures stay generic.
    fn public_message(&self) -> String {
        match self {
            ApiError::Database(_) | ApiError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(error: CoreError) -> Self {
        match error {
            CoreError::MissingTenantContext => ApiError::MissingTenant,
            CoreError::Validation(inner) => ApiError::from(inner),
            other @ (CoreError::InvertedDateRange { .. } | CoreError::DateOutOfRange { .. }) => {
                ApiError::BadRequest(other.to_string())
            }
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(error: ValidationError) -> Self {
        ApiError::BadRequest(error.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }

        let body = json!({
            "success": false,
            "error": self.public_message(),
        });
        (status, Json(body)).into_response()
    }
}

/// Convenience type alias for handler results.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::from(CoreError::MissingTenantContext).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(DbError::QueryFailed("boom".to_string())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let err = ApiError::from(DbError::QueryFailed("no such column: secret".to_string()));
        assert_eq!(err.public_message(), "Internal server error");

        let err = ApiError::from(ValidationError::TooLong {
            field: "staff_id".to_string(),
            max: 64,
        });
        assert_eq!(err.public_message(), "staff_id must be at most 64 characters");
    }
}
