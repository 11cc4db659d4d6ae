//! HTTP handlers.
//!
//! Handlers stay thin: they resolve the request context, open a
//! [`ReportSession`](crate::services::ReportSession) and hand over to a
//! service.

pub mod analytics;
pub mod health;

use crate::error::ApiError;

/// Unknown routes get the JSON envelope too.
pub async fn not_found() -> ApiError {
    ApiError::NotFound
}
