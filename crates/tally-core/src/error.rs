//! # Error Types
//!
//! Domain-specific error types for tally-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tally-core errors (this file)                                         │
//! │  ├── CoreError        - Reporting rule failures                        │
//! │  └── ValidationError  - Query parameter validation failures            │
//! │                                                                         │
//! │  tally-db errors (separate crate)                                      │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  HTTP errors (in analytics-api)                                        │
//! │  └── ApiError         - What the dashboard sees ({success:false,...})  │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ApiError → JSON envelope          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (field, value)
//! 3. Errors are enum variants, never String
//! 4. Schema drift is NOT an error: it never reaches these types

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core reporting errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The request carries no tenant.
    ///
    /// ## When This Occurs
    /// - Identity resolved but the user has no company association
    /// - A system admin called a tenant report without naming a company
    #[error("Company association required")]
    MissingTenantContext,

    /// A date range runs backwards.
    #[error("Invalid date range: {from} is after {to}")]
    InvertedDateRange { from: String, to: String },

    /// A date parsed but lies where reports cannot reach.
    ///
    /// ## When This Occurs
    /// - `date_to` is more than a year past today
    /// - Either date falls outside years 1-9999
    #[error("{field} {value} is out of range")]
    DateOutOfRange { field: String, value: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when query parameters don't meet requirements.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Invalid format (e.g., invalid identifier).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            CoreError::MissingTenantContext.to_string(),
            "Company association required"
        );

        let err = CoreError::InvertedDateRange {
            from: "2025-12-01".to_string(),
            to: "2025-11-01".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid date range: 2025-12-01 is after 2025-11-01"
        );
    }

    #[test]
    fn test_out_of_range_message() {
        let err = CoreError::DateOutOfRange {
            field: "date_to".to_string(),
            value: "9999-12-31".to_string(),
        };
        assert_eq!(err.to_string(), "date_to 9999-12-31 is out of range");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "company_id".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
