//! # Validation Module
//!
//! Query parameter validation for the reporting endpoints.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Extractors (axum Query)                                      │
//! │  └── Type validation (deserialization)                                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Identifier shape (staff_id, company_id)                           │
//! │  └── Limits (activity feed size)                                       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQL                                                           │
//! │  └── Every value is a bound parameter, never interpolated              │
//! │                                                                         │
//! │  Dates are NOT validated here: unparseable dates fall back to the      │
//! │  default range (see `period::DateRange::resolve`).                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::{MAX_ACTIVITY_LIMIT, MAX_IDENTIFIER_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validates an optional identifier filter, normalising blanks to `None`.
///
/// ## Rules
/// - Blank or missing means "no filter"
/// - At most 64 characters
/// - Letters, numbers, hyphens, underscores only
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_identifier;
///
/// assert_eq!(validate_identifier("staff_id", Some(" u-7 ")).unwrap(), Some("u-7".to_string()));
/// assert_eq!(validate_identifier("staff_id", Some("")).unwrap(), None);
/// assert!(validate_identifier("staff_id", Some("1; DROP TABLE")).is_err());
/// ```
pub fn validate_identifier(field: &str, value: Option<&str>) -> ValidationResult<Option<String>> {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };

    if value.len() > MAX_IDENTIFIER_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_IDENTIFIER_LEN,
        });
    }

    if !value
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(Some(value.to_string()))
}

/// Validates the activity feed limit, applying `default` when absent.
pub fn validate_limit(limit: Option<i64>, default: i64) -> ValidationResult<i64> {
    let limit = limit.unwrap_or(default);
    if !(1..=MAX_ACTIVITY_LIMIT).contains(&limit) {
        return Err(ValidationError::OutOfRange {
            field: "limit".to_string(),
            min: 1,
            max: MAX_ACTIVITY_LIMIT,
        });
    }
    Ok(limit)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("staff_id", None).unwrap().is_none());
        assert!(validate_identifier("staff_id", Some("   ")).unwrap().is_none());
        assert_eq!(
            validate_identifier("staff_id", Some("550e8400-e29b")).unwrap().as_deref(),
            Some("550e8400-e29b")
        );
        assert!(validate_identifier("staff_id", Some(&"a".repeat(65))).is_err());
        assert!(validate_identifier("company_id", Some("c'1")).is_err());
    }

    #[test]
    fn test_validate_limit() {
        assert_eq!(validate_limit(None, 50).unwrap(), 50);
        assert_eq!(validate_limit(Some(10), 50).unwrap(), 10);
        assert!(validate_limit(Some(0), 50).is_err());
        assert!(validate_limit(Some(10_000), 50).is_err());
    }
}
