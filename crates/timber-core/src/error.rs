//! # Error Types
//!
//! Domain-specific error types for timber-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         Error Types                             │
//! │                                                                 │
//! │  timber-core errors (this file)                                 │
//! │  ├── PricingError     - MRP pipeline failures                   │
//! │  └── ValidationError  - Markup rule / input rejections          │
//! │                                                                 │
//! │  timber-db errors (separate crate)                              │
//! │  └── DbError          - Database operation failures             │
//! │                                                                 │
//! │  Flow: ValidationError → rejected at the write boundary         │
//! │        PricingError    → surfaced per item by the cascade       │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (field name, offending value)
//! 3. Errors are enum variants, never String

use thiserror::Error;

// =============================================================================
// Pricing Error
// =============================================================================

/// MRP derivation failures.
///
/// The deriver itself has exactly one failure mode: a percentage that would
/// put a zero in a denominator. Everything else (missing rule, zero purchase
/// price) is a valid input with a defined output.
#[derive(Debug, Error)]
pub enum PricingError {
    /// A markup percentage of exactly 100 would divide by zero in the
    /// price pipeline (`x / (1 - 100/100)`).
    ///
    /// ## When This Occurs
    /// Only when a rule bypassed write-boundary validation, e.g. a row
    /// edited outside the application. The cascade records this as a
    /// per-item failure instead of storing `inf`/`NaN`.
    #[error("invalid markup parameter {field} = {value}: divides by zero in the MRP pipeline")]
    InvalidMarkupParameter { field: &'static str, value: f64 },
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when a markup rule or catalog input doesn't meet requirements.
/// Rejected at the write boundary, before any derivation runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be at least {min} and below {max}")]
    OutOfRange { field: String, min: f64, max: f64 },

    /// Value must be zero or positive.
    #[error("{field} must not be negative")]
    MustBeNonNegative { field: String },

    /// A minimum/maximum pair is inverted.
    #[error("{field}: minimum {minimum} exceeds maximum {maximum}")]
    InvertedRange {
        field: String,
        minimum: f64,
        maximum: f64,
    },

    /// Invalid format (e.g., invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with PricingError.
pub type PricingResult<T> = Result<T, PricingError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pricing_error_message() {
        let err = PricingError::InvalidMarkupParameter {
            field: "skim_percentage",
            value: 100.0,
        };
        assert_eq!(
            err.to_string(),
            "invalid markup parameter skim_percentage = 100: divides by zero in the MRP pipeline"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "company_id".to_string(),
        };
        assert_eq!(err.to_string(), "company_id is required");

        let err = ValidationError::InvertedRange {
            field: "showroom_profit".to_string(),
            minimum: 40.0,
            maximum: 20.0,
        };
        assert_eq!(
            err.to_string(),
            "showroom_profit: minimum 40 exceeds maximum 20"
        );
    }
}
