//! # Validation Module
//!
//! Write-boundary validation for markup rules and catalog inputs.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                          │
//! │                                                                 │
//! │  Layer 1: Repository write boundary (Rust)                      │
//! │  └── THIS MODULE: business rule validation                      │
//! │           │                                                     │
//! │           ▼                                                     │
//! │  Layer 2: Database (SQLite)                                     │
//! │  ├── CHECK constraints (purchase_price >= 0, profit order)      │
//! │  └── Partial unique index (one active rule per scope)           │
//! │                                                                 │
//! │  A rule that would divide by zero in the MRP pipeline is        │
//! │  rejected HERE and never reaches the deriver.                   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::types::{MarkupParameters, ProfitRange, ScopeKey};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Percentage Validators
// =============================================================================

/// Validates a percentage that ends up as a `1 - pct/100` divisor.
///
/// ## Rules
/// - Must be at least 0
/// - Must be strictly below 100 (exactly 100 divides by zero)
pub fn validate_divisor_percentage(field: &str, value: f64) -> ValidationResult<()> {
    if !(0.0..100.0).contains(&value) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0.0,
            max: 100.0,
        });
    }
    Ok(())
}

/// Validates the showroom-profit band.
///
/// ## Rules
/// - Both ends within `[0, 100)`
/// - `minimum <= maximum` (equality is a valid single-point band)
pub fn validate_profit_range(range: &ProfitRange) -> ValidationResult<()> {
    validate_divisor_percentage("showroom_profit.minimum", range.minimum)?;
    validate_divisor_percentage("showroom_profit.maximum", range.maximum)?;

    if range.minimum > range.maximum {
        return Err(ValidationError::InvertedRange {
            field: "showroom_profit".to_string(),
            minimum: range.minimum,
            maximum: range.maximum,
        });
    }

    Ok(())
}

/// Validates a full markup-parameter set before it is persisted.
///
/// ## Example
/// ```rust
/// use timber_core::validation::validate_markup_parameters;
/// use timber_core::{MarkupParameters, ProfitRange};
///
/// let ok = MarkupParameters::new(50.0, 10.0, 5.0, 5.0, ProfitRange::new(20.0, 40.0));
/// assert!(validate_markup_parameters(&ok).is_ok());
///
/// let inverted = MarkupParameters::new(50.0, 10.0, 5.0, 5.0, ProfitRange::new(40.0, 20.0));
/// assert!(validate_markup_parameters(&inverted).is_err());
/// ```
pub fn validate_markup_parameters(params: &MarkupParameters) -> ValidationResult<()> {
    if params.bill_percentage < 0.0 {
        return Err(ValidationError::MustBeNonNegative {
            field: "bill_percentage".to_string(),
        });
    }

    validate_divisor_percentage("skim_percentage", params.skim_percentage)?;
    validate_divisor_percentage("broker_commission", params.broker_commission)?;
    validate_divisor_percentage("discount_percentage", params.discount_percentage)?;
    validate_profit_range(&params.showroom_profit)?;

    if !(0.0..=100.0).contains(&params.tax_rate) {
        return Err(ValidationError::OutOfRange {
            field: "tax_rate".to_string(),
            min: 0.0,
            max: 100.0,
        });
    }

    if params.internal_profit < 0.0 {
        return Err(ValidationError::MustBeNonNegative {
            field: "internal_profit".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a purchase price before an item write.
///
/// ## Rules
/// - Must be non-negative; zero is allowed (price not yet sourced)
pub fn validate_purchase_price(price: f64) -> ValidationResult<()> {
    if !price.is_finite() || price < 0.0 {
        return Err(ValidationError::MustBeNonNegative {
            field: "purchase_price".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Identifier Validators
// =============================================================================

/// Validates a single id component (non-empty, UUID v4 format).
pub fn validate_id(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

/// Validates every id component of a scope key.
pub fn validate_scope(scope: &ScopeKey) -> ValidationResult<()> {
    validate_id("company_id", &scope.company_id)?;
    validate_id("category_id", &scope.category_id)?;
    validate_id(scope.material.scope_field(), &scope.scope_ref)?;
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Material;

    fn valid_params() -> MarkupParameters {
        MarkupParameters::new(50.0, 10.0, 5.0, 5.0, ProfitRange::new(20.0, 40.0))
    }

    #[test]
    fn test_validate_divisor_percentage() {
        assert!(validate_divisor_percentage("skim", 0.0).is_ok());
        assert!(validate_divisor_percentage("skim", 99.99).is_ok());

        assert!(validate_divisor_percentage("skim", 100.0).is_err());
        assert!(validate_divisor_percentage("skim", 150.0).is_err());
        assert!(validate_divisor_percentage("skim", -1.0).is_err());
    }

    #[test]
    fn test_validate_profit_range() {
        assert!(validate_profit_range(&ProfitRange::new(20.0, 40.0)).is_ok());
        // Single-point band is valid
        assert!(validate_profit_range(&ProfitRange::new(25.0, 25.0)).is_ok());

        assert!(validate_profit_range(&ProfitRange::new(40.0, 20.0)).is_err());
        assert!(validate_profit_range(&ProfitRange::new(20.0, 100.0)).is_err());
    }

    #[test]
    fn test_validate_markup_parameters() {
        assert!(validate_markup_parameters(&valid_params()).is_ok());

        let mut bad = valid_params();
        bad.skim_percentage = 100.0;
        assert!(validate_markup_parameters(&bad).is_err());

        let mut bad = valid_params();
        bad.bill_percentage = -5.0;
        assert!(validate_markup_parameters(&bad).is_err());

        let mut bad = valid_params();
        bad.tax_rate = 101.0;
        assert!(validate_markup_parameters(&bad).is_err());
    }

    #[test]
    fn test_validate_purchase_price() {
        assert!(validate_purchase_price(0.0).is_ok());
        assert!(validate_purchase_price(1234.56).is_ok());

        assert!(validate_purchase_price(-1.0).is_err());
        assert!(validate_purchase_price(f64::NAN).is_err());
        assert!(validate_purchase_price(f64::INFINITY).is_err());
    }

    #[test]
    fn test_validate_scope() {
        let scope = ScopeKey::new(
            "550e8400-e29b-41d4-a716-446655440000",
            "550e8400-e29b-41d4-a716-446655440001",
            Material::Plywood,
            "550e8400-e29b-41d4-a716-446655440002",
        );
        assert!(validate_scope(&scope).is_ok());

        let bad = ScopeKey::new("not-a-uuid", "x", Material::Plywood, "y");
        assert!(validate_scope(&bad).is_err());
    }
}
