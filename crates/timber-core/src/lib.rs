//! # timber-core: Pure Pricing Logic for TimberBooks
//!
//! This crate is the **heart** of the TimberBooks pricing backend. It contains
//! the MRP derivation pipeline and its surrounding rules as pure functions
//! with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                    TimberBooks Architecture                         │
//! │                                                                     │
//! │  Catalog mutation / markup-rule endpoints (external)                │
//! │                           │                                         │
//! │  ┌────────────────────────▼───────────────────────────────────┐     │
//! │  │                      timber-db                             │     │
//! │  │   repositories + RecalculationCascade (read, recompute,    │     │
//! │  │   persist, report per-item outcomes)                       │     │
//! │  └────────────────────────┬───────────────────────────────────┘     │
//! │                           │ calls                                   │
//! │  ┌────────────────────────▼───────────────────────────────────┐     │
//! │  │               ★ timber-core (THIS CRATE) ★                 │     │
//! │  │                                                            │     │
//! │  │   ┌──────────┐  ┌──────────┐  ┌────────────┐  ┌─────────┐  │     │
//! │  │   │  types   │  │ pricing  │  │ validation │  │  error  │  │     │
//! │  │   │ ScopeKey │  │  derive  │  │   rules    │  │ typed   │  │     │
//! │  │   │ MrpValue │  │  ladder  │  │   checks   │  │ enums   │  │     │
//! │  │   └──────────┘  └──────────┘  └────────────┘  └─────────┘  │     │
//! │  └────────────────────────────────────────────────────────────┘     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Example
//! ```rust
//! use timber_core::pricing::derive;
//! use timber_core::{MarkupParameters, ProfitRange};
//!
//! let params = MarkupParameters::new(50.0, 10.0, 5.0, 5.0, ProfitRange::new(20.0, 40.0));
//!
//! let quote = derive(1000.0, Some(&params)).unwrap();
//! assert_eq!(quote.minimum_mrp.amount(), Some(1550.69));
//!
//! // No rule configured for the scope → the "N/A" sentinel, not zero
//! let sentinel = derive(1000.0, None).unwrap();
//! assert!(!sentinel.is_configured());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod pricing;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use timber_core::MrpValue` instead of
// `use timber_core::types::MrpValue`

pub use error::{PricingError, ValidationError};
pub use pricing::{derive, round2};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default tax rate (percent) for the inclusive→exclusive conversion.
///
/// ## Why a constant?
/// Historically this was a divisor of 1.18 baked into the formula. It is a
/// per-rule field now; the default keeps existing rules producing the same
/// numbers they always have.
pub const DEFAULT_TAX_RATE: f64 = 18.0;

/// Default internal-profit step (percent) applied before tax-on-profit.
///
/// Same story as [`DEFAULT_TAX_RATE`]: a former formula constant, lifted into
/// the markup-rule schema with a behavior-preserving default.
pub const DEFAULT_INTERNAL_PROFIT: f64 = 10.0;

/// Grid spacing (percent) of the price ladder between the band ends.
pub const LADDER_STEP_PERCENT: f64 = 5.0;

/// Serialized form of an unconfigured MRP field.
///
/// ## Business Reason
/// Downstream documents must show "no markup rule configured yet" distinctly
/// from a genuine zero-value rule; the sentinel renders as a string.
pub const MRP_NOT_CONFIGURED: &str = "N/A";
