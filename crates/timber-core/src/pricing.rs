//! # Price Derivation (MRP Pipeline)
//!
//! Converts a purchase price into a suggested retail price band.
//!
//! ## The Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │         purchase price ──► MRP band, step by step                  │
//! │                                                                     │
//! │  purchase_price                                                     │
//! │       │  × bill% ────────────────► bill_value                       │
//! │       │  ÷ (1 + tax%) ──────────► purchase_without_tax              │
//! │       │  bill − without_tax ────► tax_portion                       │
//! │       │  + internal_profit% ────► with_internal_profit              │
//! │       │  × tax% ────────────────► tax_on_profit                     │
//! │       │  profit_tax − portion ──► net_tax_adjustment                │
//! │       ▼                                                             │
//! │  cost_with_tax_adjustment = purchase_price + net_tax_adjustment     │
//! │       │  ÷ (1 − skim%)                                              │
//! │       │  ÷ (1 − commission%)                                        │
//! │       │  ÷ (1 − discount%)                                          │
//! │       ▼                                                             │
//! │  after_discount ──┬── ÷ (1 − profit_min%) ──► minimum MRP           │
//! │                   ├── ÷ (1 − profit_max%) ──► maximum MRP           │
//! │                   └── 5%-step ladder between the two                │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Rounding Contract
//! Every intermediate is rounded half-up to 2 decimals BEFORE feeding the
//! next step. The ladder is sensitive to the compounding, so historical
//! price parity depends on rounding at each named step, not only at the end.
//!
//! ## Purity
//! No I/O, no shared state. Identical inputs produce bit-identical rounded
//! outputs, which is what makes the recalculation cascade idempotent.

use crate::error::{PricingError, PricingResult};
use crate::types::{LadderStep, MarkupParameters, MrpValue, PriceQuote, ProfitRange};
use crate::LADDER_STEP_PERCENT;

// =============================================================================
// Rounding
// =============================================================================

/// Rounds half-up to 2 decimal places (standard currency rounding).
///
/// ## Example
/// ```rust
/// use timber_core::pricing::round2;
///
/// assert_eq!(round2(423.7288), 423.73);
/// assert_eq!(round2(1550.6875), 1550.69); // half rounds up
/// assert_eq!(round2(76.2700001), 76.27);
/// ```
#[inline]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// =============================================================================
// Derivation
// =============================================================================

/// Derives the MRP band and price ladder for a purchase price.
///
/// ## Contract
/// - `purchase_price >= 0` is the caller's responsibility; negative input
///   produces nonsensical (but finite) output and is rejected earlier, at
///   the persistence boundary.
/// - `params == None` models "no markup rule configured for this scope yet"
///   and yields the `"N/A"` sentinel quote, never a numeric zero.
/// - Any divisor percentage equal to exactly 100 fails with
///   [`PricingError::InvalidMarkupParameter`] instead of producing
///   `inf`/`NaN`.
///
/// ## Example
/// ```rust
/// use timber_core::pricing::derive;
/// use timber_core::{MarkupParameters, ProfitRange};
///
/// let params = MarkupParameters::new(50.0, 10.0, 5.0, 5.0, ProfitRange::new(20.0, 40.0));
/// let quote = derive(1000.0, Some(&params)).unwrap();
/// assert_eq!(quote.minimum_mrp.amount(), Some(1550.69));
/// assert_eq!(quote.maximum_mrp.amount(), Some(2067.58));
/// ```
pub fn derive(
    purchase_price: f64,
    params: Option<&MarkupParameters>,
) -> PricingResult<PriceQuote> {
    let Some(p) = params else {
        return Ok(PriceQuote::not_configured());
    };

    guard_unit_divisor("skim_percentage", p.skim_percentage)?;
    guard_unit_divisor("broker_commission", p.broker_commission)?;
    guard_unit_divisor("discount_percentage", p.discount_percentage)?;
    guard_unit_divisor("showroom_profit.minimum", p.showroom_profit.minimum)?;
    guard_unit_divisor("showroom_profit.maximum", p.showroom_profit.maximum)?;
    if p.tax_rate == -100.0 {
        return Err(PricingError::InvalidMarkupParameter {
            field: "tax_rate",
            value: p.tax_rate,
        });
    }

    // Tax adjustment: the billed share of the cost is converted from
    // tax-inclusive to tax-exclusive, an internal profit is added, and the
    // difference between tax-on-profit and the original tax portion is
    // folded back into the cost basis.
    let bill_value = round2(purchase_price * p.bill_percentage / 100.0);
    let purchase_without_tax = round2(bill_value / (1.0 + p.tax_rate / 100.0));
    let tax_portion = round2(bill_value - purchase_without_tax);
    let with_internal_profit =
        round2(purchase_without_tax + purchase_without_tax * p.internal_profit / 100.0);
    let tax_on_profit = round2(with_internal_profit * p.tax_rate / 100.0);
    let net_tax_adjustment = round2(tax_on_profit - tax_portion);
    let cost_with_tax_adjustment = round2(purchase_price + net_tax_adjustment);

    // Markup chain: each layer grosses the price up so the configured
    // percentage can later be given away without eating into the base.
    let after_skim = round2(cost_with_tax_adjustment / (1.0 - p.skim_percentage / 100.0));
    let after_commission = round2(after_skim / (1.0 - p.broker_commission / 100.0));
    let after_discount = round2(after_commission / (1.0 - p.discount_percentage / 100.0));

    let minimum_mrp = round2(after_discount / (1.0 - p.showroom_profit.minimum / 100.0));
    let maximum_mrp = round2(after_discount / (1.0 - p.showroom_profit.maximum / 100.0));

    Ok(PriceQuote {
        minimum_mrp: MrpValue::Amount(minimum_mrp),
        maximum_mrp: MrpValue::Amount(maximum_mrp),
        price_ladder: build_ladder(after_discount, &p.showroom_profit),
    })
}

/// Rejects a percentage that would zero the `1 - pct/100` divisor.
fn guard_unit_divisor(field: &'static str, value: f64) -> PricingResult<()> {
    if value == 100.0 {
        return Err(PricingError::InvalidMarkupParameter { field, value });
    }
    Ok(())
}

// =============================================================================
// Price Ladder
// =============================================================================

/// Builds the discrete price ladder across the showroom-profit band.
///
/// Percentages: every multiple of 5 inside the band, plus the band ends
/// themselves when they are not multiples of 5. Sorted ascending and
/// duplicate-free by construction. Each price uses the same divisor formula
/// and rounding as the band ends, so the first and last rungs equal the
/// minimum and maximum MRP exactly.
fn build_ladder(after_discount: f64, profit: &ProfitRange) -> Vec<LadderStep> {
    let mut percentages = Vec::new();

    if !is_step_multiple(profit.minimum) {
        percentages.push(profit.minimum);
    }

    let mut pct = (profit.minimum / LADDER_STEP_PERCENT).ceil() * LADDER_STEP_PERCENT;
    let top = (profit.maximum / LADDER_STEP_PERCENT).floor() * LADDER_STEP_PERCENT;
    while pct <= top {
        percentages.push(pct);
        pct += LADDER_STEP_PERCENT;
    }

    // A single-point band already produced its only entry above
    if !is_step_multiple(profit.maximum) && profit.maximum > profit.minimum {
        percentages.push(profit.maximum);
    }

    percentages
        .into_iter()
        .map(|percentage| LadderStep {
            percentage,
            price: round2(after_discount / (1.0 - percentage / 100.0)),
        })
        .collect()
}

#[inline]
fn is_step_multiple(pct: f64) -> bool {
    (pct / LADDER_STEP_PERCENT).fract() == 0.0
}

// =============================================================================
// Unit Tests
// =============================================================================
