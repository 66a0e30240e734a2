//! # Domain Types
//!
//! Core domain types for TimberBooks pricing.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                          Domain Types                               │
//! │                                                                     │
//! │  ┌────────────────┐   ┌──────────────────┐   ┌──────────────────┐  │
//! │  │   ScopeKey     │   │ MarkupParameters │   │   CatalogItem    │  │
//! │  │  ────────────  │   │  ──────────────  │   │  ──────────────  │  │
//! │  │  company_id    │   │  bill %          │   │  purchase_price  │  │
//! │  │  category_id   │   │  skim %          │   │  minimum_mrp     │  │
//! │  │  material      │   │  commission %    │   │  maximum_mrp     │  │
//! │  │  scope_ref     │   │  discount %      │   │  price_ladder    │  │
//! │  └────────────────┘   │  profit range    │   └──────────────────┘  │
//! │                       └──────────────────┘                          │
//! │                                                                     │
//! │  ┌────────────────┐   ┌──────────────────┐                          │
//! │  │   Material     │   │    MrpValue      │                          │
//! │  │  ────────────  │   │  ──────────────  │                          │
//! │  │  Plywood       │   │  Amount(f64)     │                          │
//! │  │  Laminate      │   │  NotConfigured   │  ← serializes as "N/A"  │
//! │  │  Veneer        │   └──────────────────┘                          │
//! │  └────────────────┘                                                 │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Scope Identity
//! A scope is the composite key `(company, category, material sub-key)`.
//! Exactly one active [`MarkupRule`] exists per scope, and every
//! [`CatalogItem`] belongs to exactly one scope at a time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{DEFAULT_INTERNAL_PROFIT, DEFAULT_TAX_RATE, MRP_NOT_CONFIGURED};

// =============================================================================
// Material
// =============================================================================

/// The three structurally parallel catalog variants.
///
/// The variant decides which foreign key forms the material-specific part of
/// the scope tuple. Dispatching over this enum is what lets one cascade serve
/// all three catalogs instead of three duplicated code paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum Material {
    /// Priced per sheet: reference unit price × sheet area.
    Plywood,
    /// Priced per catalog entry; purchase price copied from the catalog price.
    Laminate,
    /// Priced per lot number; purchase price copied from the lot price.
    Veneer,
}

impl Material {
    /// Stable lowercase name, matching the database representation.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Material::Plywood => "plywood",
            Material::Laminate => "laminate",
            Material::Veneer => "veneer",
        }
    }

    /// Which reference-data foreign key the scope sub-key refers to.
    pub const fn scope_field(&self) -> &'static str {
        match self {
            Material::Plywood => "brand_id",
            Material::Laminate => "catalog_id",
            Material::Veneer => "lot_id",
        }
    }
}

impl fmt::Display for Material {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Scope Key
// =============================================================================

/// Composite key identifying which markup rule governs an item.
///
/// `scope_ref` is the material-specific sub-key: a brand id for plywood, a
/// catalog id for laminate, a lot-number id for veneer
/// (see [`Material::scope_field`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopeKey {
    pub company_id: String,
    pub category_id: String,
    pub material: Material,
    pub scope_ref: String,
}

impl ScopeKey {
    pub fn new(
        company_id: impl Into<String>,
        category_id: impl Into<String>,
        material: Material,
        scope_ref: impl Into<String>,
    ) -> Self {
        ScopeKey {
            company_id: company_id.into(),
            category_id: category_id.into(),
            material,
            scope_ref: scope_ref.into(),
        }
    }
}

/// Compact form for log fields: `material:company/category/sub-key`.
impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}/{}/{}",
            self.material, self.company_id, self.category_id, self.scope_ref
        )
    }
}

// =============================================================================
// Markup Parameters
// =============================================================================

/// The showroom-profit band: the business-configured minimum and maximum
/// final markup percentage. `minimum == maximum` is a valid single-point band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfitRange {
    pub minimum: f64,
    pub maximum: f64,
}

impl ProfitRange {
    pub const fn new(minimum: f64, maximum: f64) -> Self {
        ProfitRange { minimum, maximum }
    }
}

/// Percentage-based business rules feeding the MRP pipeline.
///
/// One active record exists per scope. `tax_rate` and `internal_profit` were
/// historically fixed formula constants (18% and 10%); they are explicit
/// fields now, with serde defaults preserving the historical output for
/// records that never set them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarkupParameters {
    /// Percentage of the purchase price subject to the tax-adjustment step.
    pub bill_percentage: f64,
    /// Percentage cost absorbed before markup.
    pub skim_percentage: f64,
    /// Broker commission percentage layered on top.
    pub broker_commission: f64,
    /// Discount percentage layered on top.
    pub discount_percentage: f64,
    /// Final price band, as profit percentages.
    pub showroom_profit: ProfitRange,
    /// Tax rate percentage used by the inclusive→exclusive conversion.
    #[serde(default = "default_tax_rate")]
    pub tax_rate: f64,
    /// Internal profit percentage added before tax-on-profit.
    #[serde(default = "default_internal_profit")]
    pub internal_profit: f64,
}

fn default_tax_rate() -> f64 {
    DEFAULT_TAX_RATE
}

fn default_internal_profit() -> f64 {
    DEFAULT_INTERNAL_PROFIT
}

impl MarkupParameters {
    /// Creates parameters with the default tax and internal-profit rates.
    pub fn new(
        bill_percentage: f64,
        skim_percentage: f64,
        broker_commission: f64,
        discount_percentage: f64,
        showroom_profit: ProfitRange,
    ) -> Self {
        MarkupParameters {
            bill_percentage,
            skim_percentage,
            broker_commission,
            discount_percentage,
            showroom_profit,
            tax_rate: DEFAULT_TAX_RATE,
            internal_profit: DEFAULT_INTERNAL_PROFIT,
        }
    }

    /// Overrides the tax rate (percent).
    pub fn with_tax_rate(mut self, tax_rate: f64) -> Self {
        self.tax_rate = tax_rate;
        self
    }

    /// Overrides the internal-profit step (percent).
    pub fn with_internal_profit(mut self, internal_profit: f64) -> Self {
        self.internal_profit = internal_profit;
        self
    }
}

// =============================================================================
// Markup Rule (persisted record)
// =============================================================================

/// A persisted markup rule: [`MarkupParameters`] bound to a scope.
///
/// Lifecycle: created once per scope, updated in place; updating it triggers
/// the recalculation cascade over every item in the scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkupRule {
    /// Unique identifier (UUID v4).
    pub id: String,
    /// Composite scope this rule governs.
    pub scope: ScopeKey,
    /// The percentage rules themselves.
    pub params: MarkupParameters,
    /// Soft-delete flag; at most one active rule per scope.
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Incremented on every in-place update.
    pub revision: i64,
}

// =============================================================================
// MRP Value
// =============================================================================

/// A derived MRP field: either a computed price or the "not configured"
/// sentinel.
///
/// ## Why a sentinel, not zero?
/// Downstream consumers must distinguish "no markup rule configured for this
/// scope yet" from "a zero-value business rule". The sentinel serializes as
/// the string `"N/A"`, a computed value as a plain number.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MrpValue {
    /// No markup rule exists for the item's scope.
    NotConfigured,
    /// A derived price, rounded to 2 decimals.
    Amount(f64),
}

impl MrpValue {
    /// The numeric value, if configured.
    pub fn amount(&self) -> Option<f64> {
        match self {
            MrpValue::Amount(v) => Some(*v),
            MrpValue::NotConfigured => None,
        }
    }

    pub fn is_configured(&self) -> bool {
        matches!(self, MrpValue::Amount(_))
    }

    /// Maps the nullable stored column back to the domain value.
    pub fn from_stored(value: Option<f64>) -> Self {
        match value {
            Some(v) => MrpValue::Amount(v),
            None => MrpValue::NotConfigured,
        }
    }
}

impl Serialize for MrpValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            MrpValue::Amount(v) => serializer.serialize_f64(*v),
            MrpValue::NotConfigured => serializer.serialize_str(MRP_NOT_CONFIGURED),
        }
    }
}

impl<'de> Deserialize<'de> for MrpValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Num(f64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Num(v) => Ok(MrpValue::Amount(v)),
            Raw::Text(s) if s == MRP_NOT_CONFIGURED => Ok(MrpValue::NotConfigured),
            Raw::Text(s) => Err(serde::de::Error::custom(format!(
                "invalid MRP value: '{s}'"
            ))),
        }
    }
}

impl fmt::Display for MrpValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MrpValue::Amount(v) => write!(f, "{v:.2}"),
            MrpValue::NotConfigured => f.write_str(MRP_NOT_CONFIGURED),
        }
    }
}

// =============================================================================
// Price Quote
// =============================================================================

/// One rung of the price ladder: a profit percentage and its price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LadderStep {
    pub percentage: f64,
    pub price: f64,
}

/// The full output of the price deriver: the MRP band plus the discrete
/// ladder of intermediate prices between its ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub minimum_mrp: MrpValue,
    pub maximum_mrp: MrpValue,
    pub price_ladder: Vec<LadderStep>,
}

impl PriceQuote {
    /// The sentinel quote returned when no markup rule exists for a scope.
    pub fn not_configured() -> Self {
        PriceQuote {
            minimum_mrp: MrpValue::NotConfigured,
            maximum_mrp: MrpValue::NotConfigured,
            price_ladder: Vec::new(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.minimum_mrp.is_configured()
    }
}

// =============================================================================
// Catalog Item
// =============================================================================

/// A concrete SKU instance (a plywood sheet, a laminate, a veneer lot entry).
///
/// `minimum_mrp`/`maximum_mrp` are always recomputed together with
/// `purchase_price`; they are never independently stale. Items are
/// soft-deactivated, never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    /// Unique identifier (UUID v4).
    pub id: String,
    /// Scope the item belongs to (exactly one at a time).
    pub scope: ScopeKey,
    /// Display name shown on quotations and general books.
    pub name: String,
    /// Size description, e.g. "8x4".
    pub size_label: Option<String>,
    /// Thickness description, e.g. "18mm".
    pub thickness_label: Option<String>,
    /// Dimensional multiplier applied to a reference unit price
    /// (sheet area in sqft for plywood, 1.0 for laminate/veneer).
    pub price_factor: f64,
    /// Cost basis the MRP band is derived from.
    pub purchase_price: f64,
    pub minimum_mrp: MrpValue,
    pub maximum_mrp: MrpValue,
    pub price_ladder: Vec<LadderStep>,
    /// Soft-delete flag.
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Incremented on every priced write (observability, not locking).
    pub revision: i64,
}

impl CatalogItem {
    /// The item's current derived price fields as a quote.
    pub fn quote(&self) -> PriceQuote {
        PriceQuote {
            minimum_mrp: self.minimum_mrp,
            maximum_mrp: self.maximum_mrp,
            price_ladder: self.price_ladder.clone(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
