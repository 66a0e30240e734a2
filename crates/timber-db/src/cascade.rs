//! # Recalculation Cascade
//!
//! Re-derives the stored MRP band of every active item in a scope after a
//! pricing input changes.
//!
//! ## Flow
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │  Trigger A: reference price changed      Trigger B: markup changed   │
//! │  on_reference_price_change(scope, px)    on_markup_change(scope)     │
//! │                    │                              │                  │
//! │                    └──────────────┬───────────────┘                  │
//! │                                   ▼                                  │
//! │  Phase 1 (plan): fetch rule + scope snapshot, derive every quote     │
//! │                  in memory - pure math, no writes yet                │
//! │                                   ▼                                  │
//! │  Phase 2 (write): one concurrent UPDATE per item; a failed write     │
//! │                  marks that item only, siblings still commit         │
//! │                                   ▼                                  │
//! │  CascadeReport { total, succeeded, failed, outcomes }                │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Failure isolation
//! Errors before the write phase (rule fetch, scope snapshot) abort the
//! whole cascade and propagate as [`DbError`]. From the write phase on,
//! every item gets an [`ItemOutcome`] and the cascade always returns a
//! report.

use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::error::DbResult;
use crate::repository::catalog_item::CatalogItemRepository;
use crate::repository::markup_rule::MarkupRuleRepository;
use timber_core::{derive, round2, CatalogItem, MarkupParameters, PriceQuote, ScopeKey};

// =============================================================================
// Report Types
// =============================================================================

/// Per-item result of a cascade run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemOutcome {
    pub item_id: String,
    pub status: OutcomeStatus,
    /// Human-readable failure cause; `None` for updated items.
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Updated,
    Failed,
}

/// Summary of one cascade run over a scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CascadeReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// One entry per affected item, ordered by item ID.
    pub outcomes: Vec<ItemOutcome>,
}

impl CascadeReport {
    /// Status line for operator-facing surfaces.
    ///
    /// ## Example
    /// ```rust,ignore
    /// "4 MRP updated successfully"
    /// "Error while updating records: 3 succeeded, 1 failed"
    /// ```
    pub fn message(&self) -> String {
        if self.failed == 0 {
            format!("{} MRP updated successfully", self.succeeded)
        } else {
            format!(
                "Error while updating records: {} succeeded, {} failed",
                self.succeeded, self.failed
            )
        }
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed == 0
    }

    fn from_outcomes(mut outcomes: Vec<ItemOutcome>) -> Self {
        outcomes.sort_by(|a, b| a.item_id.cmp(&b.item_id));
        let total = outcomes.len();
        let succeeded = outcomes
            .iter()
            .filter(|o| o.status == OutcomeStatus::Updated)
            .count();
        CascadeReport {
            total,
            succeeded,
            failed: total - succeeded,
            outcomes,
        }
    }
}

// =============================================================================
// Cascade
// =============================================================================

/// Orchestrates scope-wide MRP recalculation.
///
/// Holds the two repositories it reads from and writes through; cheap to
/// clone, so each write task gets its own handle.
#[derive(Debug, Clone)]
pub struct RecalculationCascade {
    items: CatalogItemRepository,
    rules: MarkupRuleRepository,
}

/// A planned write: the derived state an item should end up in.
struct PlannedUpdate {
    item_id: String,
    purchase_price: f64,
    quote: PriceQuote,
}

impl RecalculationCascade {
    pub fn new(items: CatalogItemRepository, rules: MarkupRuleRepository) -> Self {
        RecalculationCascade { items, rules }
    }

    /// Trigger A: the scope's reference purchase price changed.
    ///
    /// Every item's cost basis is recomputed as
    /// `round2(reference_price * price_factor)` before the band is derived.
    pub async fn on_reference_price_change(
        &self,
        scope: &ScopeKey,
        reference_price: f64,
    ) -> DbResult<CascadeReport> {
        self.run(scope, Some(reference_price)).await
    }

    /// Trigger B: the scope's markup rule changed (or was deactivated).
    ///
    /// Cost bases stay as stored; only the derived band is refreshed.
    pub async fn on_markup_change(&self, scope: &ScopeKey) -> DbResult<CascadeReport> {
        self.run(scope, None).await
    }

    /// Derives what a single item's band would be under the current rule,
    /// without writing anything. Used by quotation screens.
    pub async fn preview(&self, item: &CatalogItem) -> DbResult<PriceQuote> {
        let rule = self.rules.find_by_scope(&item.scope).await?;
        let params = rule.as_ref().map(|r| &r.params);
        derive(item.purchase_price, params).map_err(|e| {
            crate::error::DbError::corrupt(
                "MarkupRule",
                rule.as_ref().map(|r| r.id.as_str()).unwrap_or("none"),
                e.to_string(),
            )
        })
    }

    async fn run(&self, scope: &ScopeKey, reference_price: Option<f64>) -> DbResult<CascadeReport> {
        let rule = self.rules.find_by_scope(scope).await?;
        let items = self.items.find_by_scope(scope).await?;

        debug!(
            scope = %scope,
            items = items.len(),
            rule_configured = rule.is_some(),
            reference_price = ?reference_price,
            "Starting recalculation cascade"
        );

        if items.is_empty() {
            info!(scope = %scope, "Cascade found no active items");
            return Ok(CascadeReport::from_outcomes(Vec::new()));
        }

        let params = rule.as_ref().map(|r| &r.params);

        // Phase 1: derive everything up front. A derivation error (a rule
        // with a 100% divisor that slipped past validation) fails only the
        // item it was computed for.
        let mut planned = Vec::with_capacity(items.len());
        let mut outcomes = Vec::new();
        for item in &items {
            match plan_item(item, params, reference_price) {
                Ok(update) => planned.push(update),
                Err(reason) => outcomes.push(ItemOutcome {
                    item_id: item.id.clone(),
                    status: OutcomeStatus::Failed,
                    reason: Some(reason),
                }),
            }
        }

        // Phase 2: dispatch the writes concurrently and gather per-item
        // results. Each task owns its item ID so a panic still maps back
        // to a failed outcome rather than poisoning the batch.
        let mut join_set = JoinSet::new();
        for update in planned {
            let repo = self.items.clone();
            join_set.spawn(async move {
                let result = repo
                    .update_prices(&update.item_id, update.purchase_price, &update.quote)
                    .await;
                match result {
                    Ok(()) => ItemOutcome {
                        item_id: update.item_id,
                        status: OutcomeStatus::Updated,
                        reason: None,
                    },
                    Err(e) => ItemOutcome {
                        item_id: update.item_id,
                        status: OutcomeStatus::Failed,
                        reason: Some(e.to_string()),
                    },
                }
            });
        }

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => outcomes.push(ItemOutcome {
                    item_id: String::new(),
                    status: OutcomeStatus::Failed,
                    reason: Some(format!("update task panicked: {e}")),
                }),
            }
        }

        let report = CascadeReport::from_outcomes(outcomes);

        if report.failed == 0 {
            info!(scope = %scope, updated = report.succeeded, "Cascade complete");
        } else {
            warn!(
                scope = %scope,
                succeeded = report.succeeded,
                failed = report.failed,
                "Cascade completed with failures"
            );
        }

        Ok(report)
    }
}

/// Computes the target state for one item.
///
/// Returns the failure reason as a string so phase 2 can treat planning and
/// write failures uniformly.
fn plan_item(
    item: &CatalogItem,
    params: Option<&MarkupParameters>,
    reference_price: Option<f64>,
) -> Result<PlannedUpdate, String> {
    let purchase_price = match reference_price {
        Some(reference) => round2(reference * item.price_factor),
        None => item.purchase_price,
    };

    if purchase_price < 0.0 {
        return Err(format!(
            "computed purchase price {purchase_price} is negative (price_factor = {})",
            item.price_factor
        ));
    }

    let quote = derive(purchase_price, params).map_err(|e| e.to_string())?;

    Ok(PlannedUpdate {
        item_id: item.id.clone(),
        purchase_price,
        quote,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::catalog_item::NewCatalogItem;
    use timber_core::{Material, ProfitRange};
    use uuid::Uuid;

    fn outcome(id: &str, status: OutcomeStatus) -> ItemOutcome {
        ItemOutcome {
            item_id: id.to_string(),
            status,
            reason: None,
        }
    }

    #[test]
    fn test_report_message_all_succeeded() {
        let report = CascadeReport::from_outcomes(vec![
            outcome("b", OutcomeStatus::Updated),
            outcome("a", OutcomeStatus::Updated),
        ]);
        assert_eq!(report.message(), "2 MRP updated successfully");
        assert!(report.is_complete_success());
    }

    #[test]
    fn test_report_message_partial_failure() {
        let report = CascadeReport::from_outcomes(vec![
            outcome("a", OutcomeStatus::Updated),
            outcome("b", OutcomeStatus::Failed),
            outcome("c", OutcomeStatus::Updated),
        ]);
        assert_eq!(
            report.message(),
            "Error while updating records: 2 succeeded, 1 failed"
        );
        assert_eq!(report.total, 3);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 1);
    }

    #[test]
    fn test_report_empty_scope() {
        let report = CascadeReport::from_outcomes(Vec::new());
        assert_eq!(report.message(), "0 MRP updated successfully");
        assert!(report.is_complete_success());
    }

    #[test]
    fn test_report_outcomes_sorted_by_item_id() {
        let report = CascadeReport::from_outcomes(vec![
            outcome("c", OutcomeStatus::Updated),
            outcome("a", OutcomeStatus::Failed),
            outcome("b", OutcomeStatus::Updated),
        ]);
        let ids: Vec<&str> = report.outcomes.iter().map(|o| o.item_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    // =========================================================================
    // End-to-End Cascade Tests (in-memory database)
    // =========================================================================

    fn test_scope() -> ScopeKey {
        ScopeKey::new(
            Uuid::new_v4().to_string(),
            Uuid::new_v4().to_string(),
            Material::Plywood,
            Uuid::new_v4().to_string(),
        )
    }

    fn test_params() -> MarkupParameters {
        MarkupParameters::new(50.0, 10.0, 5.0, 5.0, ProfitRange::new(20.0, 40.0))
    }

    async fn seed_items(
        db: &Database,
        scope: &ScopeKey,
        factors: &[f64],
    ) -> Vec<CatalogItem> {
        let mut items = Vec::new();
        for (i, factor) in factors.iter().enumerate() {
            let item = db
                .catalog_items()
                .insert(NewCatalogItem {
                    scope: scope.clone(),
                    name: format!("Sheet {i}"),
                    size_label: None,
                    thickness_label: None,
                    price_factor: *factor,
                    purchase_price: 100.0,
                })
                .await
                .unwrap();
            items.push(item);
        }
        items
    }

    #[tokio::test]
    async fn test_reference_price_change_updates_every_item() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let scope = test_scope();
        let items = seed_items(&db, &scope, &[32.0, 28.0, 24.0]).await;

        db.markup_rules().upsert(&scope, &test_params()).await.unwrap();

        let report = db
            .cascade()
            .on_reference_price_change(&scope, 45.0)
            .await
            .unwrap();

        assert_eq!(report.message(), "3 MRP updated successfully");
        assert_eq!(report.total, 3);

        for item in &items {
            let stored = db.catalog_items().get_by_id(&item.id).await.unwrap().unwrap();
            let expected_purchase = round2(45.0 * item.price_factor);
            assert_eq!(stored.purchase_price, expected_purchase);

            let expected = derive(expected_purchase, Some(&test_params())).unwrap();
            assert_eq!(stored.quote(), expected);
            assert!(stored.quote().is_configured());
        }
    }

    #[tokio::test]
    async fn test_markup_change_keeps_purchase_prices() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let scope = test_scope();
        let items = seed_items(&db, &scope, &[32.0, 28.0]).await;

        db.markup_rules().upsert(&scope, &test_params()).await.unwrap();

        let report = db.cascade().on_markup_change(&scope).await.unwrap();
        assert!(report.is_complete_success());

        for item in &items {
            let stored = db.catalog_items().get_by_id(&item.id).await.unwrap().unwrap();
            // Trigger B never touches the cost basis.
            assert_eq!(stored.purchase_price, 100.0);
            assert_eq!(stored.quote(), derive(100.0, Some(&test_params())).unwrap());
        }
    }

    #[tokio::test]
    async fn test_unconfigured_scope_writes_sentinel() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let scope = test_scope();
        let items = seed_items(&db, &scope, &[32.0]).await;

        // No markup rule for the scope: items still get written, at N/A.
        let report = db
            .cascade()
            .on_reference_price_change(&scope, 45.0)
            .await
            .unwrap();
        assert_eq!(report.message(), "1 MRP updated successfully");

        let stored = db.catalog_items().get_by_id(&items[0].id).await.unwrap().unwrap();
        assert_eq!(stored.purchase_price, 1440.0);
        assert_eq!(stored.quote(), PriceQuote::not_configured());
    }

    #[tokio::test]
    async fn test_empty_scope_reports_trivial_success() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let scope = test_scope();

        let report = db.cascade().on_markup_change(&scope).await.unwrap();
        assert_eq!(report.total, 0);
        assert_eq!(report.message(), "0 MRP updated successfully");
    }

    #[tokio::test]
    async fn test_partial_failure_isolates_the_bad_item() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let scope = test_scope();
        // The third item's negative factor makes its recomputed cost basis
        // negative, which fails planning for that item alone.
        let items = seed_items(&db, &scope, &[32.0, 28.0, -1.0, 24.0, 18.0]).await;

        db.markup_rules().upsert(&scope, &test_params()).await.unwrap();

        let report = db
            .cascade()
            .on_reference_price_change(&scope, 45.0)
            .await
            .unwrap();

        assert_eq!(report.total, 5);
        assert_eq!(report.succeeded, 4);
        assert_eq!(report.failed, 1);
        assert_eq!(report.succeeded + report.failed, report.total);
        assert_eq!(
            report.message(),
            "Error while updating records: 4 succeeded, 1 failed"
        );

        let failed: Vec<&ItemOutcome> = report
            .outcomes
            .iter()
            .filter(|o| o.status == OutcomeStatus::Failed)
            .collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].item_id, items[2].id);
        assert!(failed[0].reason.as_deref().unwrap().contains("negative"));

        // The failed item keeps its previous state untouched.
        let bad = db.catalog_items().get_by_id(&items[2].id).await.unwrap().unwrap();
        assert_eq!(bad.purchase_price, 100.0);
        assert_eq!(bad.quote(), PriceQuote::not_configured());
        assert_eq!(bad.revision, 0);

        // Siblings got their new bands.
        let good = db.catalog_items().get_by_id(&items[0].id).await.unwrap().unwrap();
        assert_eq!(good.purchase_price, 1440.0);
        assert!(good.quote().is_configured());
    }

    #[tokio::test]
    async fn test_markup_cascade_is_idempotent() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let scope = test_scope();
        let items = seed_items(&db, &scope, &[32.0, 28.0]).await;

        db.markup_rules().upsert(&scope, &test_params()).await.unwrap();

        db.cascade().on_markup_change(&scope).await.unwrap();
        let first: Vec<CatalogItem> = {
            let mut v = Vec::new();
            for item in &items {
                v.push(db.catalog_items().get_by_id(&item.id).await.unwrap().unwrap());
            }
            v
        };

        db.cascade().on_markup_change(&scope).await.unwrap();
        for (item, before) in items.iter().zip(&first) {
            let after = db.catalog_items().get_by_id(&item.id).await.unwrap().unwrap();
            // Same inputs, bit-identical derived values.
            assert_eq!(after.purchase_price.to_bits(), before.purchase_price.to_bits());
            assert_eq!(after.quote(), before.quote());
            // The write itself still happened.
            assert_eq!(after.revision, before.revision + 1);
        }
    }

    #[tokio::test]
    async fn test_preview_matches_stored_rule() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let scope = test_scope();
        let items = seed_items(&db, &scope, &[32.0]).await;

        // Unconfigured scope previews as the sentinel.
        let quote = db.cascade().preview(&items[0]).await.unwrap();
        assert_eq!(quote, PriceQuote::not_configured());

        db.markup_rules().upsert(&scope, &test_params()).await.unwrap();

        let quote = db.cascade().preview(&items[0]).await.unwrap();
        assert_eq!(quote, derive(100.0, Some(&test_params())).unwrap());

        // Preview never writes.
        let stored = db.catalog_items().get_by_id(&items[0].id).await.unwrap().unwrap();
        assert_eq!(stored.revision, 0);
        assert_eq!(stored.quote(), PriceQuote::not_configured());
    }

    #[tokio::test]
    async fn test_rule_deactivation_then_cascade_clears_bands() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let scope = test_scope();
        let items = seed_items(&db, &scope, &[32.0]).await;

        db.markup_rules().upsert(&scope, &test_params()).await.unwrap();
        db.cascade().on_markup_change(&scope).await.unwrap();

        let priced = db.catalog_items().get_by_id(&items[0].id).await.unwrap().unwrap();
        assert!(priced.quote().is_configured());

        db.markup_rules().deactivate(&scope).await.unwrap();
        let report = db.cascade().on_markup_change(&scope).await.unwrap();
        assert!(report.is_complete_success());

        let cleared = db.catalog_items().get_by_id(&items[0].id).await.unwrap().unwrap();
        assert_eq!(cleared.quote(), PriceQuote::not_configured());
        assert_eq!(cleared.purchase_price, 100.0);
    }
}
