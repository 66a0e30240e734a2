//! # Catalog Item Repository
//!
//! Database operations for catalog items (plywood / laminate / veneer SKUs).
//!
//! ## Paired Price Writes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  update_prices(id, purchase_price, quote)                       │
//! │                                                                 │
//! │  One UPDATE writes purchase_price, minimum_mrp, maximum_mrp     │
//! │  and the ladder together - the derived fields can never go      │
//! │  stale relative to the cost basis they were computed from.      │
//! │                                                                 │
//! │  minimum_mrp / maximum_mrp columns:                             │
//! │    NULL  = no markup rule configured (the "N/A" sentinel)       │
//! │    REAL  = derived price                                        │
//! │                                                                 │
//! │  price_ladder column: JSON array of {percentage, price} pairs   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use timber_core::validation::{validate_purchase_price, validate_scope};
use timber_core::{CatalogItem, LadderStep, Material, MrpValue, PriceQuote, ScopeKey};

/// All columns of the catalog_items table, in one place.
const ITEM_COLUMNS: &str = "id, company_id, category_id, material, scope_ref, \
     name, size_label, thickness_label, price_factor, purchase_price, \
     minimum_mrp, maximum_mrp, price_ladder, \
     is_active, created_at, updated_at, revision";

// =============================================================================
// New Item Input
// =============================================================================

/// Input for creating a catalog item.
///
/// Derived price fields are not part of the input: a new item starts at the
/// `"N/A"` sentinel and gets its band from the first cascade over its scope.
#[derive(Debug, Clone)]
pub struct NewCatalogItem {
    pub scope: ScopeKey,
    pub name: String,
    pub size_label: Option<String>,
    pub thickness_label: Option<String>,
    /// Dimensional multiplier (sheet area for plywood, 1.0 otherwise).
    pub price_factor: f64,
    /// Initial cost basis; may be 0.0 until a reference price arrives.
    pub purchase_price: f64,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for catalog item database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.catalog_items();
/// let affected = repo.find_by_scope(&scope).await?;
/// repo.update_prices(&item_id, 1440.0, &quote).await?;
/// ```
#[derive(Debug, Clone)]
pub struct CatalogItemRepository {
    pool: SqlitePool,
}

/// Flat row shape; the ladder JSON and nullable MRP columns are decoded
/// into domain types on read.
#[derive(sqlx::FromRow)]
struct ItemRow {
    id: String,
    company_id: String,
    category_id: String,
    material: Material,
    scope_ref: String,
    name: String,
    size_label: Option<String>,
    thickness_label: Option<String>,
    price_factor: f64,
    purchase_price: f64,
    minimum_mrp: Option<f64>,
    maximum_mrp: Option<f64>,
    price_ladder: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    revision: i64,
}

impl ItemRow {
    fn into_domain(self) -> DbResult<CatalogItem> {
        let ladder: Vec<LadderStep> = serde_json::from_str(&self.price_ladder)
            .map_err(|e| DbError::corrupt("CatalogItem", &self.id, e.to_string()))?;

        Ok(CatalogItem {
            id: self.id,
            scope: ScopeKey::new(
                self.company_id,
                self.category_id,
                self.material,
                self.scope_ref,
            ),
            name: self.name,
            size_label: self.size_label,
            thickness_label: self.thickness_label,
            price_factor: self.price_factor,
            purchase_price: self.purchase_price,
            minimum_mrp: MrpValue::from_stored(self.minimum_mrp),
            maximum_mrp: MrpValue::from_stored(self.maximum_mrp),
            price_ladder: ladder,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
            revision: self.revision,
        })
    }
}

impl CatalogItemRepository {
    /// Creates a new CatalogItemRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CatalogItemRepository { pool }
    }

    /// Inserts a new catalog item with sentinel price fields.
    pub async fn insert(&self, new: NewCatalogItem) -> DbResult<CatalogItem> {
        validate_scope(&new.scope)?;
        validate_purchase_price(new.purchase_price)?;

        let now = Utc::now();
        let item = CatalogItem {
            id: Uuid::new_v4().to_string(),
            scope: new.scope,
            name: new.name,
            size_label: new.size_label,
            thickness_label: new.thickness_label,
            price_factor: new.price_factor,
            purchase_price: new.purchase_price,
            minimum_mrp: MrpValue::NotConfigured,
            maximum_mrp: MrpValue::NotConfigured,
            price_ladder: Vec::new(),
            is_active: true,
            created_at: now,
            updated_at: now,
            revision: 0,
        };

        debug!(id = %item.id, scope = %item.scope, name = %item.name, "Inserting catalog item");

        sqlx::query(
            "INSERT INTO catalog_items ( \
                 id, company_id, category_id, material, scope_ref, \
                 name, size_label, thickness_label, price_factor, purchase_price, \
                 minimum_mrp, maximum_mrp, price_ladder, \
                 is_active, created_at, updated_at, revision \
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, \
                       NULL, NULL, '[]', ?11, ?12, ?13, ?14)",
        )
        .bind(&item.id)
        .bind(&item.scope.company_id)
        .bind(&item.scope.category_id)
        .bind(item.scope.material)
        .bind(&item.scope.scope_ref)
        .bind(&item.name)
        .bind(&item.size_label)
        .bind(&item.thickness_label)
        .bind(item.price_factor)
        .bind(item.purchase_price)
        .bind(item.is_active)
        .bind(item.created_at)
        .bind(item.updated_at)
        .bind(item.revision)
        .execute(&self.pool)
        .await?;

        Ok(item)
    }

    /// Gets an item by its ID (active or not).
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<CatalogItem>> {
        let row: Option<ItemRow> = sqlx::query_as(&format!(
            "SELECT {ITEM_COLUMNS} FROM catalog_items WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ItemRow::into_domain).transpose()
    }

    /// Fetches the active items belonging to a scope.
    ///
    /// This is the cascade's snapshot read: one SELECT determines the whole
    /// affected set before any write is dispatched, so an item reassigned
    /// mid-cascade is either fully in or fully out of the batch.
    pub async fn find_by_scope(&self, scope: &ScopeKey) -> DbResult<Vec<CatalogItem>> {
        let rows: Vec<ItemRow> = sqlx::query_as(&format!(
            "SELECT {ITEM_COLUMNS} FROM catalog_items \
             WHERE company_id = ?1 AND category_id = ?2 AND material = ?3 AND scope_ref = ?4 \
             AND is_active = 1 \
             ORDER BY name, id"
        ))
        .bind(&scope.company_id)
        .bind(&scope.category_id)
        .bind(scope.material)
        .bind(&scope.scope_ref)
        .fetch_all(&self.pool)
        .await?;

        debug!(scope = %scope, count = rows.len(), "Fetched items for scope");

        rows.into_iter().map(ItemRow::into_domain).collect()
    }

    /// Writes an item's cost basis and derived price fields together.
    ///
    /// ## Arguments
    /// * `id` - item ID
    /// * `purchase_price` - new cost basis (unchanged for a markup-only
    ///   recalculation)
    /// * `quote` - the freshly derived band; the sentinel quote stores NULLs
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - item doesn't exist
    /// * `Err(DbError::CheckViolation)` - negative purchase price rejected
    ///   by the schema
    pub async fn update_prices(
        &self,
        id: &str,
        purchase_price: f64,
        quote: &PriceQuote,
    ) -> DbResult<()> {
        let ladder_json = serde_json::to_string(&quote.price_ladder)
            .map_err(|e| DbError::corrupt("CatalogItem", id, e.to_string()))?;

        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE catalog_items SET \
                 purchase_price = ?2, minimum_mrp = ?3, maximum_mrp = ?4, \
                 price_ladder = ?5, updated_at = ?6, revision = revision + 1 \
             WHERE id = ?1",
        )
        .bind(id)
        .bind(purchase_price)
        .bind(quote.minimum_mrp.amount())
        .bind(quote.maximum_mrp.amount())
        .bind(ladder_json)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("CatalogItem", id));
        }

        Ok(())
    }

    /// Soft-deletes an item by setting is_active = false.
    ///
    /// ## Why Soft Delete?
    /// Historical general books and quotations still reference the item;
    /// deactivation only removes it from future cascades and listings.
    pub async fn soft_delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Soft-deleting catalog item");

        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE catalog_items SET is_active = 0, updated_at = ?2, revision = revision + 1 \
             WHERE id = ?1",
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("CatalogItem", id));
        }

        Ok(())
    }

    /// Counts active items (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM catalog_items WHERE is_active = 1")
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use timber_core::derive;
    use timber_core::{MarkupParameters, ProfitRange};

    fn test_scope() -> ScopeKey {
        ScopeKey::new(
            Uuid::new_v4().to_string(),
            Uuid::new_v4().to_string(),
            Material::Plywood,
            Uuid::new_v4().to_string(),
        )
    }

    fn new_item(scope: &ScopeKey, name: &str, factor: f64, purchase: f64) -> NewCatalogItem {
        NewCatalogItem {
            scope: scope.clone(),
            name: name.to_string(),
            size_label: Some("8x4".to_string()),
            thickness_label: Some("18mm".to_string()),
            price_factor: factor,
            purchase_price: purchase,
        }
    }

    #[tokio::test]
    async fn test_insert_starts_at_sentinel() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.catalog_items();
        let scope = test_scope();

        let item = repo
            .insert(new_item(&scope, "Marine Ply 18mm", 32.0, 1440.0))
            .await
            .unwrap();

        let stored = repo.get_by_id(&item.id).await.unwrap().unwrap();
        assert_eq!(stored.minimum_mrp, MrpValue::NotConfigured);
        assert_eq!(stored.maximum_mrp, MrpValue::NotConfigured);
        assert!(stored.price_ladder.is_empty());
        assert_eq!(stored.purchase_price, 1440.0);
    }

    #[tokio::test]
    async fn test_insert_rejects_negative_purchase_price() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.catalog_items();

        let err = repo
            .insert(new_item(&test_scope(), "Bad", 1.0, -5.0))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));
    }

    #[tokio::test]
    async fn test_find_by_scope_filters_inactive_and_other_scopes() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.catalog_items();
        let scope = test_scope();
        let other = test_scope();

        let a = repo.insert(new_item(&scope, "A", 32.0, 100.0)).await.unwrap();
        let b = repo.insert(new_item(&scope, "B", 28.0, 100.0)).await.unwrap();
        repo.insert(new_item(&other, "C", 1.0, 100.0)).await.unwrap();

        repo.soft_delete(&b.id).await.unwrap();

        let found = repo.find_by_scope(&scope).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, a.id);
    }

    #[tokio::test]
    async fn test_update_prices_round_trips_quote() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.catalog_items();
        let scope = test_scope();

        let item = repo.insert(new_item(&scope, "A", 32.0, 0.0)).await.unwrap();

        let params = MarkupParameters::new(50.0, 10.0, 5.0, 5.0, ProfitRange::new(20.0, 40.0));
        let quote = derive(1000.0, Some(&params)).unwrap();
        repo.update_prices(&item.id, 1000.0, &quote).await.unwrap();

        let stored = repo.get_by_id(&item.id).await.unwrap().unwrap();
        assert_eq!(stored.purchase_price, 1000.0);
        assert_eq!(stored.quote(), quote);
        assert_eq!(stored.revision, 1);
    }

    #[tokio::test]
    async fn test_update_prices_unknown_item() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.catalog_items();

        let err = repo
            .update_prices("no-such-id", 100.0, &PriceQuote::not_configured())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_count() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.catalog_items();
        let scope = test_scope();

        assert_eq!(repo.count().await.unwrap(), 0);
        repo.insert(new_item(&scope, "A", 1.0, 0.0)).await.unwrap();
        repo.insert(new_item(&scope, "B", 1.0, 0.0)).await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 2);
    }
}
