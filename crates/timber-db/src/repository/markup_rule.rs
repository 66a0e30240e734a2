//! # Markup Rule Repository
//!
//! Database operations for markup rules.
//!
//! ## Invariant: One Active Rule Per Scope
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  upsert(scope, params)                                          │
//! │       │                                                         │
//! │       ├── validate params ── rejected? → never hits the DB      │
//! │       │                                                         │
//! │       ├── active rule exists for scope?                         │
//! │       │      YES → UPDATE in place, revision + 1                │
//! │       │      NO  → INSERT                                       │
//! │       │                                                         │
//! │       └── partial unique index backs the invariant even if a    │
//! │           racing writer slips past the read                     │
//! │                                                                 │
//! │  The caller follows a successful upsert with a Trigger B        │
//! │  cascade over the scope.                                        │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use timber_core::validation::{validate_markup_parameters, validate_scope};
use timber_core::{MarkupParameters, MarkupRule, Material, ProfitRange, ScopeKey};

/// All columns of the markup_rules table, in one place.
const RULE_COLUMNS: &str = "id, company_id, category_id, material, scope_ref, \
     bill_percentage, skim_percentage, broker_commission, discount_percentage, \
     profit_min, profit_max, tax_rate, internal_profit, \
     is_active, created_at, updated_at, revision";

/// Repository for markup rule database operations.
#[derive(Debug, Clone)]
pub struct MarkupRuleRepository {
    pool: SqlitePool,
}

/// Flat row shape; reassembled into the nested domain type on read.
#[derive(sqlx::FromRow)]
struct RuleRow {
    id: String,
    company_id: String,
    category_id: String,
    material: Material,
    scope_ref: String,
    bill_percentage: f64,
    skim_percentage: f64,
    broker_commission: f64,
    discount_percentage: f64,
    profit_min: f64,
    profit_max: f64,
    tax_rate: f64,
    internal_profit: f64,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    revision: i64,
}

impl From<RuleRow> for MarkupRule {
    fn from(row: RuleRow) -> Self {
        MarkupRule {
            id: row.id,
            scope: ScopeKey::new(row.company_id, row.category_id, row.material, row.scope_ref),
            params: MarkupParameters {
                bill_percentage: row.bill_percentage,
                skim_percentage: row.skim_percentage,
                broker_commission: row.broker_commission,
                discount_percentage: row.discount_percentage,
                showroom_profit: ProfitRange::new(row.profit_min, row.profit_max),
                tax_rate: row.tax_rate,
                internal_profit: row.internal_profit,
            },
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
            revision: row.revision,
        }
    }
}

impl MarkupRuleRepository {
    /// Creates a new MarkupRuleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        MarkupRuleRepository { pool }
    }

    /// Finds the active rule for a scope, if one is configured.
    ///
    /// ## Returns
    /// * `Ok(Some(rule))` - scope has an active rule
    /// * `Ok(None)` - scope not configured yet (the caller resolves this to
    ///   the `"N/A"` sentinel, it is not an error)
    pub async fn find_by_scope(&self, scope: &ScopeKey) -> DbResult<Option<MarkupRule>> {
        let row: Option<RuleRow> = sqlx::query_as(&format!(
            "SELECT {RULE_COLUMNS} FROM markup_rules \
             WHERE company_id = ?1 AND category_id = ?2 AND material = ?3 AND scope_ref = ?4 \
             AND is_active = 1"
        ))
        .bind(&scope.company_id)
        .bind(&scope.category_id)
        .bind(scope.material)
        .bind(&scope.scope_ref)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(MarkupRule::from))
    }

    /// Creates or updates the active rule for a scope.
    ///
    /// Validation runs first: a parameter set that would divide by zero in
    /// the MRP pipeline, or an inverted profit band, is rejected here and
    /// never persisted.
    ///
    /// ## Returns
    /// The stored rule. An existing active rule keeps its id and gets its
    /// revision bumped; otherwise a new row is inserted.
    pub async fn upsert(
        &self,
        scope: &ScopeKey,
        params: &MarkupParameters,
    ) -> DbResult<MarkupRule> {
        validate_scope(scope)?;
        validate_markup_parameters(params)?;

        let now = Utc::now();

        if let Some(existing) = self.find_by_scope(scope).await? {
            debug!(scope = %scope, id = %existing.id, "Updating markup rule in place");

            sqlx::query(
                "UPDATE markup_rules SET \
                     bill_percentage = ?2, skim_percentage = ?3, broker_commission = ?4, \
                     discount_percentage = ?5, profit_min = ?6, profit_max = ?7, \
                     tax_rate = ?8, internal_profit = ?9, \
                     updated_at = ?10, revision = revision + 1 \
                 WHERE id = ?1",
            )
            .bind(&existing.id)
            .bind(params.bill_percentage)
            .bind(params.skim_percentage)
            .bind(params.broker_commission)
            .bind(params.discount_percentage)
            .bind(params.showroom_profit.minimum)
            .bind(params.showroom_profit.maximum)
            .bind(params.tax_rate)
            .bind(params.internal_profit)
            .bind(now)
            .execute(&self.pool)
            .await?;

            return Ok(MarkupRule {
                params: *params,
                updated_at: now,
                revision: existing.revision + 1,
                ..existing
            });
        }

        let rule = MarkupRule {
            id: Uuid::new_v4().to_string(),
            scope: scope.clone(),
            params: *params,
            is_active: true,
            created_at: now,
            updated_at: now,
            revision: 0,
        };

        debug!(scope = %scope, id = %rule.id, "Creating markup rule");

        sqlx::query(
            "INSERT INTO markup_rules ( \
                 id, company_id, category_id, material, scope_ref, \
                 bill_percentage, skim_percentage, broker_commission, discount_percentage, \
                 profit_min, profit_max, tax_rate, internal_profit, \
                 is_active, created_at, updated_at, revision \
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
        )
        .bind(&rule.id)
        .bind(&rule.scope.company_id)
        .bind(&rule.scope.category_id)
        .bind(rule.scope.material)
        .bind(&rule.scope.scope_ref)
        .bind(params.bill_percentage)
        .bind(params.skim_percentage)
        .bind(params.broker_commission)
        .bind(params.discount_percentage)
        .bind(params.showroom_profit.minimum)
        .bind(params.showroom_profit.maximum)
        .bind(params.tax_rate)
        .bind(params.internal_profit)
        .bind(rule.is_active)
        .bind(rule.created_at)
        .bind(rule.updated_at)
        .bind(rule.revision)
        .execute(&self.pool)
        .await?;

        Ok(rule)
    }

    /// Soft-deactivates the active rule for a scope.
    ///
    /// Items in the scope keep their last derived values until the next
    /// cascade, which will resolve the missing rule to the sentinel.
    pub async fn deactivate(&self, scope: &ScopeKey) -> DbResult<()> {
        debug!(scope = %scope, "Deactivating markup rule");

        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE markup_rules SET is_active = 0, updated_at = ?5, revision = revision + 1 \
             WHERE company_id = ?1 AND category_id = ?2 AND material = ?3 AND scope_ref = ?4 \
             AND is_active = 1",
        )
        .bind(&scope.company_id)
        .bind(&scope.category_id)
        .bind(scope.material)
        .bind(&scope.scope_ref)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("MarkupRule", scope.to_string()));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use timber_core::error::ValidationError;

    fn test_scope() -> ScopeKey {
        ScopeKey::new(
            Uuid::new_v4().to_string(),
            Uuid::new_v4().to_string(),
            Material::Laminate,
            Uuid::new_v4().to_string(),
        )
    }

    fn test_params() -> MarkupParameters {
        MarkupParameters::new(50.0, 10.0, 5.0, 5.0, ProfitRange::new(20.0, 40.0))
    }

    #[tokio::test]
    async fn test_find_unconfigured_scope_is_none() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let found = db.markup_rules().find_by_scope(&test_scope()).await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_upsert_creates_then_updates_in_place() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.markup_rules();
        let scope = test_scope();

        let created = repo.upsert(&scope, &test_params()).await.unwrap();
        assert_eq!(created.revision, 0);

        let mut changed = test_params();
        changed.skim_percentage = 12.5;
        let updated = repo.upsert(&scope, &changed).await.unwrap();

        // Same record, new values
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.revision, 1);

        let stored = repo.find_by_scope(&scope).await.unwrap().unwrap();
        assert_eq!(stored.params.skim_percentage, 12.5);
        assert_eq!(stored.revision, 1);
    }

    #[tokio::test]
    async fn test_upsert_rejects_invalid_rule() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.markup_rules();
        let scope = test_scope();

        // Inverted profit band
        let mut inverted = test_params();
        inverted.showroom_profit = ProfitRange::new(40.0, 20.0);
        let err = repo.upsert(&scope, &inverted).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Validation(ValidationError::InvertedRange { .. })
        ));

        // 100% skim would divide by zero downstream
        let mut divides = test_params();
        divides.skim_percentage = 100.0;
        assert!(repo.upsert(&scope, &divides).await.is_err());

        // Nothing was written
        assert!(repo.find_by_scope(&scope).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_deactivate() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.markup_rules();
        let scope = test_scope();

        repo.upsert(&scope, &test_params()).await.unwrap();
        repo.deactivate(&scope).await.unwrap();
        assert!(repo.find_by_scope(&scope).await.unwrap().is_none());

        // Deactivating an unconfigured scope is NotFound
        let err = repo.deactivate(&scope).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
