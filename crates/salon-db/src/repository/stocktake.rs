//! # Stocktake Repository
//!
//! Reconciles physically counted quantities with ledger stock.
//!
//! ```text
//! counted (shelf)        system (ledger)        diff
//! ───────────────        ───────────────        ────────────────
//! p-1  →  4              p-1  →  6              p-1  -2
//! p-2  →  9              p-2  →  9              (no change, omitted)
//! p-3  →  1              p-3  →  0              p-3  +1
//!
//! commit(diff, 2026-03-31, "stocktake 2026-03")
//!   → one `adjust` entry per diff, same date and label, one transaction
//! ```
//!
//! The diff is a display read. Stock may move before the commit; the
//! commit re-reads every product under lock and fails as a whole if any
//! adjustment would leave stock below zero.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{NaiveDate, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use super::generate_id;
use super::ledger::{insert_entry, lock_product, stock_by_product, stock_in};
use crate::error::DbResult;
use salon_core::stock::apply_delta;
use salon_core::validation::{validate_reason, validate_stocktake_diff};
use salon_core::{stocktake, LedgerEntry, LogType, StocktakeDiff, ValidationError};

/// Repository for stocktake reconciliation.
#[derive(Debug, Clone)]
pub struct StocktakeRepository {
    pool: SqlitePool,
    tenant_id: String,
}

impl StocktakeRepository {
    /// Creates a new StocktakeRepository.
    pub fn new(pool: SqlitePool, tenant_id: String) -> Self {
        StocktakeRepository { pool, tenant_id }
    }

    /// Compares counted quantities with current stock.
    ///
    /// Returns only products whose count differs, ordered by product id.
    ///
    /// ## Errors
    /// * `ProductNotFound` - a counted id is not a product
    /// * `Validation` - a negative count
    pub async fn compute_diff(
        &self,
        counted: &BTreeMap<String, i64>,
    ) -> DbResult<Vec<StocktakeDiff>> {
        debug!(products = counted.len(), "Computing stocktake diff");

        let ids: Vec<&str> = counted.keys().map(String::as_str).collect();

        let mut tx = self.pool.begin().await?;
        let system = stock_by_product(&mut tx, &ids).await?;
        tx.commit().await?;

        let diffs = stocktake::compute_diff(&system, counted)?;

        debug!(differences = diffs.len(), "Stocktake diff computed");
        Ok(diffs)
    }

    /// Applies a diff as `adjust` entries sharing one date and label.
    ///
    /// All or nothing: products are locked in ascending id order, stock is
    /// re-read under lock, and the first adjustment that would go below
    /// zero rolls the whole batch back. Re-diff and retry in that case.
    ///
    /// ## Errors
    /// * `Validation` - blank reason, duplicate product, or a line whose
    ///   delta is zero, disagrees with `counted - system`, or exceeds
    ///   [`salon_core::MAX_ENTRY_QUANTITY`]
    /// * `InsufficientStock` - an adjustment would leave stock below zero
    pub async fn commit(
        &self,
        diffs: &[StocktakeDiff],
        logged_at: NaiveDate,
        reason: &str,
    ) -> DbResult<Vec<LedgerEntry>> {
        validate_reason(Some(reason), true)?;

        let mut ordered: Vec<&StocktakeDiff> = diffs.iter().collect();
        ordered.sort_by(|a, b| a.product_id.cmp(&b.product_id));

        let mut seen = BTreeSet::new();
        for diff in &ordered {
            if !seen.insert(diff.product_id.as_str()) {
                return Err(ValidationError::NotAllowed {
                    field: "diffs".to_string(),
                    reason: format!("product {} appears more than once", diff.product_id),
                }
                .into());
            }
            validate_stocktake_diff(diff)?;
        }

        if ordered.is_empty() {
            return Ok(Vec::new());
        }

        debug!(products = ordered.len(), reason = %reason, "Committing stocktake");

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        let mut entries = Vec::with_capacity(ordered.len());

        for diff in ordered {
            lock_product(&mut tx, &diff.product_id).await?;

            let current = stock_in(&mut tx, &diff.product_id).await?;
            if current != diff.system_stock {
                warn!(
                    product_id = %diff.product_id,
                    diffed = diff.system_stock,
                    current,
                    "Stock moved since the diff was computed"
                );
            }

            if let Err(e) = apply_delta(&diff.product_id, current, LogType::Adjust, diff.delta) {
                warn!(product_id = %diff.product_id, current, delta = diff.delta, "Stocktake rejected");
                return Err(e.into());
            }

            let entry = LedgerEntry {
                id: generate_id(),
                tenant_id: self.tenant_id.clone(),
                product_id: diff.product_id.clone(),
                log_type: LogType::Adjust,
                quantity: diff.delta,
                unit_cost_price_cents: None,
                unit_sell_price_cents: None,
                reason: Some(reason.to_string()),
                related_sale_id: None,
                logged_at,
                created_at: now,
            };
            insert_entry(&mut tx, &entry).await?;
            entries.push(entry);
        }

        tx.commit().await?;

        info!(entries = entries.len(), reason = %reason, "Stocktake committed");
        Ok(entries)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use crate::error::ErrorCode;
    use crate::{Database, DbConfig};
    use chrono::NaiveDate;
    use salon_core::stocktake::stocktake_label;
    use salon_core::{LogType, NewLedgerEntry, NewProduct, NewSale, Product, StocktakeDiff};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    async fn product(db: &Database, name: &str, units: i64) -> Product {
        let product = db
            .products()
            .insert(&NewProduct {
                name: name.to_string(),
                category: None,
                base_sell_price_cents: 2000,
                base_cost_price_cents: 900,
                reorder_point: 0,
            })
            .await
            .unwrap();
        if units > 0 {
            db.ledger()
                .append(&NewLedgerEntry::purchase(&product.id, units, 900, day(1)))
                .await
                .unwrap();
        }
        product
    }

    #[tokio::test]
    async fn test_diff_then_commit_converges() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let a = product(&db, "Curl Cream", 6).await;
        let b = product(&db, "Hair Mask", 9).await;
        let c = product(&db, "Scalp Tonic", 0).await;

        let counted = BTreeMap::from([
            (a.id.clone(), 4),
            (b.id.clone(), 9),
            (c.id.clone(), 1),
        ]);

        let repo = db.stocktake();
        let diffs = repo.compute_diff(&counted).await.unwrap();
        assert_eq!(diffs.len(), 2);
        assert!(diffs.iter().all(|d| d.delta != 0));

        let label = stocktake_label(2026, 3);
        let entries = repo.commit(&diffs, day(31), &label).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.log_type == LogType::Adjust));
        assert!(entries.iter().all(|e| e.reason.as_deref() == Some("stocktake 2026-03")));

        for (product_id, count) in &counted {
            assert_eq!(db.ledger().current_stock(product_id).await.unwrap(), *count);
        }
        assert!(repo.compute_diff(&counted).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_commit_is_all_or_nothing() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let a = product(&db, "Curl Cream", 3).await;
        let b = product(&db, "Hair Mask", 2).await;

        let counted = BTreeMap::from([(a.id.clone(), 5), (b.id.clone(), 0)]);
        let diffs = db.stocktake().compute_diff(&counted).await.unwrap();
        assert_eq!(diffs.len(), 2);

        // Both units of b are sold between diff and commit.
        db.sales()
            .record_sale(&NewSale {
                product_id: b.id.clone(),
                customer_id: "cust-1".to_string(),
                quantity: 2,
                unit_price_cents: 2000,
                logged_at: day(20),
                reason: None,
                record_id: None,
            })
            .await
            .unwrap();

        let err = db
            .stocktake()
            .commit(&diffs, day(31), "stocktake 2026-03")
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InsufficientStock);

        assert_eq!(db.ledger().current_stock(&a.id).await.unwrap(), 3);
        assert_eq!(db.ledger().current_stock(&b.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_commit_input_checks() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let a = product(&db, "Curl Cream", 3).await;
        let diff = StocktakeDiff {
            product_id: a.id.clone(),
            system_stock: 3,
            counted_stock: 2,
            delta: -1,
        };

        let err = db.stocktake().commit(&[diff.clone()], day(31), " ").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        let err = db
            .stocktake()
            .commit(&[diff.clone(), diff], day(31), "stocktake 2026-03")
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        assert!(db
            .stocktake()
            .commit(&[], day(31), "stocktake 2026-03")
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_commit_rejects_inconsistent_or_oversized_lines() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let a = product(&db, "Curl Cream", 3).await;

        let inconsistent = StocktakeDiff {
            product_id: a.id.clone(),
            system_stock: 3,
            counted_stock: 2,
            delta: 40,
        };
        let err = db
            .stocktake()
            .commit(&[inconsistent], day(31), "stocktake 2026-03")
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        let oversized = StocktakeDiff {
            product_id: a.id.clone(),
            system_stock: 3,
            counted_stock: i64::MAX,
            delta: i64::MAX - 3,
        };
        let err = db
            .stocktake()
            .commit(&[oversized], day(31), "stocktake 2026-03")
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        assert_eq!(db.ledger().current_stock(&a.id).await.unwrap(), 3);
        assert_eq!(db.ledger().list_entries(&a.id, None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_huge_count_is_rejected_and_product_stays_readable() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let a = product(&db, "Curl Cream", 5).await;

        let counted = BTreeMap::from([(a.id.clone(), i64::MAX)]);
        let err = db.stocktake().compute_diff(&counted).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        db.ledger()
            .append(&NewLedgerEntry::purchase(&a.id, 1, 900, day(2)))
            .await
            .unwrap();
        assert_eq!(db.ledger().current_stock(&a.id).await.unwrap(), 6);
    }

    #[tokio::test]
    async fn test_unknown_product_in_count() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let counted = BTreeMap::from([("missing".to_string(), 1)]);
        let err = db.stocktake().compute_diff(&counted).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }
}
