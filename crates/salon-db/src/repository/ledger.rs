//! # Ledger Repository
//!
//! Append-only, signed-delta log of stock movements per product.
//!
//! ## Stock Is a Sum
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Hair Oil (product p-1)                               │
//! │                                                                         │
//! │  logged_at   log_type     quantity   unit_cost   running                │
//! │  ──────────  ───────────  ────────   ─────────   ───────                │
//! │  2026-03-01  purchase_in     +10       1200         10                  │
//! │  2026-03-04  sale_out         -2          -          8                  │
//! │  2026-03-09  sample_out       -1          -          7                  │
//! │  2026-03-31  adjust           -1          -          6  "stocktake"     │
//! │                                                                         │
//! │  current_stock = SUM(quantity) = 6                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Entries are never updated. The only delete is the paired `sale_out`
//! removed together with its sale by [`super::sale`].
//!
//! The crate-level helpers at the bottom ([`lock_product`], [`stock_in`],
//! [`insert_entry`]) are the building blocks every inventory write uses
//! inside its own transaction.

use std::collections::BTreeMap;

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use super::generate_id;
use super::product::require_product;
use crate::error::{DbError, DbResult};
use salon_core::stock::apply_delta;
use salon_core::validation::{validate_date_range, validate_new_entry};
use salon_core::valuation::{valuation_as_of, weighted_average_cost};
use salon_core::{
    CoreError, DateRange, InventorySummaryRow, LedgerEntry, LogType, NewLedgerEntry, Product,
    ValidationError,
};

pub(crate) const ENTRY_COLUMNS: &str = "id, tenant_id, product_id, log_type, quantity, \
     unit_cost_price_cents, unit_sell_price_cents, reason, related_sale_id, logged_at, created_at";

/// Repository for ledger reads and direct ledger entries.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    pool: SqlitePool,
    tenant_id: String,
}

impl LedgerRepository {
    /// Creates a new LedgerRepository.
    pub fn new(pool: SqlitePool, tenant_id: String) -> Self {
        LedgerRepository { pool, tenant_id }
    }

    /// Current stock of a product.
    ///
    /// A display read. Writes never reuse this value; they re-read stock
    /// under their own lock.
    pub async fn current_stock(&self, product_id: &str) -> DbResult<i64> {
        let stock: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT (SELECT COALESCE(SUM(quantity), 0) FROM inventory_logs WHERE product_id = p.id)
            FROM products p
            WHERE p.id = ?1
            "#,
        )
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;

        stock.ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()).into())
    }

    /// Weighted-average unit cost over every receipt to date, in minor
    /// units. Falls back to the catalog cost for products never received.
    pub async fn weighted_average_cost(&self, product_id: &str) -> DbResult<Decimal> {
        let mut tx = self.pool.begin().await?;
        let product = require_product(&mut tx, product_id).await?;
        let entries = entries_for(&mut tx, product_id).await?;
        tx.commit().await?;

        Ok(weighted_average_cost(
            &entries,
            None,
            product.base_cost_price(),
        ))
    }

    /// Appends one entry from a receive / sample / waste / return / adjust
    /// screen.
    ///
    /// ## Flow
    /// 1. Validate shape (sign per log type, cost on `purchase_in`, reason
    ///    on `waste_out` / `adjust`)
    /// 2. Lock the product, read stock inside the same transaction
    /// 3. Reject if the result would go below zero
    /// 4. Insert and commit
    ///
    /// `sale_out` is not accepted here: sales go through
    /// [`SaleRepository::record_sale`](super::sale::SaleRepository::record_sale)
    /// so that every sale entry has its sale record.
    pub async fn append(&self, entry: &NewLedgerEntry) -> DbResult<LedgerEntry> {
        validate_new_entry(entry)?;
        if entry.log_type == LogType::SaleOut {
            return Err(ValidationError::NotAllowed {
                field: "log_type".to_string(),
                reason: "sale_out entries are written together with their sale".to_string(),
            }
            .into());
        }

        debug!(
            product_id = %entry.product_id,
            log_type = %entry.log_type,
            quantity = entry.quantity,
            "Appending ledger entry"
        );

        let mut tx = self.pool.begin().await?;
        lock_product(&mut tx, &entry.product_id).await?;

        let current = stock_in(&mut tx, &entry.product_id).await?;
        let next = match apply_delta(&entry.product_id, current, entry.log_type, entry.quantity) {
            Ok(next) => next,
            Err(e) => {
                warn!(product_id = %entry.product_id, current, quantity = entry.quantity, "Entry rejected");
                return Err(e.into());
            }
        };

        let stored = LedgerEntry {
            id: generate_id(),
            tenant_id: self.tenant_id.clone(),
            product_id: entry.product_id.clone(),
            log_type: entry.log_type,
            quantity: entry.quantity,
            unit_cost_price_cents: entry.unit_cost_price_cents,
            unit_sell_price_cents: entry.unit_sell_price_cents,
            reason: entry.reason.clone(),
            related_sale_id: None,
            logged_at: entry.logged_at,
            created_at: Utc::now(),
        };
        insert_entry(&mut tx, &stored).await?;

        tx.commit().await?;

        info!(
            id = %stored.id,
            product_id = %stored.product_id,
            log_type = %stored.log_type,
            quantity = stored.quantity,
            stock = next,
            "Ledger entry committed"
        );
        Ok(stored)
    }

    /// Entries of one product ordered by `(logged_at, created_at)`, ties
    /// broken by insertion order. Optionally limited to a business-date
    /// range (both ends inclusive).
    pub async fn list_entries(
        &self,
        product_id: &str,
        range: Option<DateRange>,
    ) -> DbResult<Vec<LedgerEntry>> {
        if let Some(range) = &range {
            validate_date_range(range)?;
        }

        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM inventory_logs \
             WHERE product_id = ?1 \
               AND (?2 IS NULL OR logged_at >= ?2) \
               AND (?3 IS NULL OR logged_at <= ?3) \
             ORDER BY logged_at, created_at, rowid"
        );

        let entries = sqlx::query_as::<_, LedgerEntry>(&sql)
            .bind(product_id)
            .bind(range.map(|r| r.start))
            .bind(range.map(|r| r.end))
            .fetch_all(&self.pool)
            .await?;

        debug!(product_id = %product_id, count = entries.len(), "Listed ledger entries");
        Ok(entries)
    }

    /// Every active product with stock, cost and reorder flag.
    ///
    /// Read in one transaction so all rows come from the same snapshot.
    pub async fn inventory_summary(&self) -> DbResult<Vec<InventorySummaryRow>> {
        let mut tx = self.pool.begin().await?;
        let products = active_products(&mut tx, &self.tenant_id).await?;
        let mut entries = tenant_entries(&mut tx, &self.tenant_id).await?;
        tx.commit().await?;

        let rows: Vec<InventorySummaryRow> = products
            .into_iter()
            .map(|product| {
                let history = entries.remove(&product.id).unwrap_or_default();
                summary_row(product, &history)
            })
            .collect();

        debug!(count = rows.len(), "Built inventory summary");
        Ok(rows)
    }

    /// Rows of [`inventory_summary`](Self::inventory_summary) at or below
    /// their reorder point.
    pub async fn low_stock(&self) -> DbResult<Vec<InventorySummaryRow>> {
        let rows = self.inventory_summary().await?;
        Ok(rows.into_iter().filter(|row| row.needs_reorder).collect())
    }
}

fn summary_row(product: Product, history: &[LedgerEntry]) -> InventorySummaryRow {
    let valuation = valuation_as_of(history, None, product.base_cost_price());

    InventorySummaryRow {
        needs_reorder: valuation.stock <= product.reorder_point,
        current_stock: valuation.stock,
        reorder_point: product.reorder_point,
        weighted_average_cost: valuation.weighted_average_cost,
        stock_value: valuation.value_money(),
        product_id: product.id,
        name: product.name,
        category: product.category,
    }
}

// =============================================================================
// Transaction building blocks
// =============================================================================

/// Takes the write lock on a product row.
///
/// Must be the first statement of the transaction. SQLite grants the
/// database write lock here, so every later read in the same transaction
/// sees state no other writer can change before commit.
///
/// ## Errors
/// `ProductNotFound` when the row does not exist.
pub(crate) async fn lock_product(conn: &mut SqliteConnection, product_id: &str) -> DbResult<()> {
    let result = sqlx::query("UPDATE products SET lock_version = lock_version + 1 WHERE id = ?1")
        .bind(product_id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(CoreError::ProductNotFound(product_id.to_string()).into());
    }

    Ok(())
}

/// Stock of a product as seen by the current transaction.
pub(crate) async fn stock_in(conn: &mut SqliteConnection, product_id: &str) -> DbResult<i64> {
    let stock: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(quantity), 0) FROM inventory_logs WHERE product_id = ?1",
    )
    .bind(product_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(stock)
}

/// Inserts a fully built entry.
pub(crate) async fn insert_entry(conn: &mut SqliteConnection, entry: &LedgerEntry) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO inventory_logs (
            id, tenant_id, product_id, log_type, quantity,
            unit_cost_price_cents, unit_sell_price_cents, reason,
            related_sale_id, logged_at, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        "#,
    )
    .bind(&entry.id)
    .bind(&entry.tenant_id)
    .bind(&entry.product_id)
    .bind(entry.log_type)
    .bind(entry.quantity)
    .bind(entry.unit_cost_price_cents)
    .bind(entry.unit_sell_price_cents)
    .bind(&entry.reason)
    .bind(&entry.related_sale_id)
    .bind(entry.logged_at)
    .bind(entry.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Full history of one product in ledger order.
pub(crate) async fn entries_for(
    conn: &mut SqliteConnection,
    product_id: &str,
) -> DbResult<Vec<LedgerEntry>> {
    let sql = format!(
        "SELECT {ENTRY_COLUMNS} FROM inventory_logs \
         WHERE product_id = ?1 \
         ORDER BY logged_at, created_at, rowid"
    );

    let entries = sqlx::query_as::<_, LedgerEntry>(&sql)
        .bind(product_id)
        .fetch_all(&mut *conn)
        .await?;

    Ok(entries)
}

/// Active products of a tenant, by name.
pub(crate) async fn active_products(
    conn: &mut SqliteConnection,
    tenant_id: &str,
) -> DbResult<Vec<Product>> {
    let products = sqlx::query_as::<_, Product>(
        r#"
        SELECT id, tenant_id, name, category, base_sell_price_cents,
               base_cost_price_cents, reorder_point, is_active, created_at, updated_at
        FROM products
        WHERE tenant_id = ?1 AND is_active = 1
        ORDER BY name, id
        "#,
    )
    .bind(tenant_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(products)
}

/// Every entry of a tenant grouped by product, each group in ledger order.
pub(crate) async fn tenant_entries(
    conn: &mut SqliteConnection,
    tenant_id: &str,
) -> DbResult<BTreeMap<String, Vec<LedgerEntry>>> {
    let sql = format!(
        "SELECT {ENTRY_COLUMNS} FROM inventory_logs \
         WHERE tenant_id = ?1 \
         ORDER BY product_id, logged_at, created_at, rowid"
    );

    let rows = sqlx::query_as::<_, LedgerEntry>(&sql)
        .bind(tenant_id)
        .fetch_all(&mut *conn)
        .await?;

    let mut grouped: BTreeMap<String, Vec<LedgerEntry>> = BTreeMap::new();
    for entry in rows {
        grouped.entry(entry.product_id.clone()).or_default().push(entry);
    }

    Ok(grouped)
}

/// Stock of several products on one connection, for diff computation.
pub(crate) async fn stock_by_product(
    conn: &mut SqliteConnection,
    product_ids: &[&str],
) -> DbResult<BTreeMap<String, i64>> {
    let mut stock = BTreeMap::new();
    for &product_id in product_ids {
        let row: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT (SELECT COALESCE(SUM(quantity), 0) FROM inventory_logs WHERE product_id = p.id)
            FROM products p
            WHERE p.id = ?1
            "#,
        )
        .bind(product_id)
        .fetch_optional(&mut *conn)
        .await?;

        match row {
            Some(value) => {
                stock.insert(product_id.to_string(), value);
            }
            None => return Err(DbError::from(CoreError::ProductNotFound(product_id.to_string()))),
        }
    }

    Ok(stock)
}

// =============================================================================
// Unit Tests
// =============================================================================
