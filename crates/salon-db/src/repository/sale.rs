//! # Sale Repository
//!
//! Sale records and their paired ledger entries.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                    │
//! │                                                                         │
//! │  1. RECORD (catalog product)                                            │
//! │     └── record_sale()  ─ one transaction ─┐                             │
//! │           lock product                    │                             │
//! │           stock under lock ≥ quantity?    │  no → InsufficientStock,    │
//! │           INSERT sales                    │       nothing written       │
//! │           INSERT inventory_logs sale_out  │                             │
//! │             (related_sale_id = sale.id)   │                             │
//! │                                       COMMIT                            │
//! │                                                                         │
//! │  1b. RECORD (free text item)                                            │
//! │     └── record_free_sale() → sales row only, stock untouched            │
//! │                                                                         │
//! │  2. (OPTIONAL) REVERSE                                                  │
//! │     └── reverse_sale() ─ one transaction ─┐                             │
//! │           DELETE sales RETURNING          │                             │
//! │           DELETE paired sale_out entry    │  stock restored exactly     │
//! │           INSERT sale_reversals tombstone │  second call → AlreadyReversed
//! │                                       COMMIT                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every product-linked sale has exactly one `sale_out` entry pointing back
//! at it, and the pair is created and removed together.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use super::generate_id;
use super::ledger::{insert_entry, lock_product, stock_in};
use super::product::require_product;
use crate::error::{DbError, DbResult};
use salon_core::stock::apply_delta;
use salon_core::validation::{validate_new_free_sale, validate_new_sale};
use salon_core::{
    CoreError, LedgerEntry, LogType, Money, NewFreeSale, NewSale, Sale, SaleReversal,
    ValidationError,
};

const SALE_COLUMNS: &str = "id, tenant_id, customer_id, product_id, item_name, quantity, \
     unit_price_cents, total_price_cents, record_id, reason, logged_at, created_at";

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
    tenant_id: String,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool, tenant_id: String) -> Self {
        SaleRepository { pool, tenant_id }
    }

    /// Gets a sale by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let sql = format!("SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1");

        let sale = sqlx::query_as::<_, Sale>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(sale)
    }

    /// Sales of one customer, by business date.
    pub async fn list_for_customer(&self, customer_id: &str) -> DbResult<Vec<Sale>> {
        let sql = format!(
            "SELECT {SALE_COLUMNS} FROM sales \
             WHERE customer_id = ?1 \
             ORDER BY logged_at, created_at, rowid"
        );

        let sales = sqlx::query_as::<_, Sale>(&sql)
            .bind(customer_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(sales)
    }

    /// Sells a catalog product.
    ///
    /// The sale row and its `sale_out` entry commit together or not at all.
    /// The product name at the time of sale is kept as `item_name`.
    ///
    /// ## Errors
    /// * `InsufficientStock` - stock read under the product lock is short
    /// * `ProductNotFound`
    /// * `Validation` - quantity ≤ 0, negative price, blank ids
    pub async fn record_sale(&self, input: &NewSale) -> DbResult<Sale> {
        validate_new_sale(input)?;

        debug!(
            product_id = %input.product_id,
            customer_id = %input.customer_id,
            quantity = input.quantity,
            "Recording sale"
        );

        let mut tx = self.pool.begin().await?;
        lock_product(&mut tx, &input.product_id).await?;

        let product = require_product(&mut tx, &input.product_id).await?;
        let current = stock_in(&mut tx, &input.product_id).await?;
        let remaining = match apply_delta(
            &input.product_id,
            current,
            LogType::SaleOut,
            -input.quantity,
        ) {
            Ok(remaining) => remaining,
            Err(e) => {
                warn!(
                    product_id = %input.product_id,
                    available = current,
                    requested = input.quantity,
                    "Sale rejected"
                );
                return Err(e.into());
            }
        };

        let now = Utc::now();
        let sale = Sale {
            id: generate_id(),
            tenant_id: self.tenant_id.clone(),
            customer_id: input.customer_id.clone(),
            product_id: Some(product.id.clone()),
            item_name: product.name,
            quantity: input.quantity,
            unit_price_cents: input.unit_price_cents,
            total_price_cents: line_total(input.unit_price_cents, input.quantity)?,
            record_id: input.record_id.clone(),
            reason: input.reason.clone(),
            logged_at: input.logged_at,
            created_at: now,
        };
        insert_sale(&mut tx, &sale).await?;

        let entry = LedgerEntry {
            id: generate_id(),
            tenant_id: self.tenant_id.clone(),
            product_id: product.id,
            log_type: LogType::SaleOut,
            quantity: -input.quantity,
            unit_cost_price_cents: None,
            unit_sell_price_cents: Some(input.unit_price_cents),
            reason: input.reason.clone(),
            related_sale_id: Some(sale.id.clone()),
            logged_at: input.logged_at,
            created_at: now,
        };
        insert_entry(&mut tx, &entry).await?;

        tx.commit().await?;

        info!(
            sale_id = %sale.id,
            product_id = %input.product_id,
            quantity = sale.quantity,
            remaining,
            "Sale committed"
        );
        Ok(sale)
    }

    /// Records a sale of something outside the catalog. Stock is not
    /// touched and the sale has no ledger entry.
    pub async fn record_free_sale(&self, input: &NewFreeSale) -> DbResult<Sale> {
        validate_new_free_sale(input)?;

        let sale = Sale {
            id: generate_id(),
            tenant_id: self.tenant_id.clone(),
            customer_id: input.customer_id.clone(),
            product_id: None,
            item_name: input.item_name.trim().to_string(),
            quantity: input.quantity,
            unit_price_cents: input.unit_price_cents,
            total_price_cents: line_total(input.unit_price_cents, input.quantity)?,
            record_id: input.record_id.clone(),
            reason: None,
            logged_at: input.logged_at,
            created_at: Utc::now(),
        };

        debug!(sale_id = %sale.id, item_name = %sale.item_name, "Recording free sale");

        let mut conn = self.pool.acquire().await?;
        insert_sale(&mut conn, &sale).await?;

        info!(sale_id = %sale.id, "Free sale committed");
        Ok(sale)
    }

    /// Reverses a sale: removes it and its `sale_out` entry, restoring the
    /// sold quantity to stock.
    ///
    /// ## Errors
    /// * `AlreadyReversed` - the sale was reversed before
    /// * `SaleNotFound` - no such sale ever existed
    /// * `Integrity` - a product-linked sale without its ledger entry
    pub async fn reverse_sale(&self, sale_id: &str) -> DbResult<SaleReversal> {
        debug!(sale_id = %sale_id, "Reversing sale");

        let mut tx = self.pool.begin().await?;

        // First statement is the write: the sale row is gone for any
        // concurrent reversal from here on.
        let deleted: Option<(Option<String>, i64)> =
            sqlx::query_as("DELETE FROM sales WHERE id = ?1 RETURNING product_id, quantity")
                .bind(sale_id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some((product_id, quantity)) = deleted else {
            let reversed: Option<i64> =
                sqlx::query_scalar("SELECT 1 FROM sale_reversals WHERE sale_id = ?1")
                    .bind(sale_id)
                    .fetch_optional(&mut *tx)
                    .await?;

            warn!(sale_id = %sale_id, already_reversed = reversed.is_some(), "Reversal rejected");
            return Err(match reversed {
                Some(_) => CoreError::AlreadyReversed(sale_id.to_string()),
                None => CoreError::SaleNotFound(sale_id.to_string()),
            }
            .into());
        };

        let (restored_quantity, remaining_stock) = match &product_id {
            Some(product_id) => {
                let entry_quantity: Option<i64> = sqlx::query_scalar(
                    "DELETE FROM inventory_logs WHERE related_sale_id = ?1 RETURNING quantity",
                )
                .bind(sale_id)
                .fetch_optional(&mut *tx)
                .await?;

                if entry_quantity != Some(-quantity) {
                    return Err(DbError::Integrity(format!(
                        "sale {sale_id} of {quantity} has paired entry {entry_quantity:?}"
                    )));
                }

                (quantity, Some(stock_in(&mut tx, product_id).await?))
            }
            None => (0, None),
        };

        sqlx::query(
            r#"
            INSERT INTO sale_reversals (sale_id, tenant_id, product_id, restored_quantity, reversed_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(sale_id)
        .bind(&self.tenant_id)
        .bind(&product_id)
        .bind(restored_quantity)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            sale_id = %sale_id,
            restored_quantity,
            remaining_stock = ?remaining_stock,
            "Sale reversed"
        );

        Ok(SaleReversal {
            sale_id: sale_id.to_string(),
            product_id,
            restored_quantity,
            remaining_stock,
        })
    }
}

async fn insert_sale(conn: &mut sqlx::SqliteConnection, sale: &Sale) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO sales (
            id, tenant_id, customer_id, product_id, item_name,
            quantity, unit_price_cents, total_price_cents,
            record_id, reason, logged_at, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )
    .bind(&sale.id)
    .bind(&sale.tenant_id)
    .bind(&sale.customer_id)
    .bind(&sale.product_id)
    .bind(&sale.item_name)
    .bind(sale.quantity)
    .bind(sale.unit_price_cents)
    .bind(sale.total_price_cents)
    .bind(&sale.record_id)
    .bind(&sale.reason)
    .bind(sale.logged_at)
    .bind(sale.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// `unit × quantity` in minor units, refusing totals that overflow.
fn line_total(unit_price_cents: i64, quantity: i64) -> DbResult<i64> {
    Money::from_cents(unit_price_cents)
        .checked_multiply_quantity(quantity)
        .map(|total| total.cents())
        .ok_or_else(|| {
            ValidationError::OutOfRange {
                field: "total_price_cents".to_string(),
                min: 0,
                max: i64::MAX,
            }
            .into()
        })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::error::ErrorCode;
    use crate::{Database, DbConfig};
    use chrono::NaiveDate;
    use salon_core::{LogType, NewFreeSale, NewLedgerEntry, NewProduct, NewSale, Product};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    async fn stocked(units: i64) -> (Database, Product) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = db
            .products()
            .insert(&NewProduct {
                name: "Color Protect Conditioner".to_string(),
                category: Some("hair care".to_string()),
                base_sell_price_cents: 2800,
                base_cost_price_cents: 1100,
                reorder_point: 1,
            })
            .await
            .unwrap();
        db.ledger()
            .append(&NewLedgerEntry::purchase(&product.id, units, 1100, day(1)))
            .await
            .unwrap();
        (db, product)
    }

    fn sale_of(product: &Product, quantity: i64) -> NewSale {
        NewSale {
            product_id: product.id.clone(),
            customer_id: "cust-7".to_string(),
            quantity,
            unit_price_cents: 2800,
            logged_at: day(3),
            reason: None,
            record_id: Some("visit-12".to_string()),
        }
    }

    #[tokio::test]
    async fn test_record_sale_pairs_with_entry() {
        let (db, product) = stocked(5).await;

        let sale = db.sales().record_sale(&sale_of(&product, 2)).await.unwrap();
        assert_eq!(sale.total_price_cents, 5600);
        assert_eq!(sale.item_name, "Color Protect Conditioner");
        assert!(sale.is_product_linked());

        let entries = db.ledger().list_entries(&product.id, None).await.unwrap();
        let sale_entries: Vec<_> = entries
            .iter()
            .filter(|e| e.log_type == LogType::SaleOut)
            .collect();
        assert_eq!(sale_entries.len(), 1);
        assert_eq!(sale_entries[0].quantity, -2);
        assert_eq!(sale_entries[0].related_sale_id.as_deref(), Some(sale.id.as_str()));
        assert_eq!(sale_entries[0].unit_sell_price_cents, Some(2800));

        assert_eq!(db.ledger().current_stock(&product.id).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_insufficient_stock_leaves_no_sale() {
        let (db, product) = stocked(1).await;

        let err = db.sales().record_sale(&sale_of(&product, 2)).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InsufficientStock);

        assert!(db.sales().list_for_customer("cust-7").await.unwrap().is_empty());
        assert_eq!(db.ledger().current_stock(&product.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_zero_quantity_is_validation_error() {
        let (db, product) = stocked(1).await;
        let err = db.sales().record_sale(&sale_of(&product, 0)).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_overflowing_price_is_validation_error() {
        let (db, product) = stocked(5).await;

        let pricey = NewSale {
            unit_price_cents: i64::MAX / 2,
            ..sale_of(&product, 3)
        };
        let err = db.sales().record_sale(&pricey).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        let err = db
            .sales()
            .record_free_sale(&NewFreeSale {
                item_name: "Bridal styling".to_string(),
                customer_id: "cust-7".to_string(),
                quantity: 3,
                unit_price_cents: i64::MAX / 2,
                logged_at: day(3),
                record_id: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        assert!(db.sales().list_for_customer("cust-7").await.unwrap().is_empty());
        assert_eq!(db.ledger().current_stock(&product.id).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_reverse_restores_stock_once() {
        let (db, product) = stocked(4).await;
        let sale = db.sales().record_sale(&sale_of(&product, 3)).await.unwrap();
        assert_eq!(db.ledger().current_stock(&product.id).await.unwrap(), 1);

        let reversal = db.sales().reverse_sale(&sale.id).await.unwrap();
        assert_eq!(reversal.restored_quantity, 3);
        assert_eq!(reversal.remaining_stock, Some(4));
        assert_eq!(db.ledger().current_stock(&product.id).await.unwrap(), 4);
        assert!(db.sales().get_by_id(&sale.id).await.unwrap().is_none());

        let err = db.sales().reverse_sale(&sale.id).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::AlreadyReversed);
        assert_eq!(db.ledger().current_stock(&product.id).await.unwrap(), 4);

        let err = db.sales().reverse_sale("never-existed").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_free_sale_does_not_touch_stock() {
        let (db, product) = stocked(2).await;

        let sale = db
            .sales()
            .record_free_sale(&NewFreeSale {
                item_name: "Head spa add-on".to_string(),
                customer_id: "cust-7".to_string(),
                quantity: 1,
                unit_price_cents: 1500,
                logged_at: day(4),
                record_id: None,
            })
            .await
            .unwrap();
        assert!(sale.product_id.is_none());
        assert_eq!(db.ledger().current_stock(&product.id).await.unwrap(), 2);

        let reversal = db.sales().reverse_sale(&sale.id).await.unwrap();
        assert_eq!(reversal.restored_quantity, 0);
        assert_eq!(reversal.remaining_stock, None);
        assert_eq!(db.ledger().list_entries(&product.id, None).await.unwrap().len(), 1);
    }
}
