//! # Product Repository
//!
//! Catalog hooks for products.
//!
//! ## Key Operations
//! - CRUD on catalog attributes (name, category, base prices, reorder point)
//! - Activate / deactivate
//! - Guarded delete
//!
//! Stock is not a catalog attribute. Nothing in this file reads or writes
//! a quantity; see [`super::ledger`].
//!
//! ## Delete vs Deactivate
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Removing a Product                                   │
//! │                                                                         │
//! │  delete(id)                                                             │
//! │       │                                                                 │
//! │       ├── no ledger entries, no sales ──► row removed                   │
//! │       │                                                                 │
//! │       └── any history ──► ProductHasHistory (nothing removed)           │
//! │                                 │                                       │
//! │                                 ▼                                       │
//! │                          set_active(id, false)                          │
//! │                          (history stays valid, product hidden)          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use super::generate_id;
use super::ledger::lock_product;
use crate::error::DbResult;
use salon_core::validation::validate_new_product;
use salon_core::{CoreError, NewProduct, Product};

const PRODUCT_COLUMNS: &str = "id, tenant_id, name, category, base_sell_price_cents, \
     base_cost_price_cents, reorder_point, is_active, created_at, updated_at";

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
///
/// let product = repo.insert(&NewProduct { name: "Hair Oil".into(), .. }).await?;
/// let same = repo.get_by_id(&product.id).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
    tenant_id: String,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool, tenant_id: String) -> Self {
        ProductRepository { pool, tenant_id }
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        find_product(&mut conn, id).await
    }

    /// Lists active products of this tenant, sorted by name.
    pub async fn list_active(&self) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE tenant_id = ?1 AND is_active = 1 \
             ORDER BY name, id"
        );

        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(&self.tenant_id)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = products.len(), "Listed active products");
        Ok(products)
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Ok(Product)` - Inserted product with generated id and timestamps
    /// * `Err(DbError::Domain(Validation))` - Bad name or negative price
    pub async fn insert(&self, product: &NewProduct) -> DbResult<Product> {
        validate_new_product(product)?;

        let now = Utc::now();
        let product = Product {
            id: generate_id(),
            tenant_id: self.tenant_id.clone(),
            name: product.name.trim().to_string(),
            category: product.category.clone(),
            base_sell_price_cents: product.base_sell_price_cents,
            base_cost_price_cents: product.base_cost_price_cents,
            reorder_point: product.reorder_point,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %product.id, name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, tenant_id, name, category,
                base_sell_price_cents, base_cost_price_cents, reorder_point,
                is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&product.id)
        .bind(&product.tenant_id)
        .bind(&product.name)
        .bind(&product.category)
        .bind(product.base_sell_price_cents)
        .bind(product.base_cost_price_cents)
        .bind(product.reorder_point)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        info!(id = %product.id, "Product created");
        Ok(product)
    }

    /// Updates catalog attributes of an existing product.
    ///
    /// Prices changed here affect only future sales and the valuation
    /// fallback for products that were never received; recorded entries
    /// keep their own unit prices.
    pub async fn update(&self, id: &str, changes: &NewProduct) -> DbResult<Product> {
        validate_new_product(changes)?;

        debug!(id = %id, "Updating product");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?2,
                category = ?3,
                base_sell_price_cents = ?4,
                base_cost_price_cents = ?5,
                reorder_point = ?6,
                updated_at = ?7
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(changes.name.trim())
        .bind(&changes.category)
        .bind(changes.base_sell_price_cents)
        .bind(changes.base_cost_price_cents)
        .bind(changes.reorder_point)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::ProductNotFound(id.to_string()).into());
        }

        let mut conn = self.pool.acquire().await?;
        require_product(&mut conn, id).await
    }

    /// Activates or deactivates a product.
    ///
    /// Inactive products drop out of [`list_active`](Self::list_active) and
    /// the inventory summary; their ledger history is untouched.
    pub async fn set_active(&self, id: &str, active: bool) -> DbResult<()> {
        debug!(id = %id, active, "Setting product active flag");

        let result = sqlx::query("UPDATE products SET is_active = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(active)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::ProductNotFound(id.to_string()).into());
        }

        Ok(())
    }

    /// Deletes a product that has never been used.
    ///
    /// Runs under the product lock so no entry can be appended between the
    /// history check and the delete.
    ///
    /// ## Errors
    /// * `ProductNotFound` - No such product
    /// * `ProductHasHistory` - Ledger entries or sales reference it
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting product");

        let mut tx = self.pool.begin().await?;
        lock_product(&mut tx, id).await?;

        let entries: i64 = sqlx::query_scalar(
            r#"
            SELECT
                (SELECT COUNT(*) FROM inventory_logs WHERE product_id = ?1) +
                (SELECT COUNT(*) FROM sales WHERE product_id = ?1)
            "#,
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if entries > 0 {
            warn!(id = %id, entries, "Refusing to delete product with history");
            return Err(CoreError::ProductHasHistory {
                product_id: id.to_string(),
                entries,
            }
            .into());
        }

        sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(id = %id, "Product deleted");
        Ok(())
    }

    /// Counts active products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM products WHERE tenant_id = ?1 AND is_active = 1",
        )
        .bind(&self.tenant_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}

/// Reads one product on an existing connection or transaction.
pub(crate) async fn find_product(
    conn: &mut SqliteConnection,
    id: &str,
) -> DbResult<Option<Product>> {
    let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");

    let product = sqlx::query_as::<_, Product>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(product)
}

/// Like [`find_product`] but a missing row is `ProductNotFound`.
pub(crate) async fn require_product(conn: &mut SqliteConnection, id: &str) -> DbResult<Product> {
    find_product(conn, id)
        .await?
        .ok_or_else(|| CoreError::ProductNotFound(id.to_string()).into())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::error::ErrorCode;
    use crate::{Database, DbConfig};
    use chrono::NaiveDate;
    use salon_core::{NewLedgerEntry, NewProduct};

    fn shampoo() -> NewProduct {
        NewProduct {
            name: "Repair Shampoo 500ml".to_string(),
            category: Some("hair care".to_string()),
            base_sell_price_cents: 3200,
            base_cost_price_cents: 1500,
            reorder_point: 3,
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        let product = repo.insert(&shampoo()).await.unwrap();
        let loaded = repo.get_by_id(&product.id).await.unwrap().unwrap();

        assert_eq!(loaded.name, "Repair Shampoo 500ml");
        assert_eq!(loaded.base_cost_price_cents, 1500);
        assert!(loaded.is_active);
        assert!(repo.get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_rejects_blank_name() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut input = shampoo();
        input.name = "   ".to_string();

        let err = db.products().insert(&input).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_update_and_deactivate() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();
        let product = repo.insert(&shampoo()).await.unwrap();

        let mut changes = shampoo();
        changes.base_sell_price_cents = 3500;
        let updated = repo.update(&product.id, &changes).await.unwrap();
        assert_eq!(updated.base_sell_price_cents, 3500);

        repo.set_active(&product.id, false).await.unwrap();
        assert!(repo.list_active().await.unwrap().is_empty());
        assert_eq!(repo.count().await.unwrap(), 0);

        let err = repo.update("missing", &changes).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_delete_unused_product() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();
        let product = repo.insert(&shampoo()).await.unwrap();

        repo.delete(&product.id).await.unwrap();
        assert!(repo.get_by_id(&product.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_with_history_is_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = db.products().insert(&shampoo()).await.unwrap();
        let day = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        db.ledger()
            .append(&NewLedgerEntry::purchase(&product.id, 5, 1500, day))
            .await
            .unwrap();

        let err = db.products().delete(&product.id).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Conflict);
        assert!(db.products().get_by_id(&product.id).await.unwrap().is_some());
        assert_eq!(db.ledger().current_stock(&product.id).await.unwrap(), 5);
    }
}
