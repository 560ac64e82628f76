//! # Report Repository
//!
//! Read-only valuation over the ledger: point-in-time stock value and
//! period cost of goods sold for the tax export.
//!
//! ## Period Cost of Goods Sold
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   opening value        value of stock at the end of the day before     │
//! │ + purchases value      Σ qty × unit cost of purchase_in in the range   │
//! │ − closing value        value of stock at the end of the last day       │
//! │ ─────────────────                                                       │
//! │ = cost of goods sold                                                    │
//! │                                                                         │
//! │  Each value = replayed stock × weighted-average cost as of that day.   │
//! │  Products are summed unrounded; the total is rounded once.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing here is ever used to decide whether a write may proceed.

use chrono::NaiveDate;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use super::ledger::{entries_for, tenant_entries};
use super::product::require_product;
use crate::error::DbResult;
use salon_core::validation::validate_date_range;
use salon_core::valuation::{period_valuation, valuation_as_of, PeriodValuation};
use salon_core::{DateRange, Money, PeriodReport, Product};

/// Repository for valuation reads.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
    tenant_id: String,
}

impl ReportRepository {
    /// Creates a new ReportRepository.
    pub fn new(pool: SqlitePool, tenant_id: String) -> Self {
        ReportRepository { pool, tenant_id }
    }

    /// Stock × weighted-average cost, now or as of the end of `as_of`.
    pub async fn stock_value(&self, product_id: &str, as_of: Option<NaiveDate>) -> DbResult<Money> {
        let mut tx = self.pool.begin().await?;
        let product = require_product(&mut tx, product_id).await?;
        let entries = entries_for(&mut tx, product_id).await?;
        tx.commit().await?;

        let valuation = valuation_as_of(&entries, as_of, product.base_cost_price());

        debug!(
            product_id = %product_id,
            as_of = ?as_of,
            stock = valuation.stock,
            "Valued stock"
        );
        Ok(valuation.value_money())
    }

    /// Opening + purchases − closing over every product of the tenant.
    pub async fn period_cost_of_goods_sold(&self, range: DateRange) -> DbResult<Money> {
        let totals = self.period_totals(range).await?;
        Ok(Money::from_decimal_rounded(totals.cost_of_goods_sold()))
    }

    /// Period figures plus sales revenue, for the tax export.
    pub async fn period_report(&self, range: DateRange) -> DbResult<PeriodReport> {
        let totals = self.period_totals(range).await?;

        let revenue: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(total_price_cents), 0)
            FROM sales
            WHERE tenant_id = ?1 AND logged_at >= ?2 AND logged_at <= ?3
            "#,
        )
        .bind(&self.tenant_id)
        .bind(range.start)
        .bind(range.end)
        .fetch_one(&self.pool)
        .await?;

        Ok(PeriodReport {
            range,
            opening_value: Money::from_decimal_rounded(totals.opening_value),
            purchases_value: Money::from_decimal_rounded(totals.purchases_value),
            closing_value: Money::from_decimal_rounded(totals.closing_value),
            cost_of_goods_sold: Money::from_decimal_rounded(totals.cost_of_goods_sold()),
            sales_revenue: Money::from_cents(revenue),
        })
    }

    async fn period_totals(&self, range: DateRange) -> DbResult<PeriodValuation> {
        validate_date_range(&range)?;

        let mut tx = self.pool.begin().await?;
        let products = all_products(&mut tx, &self.tenant_id).await?;
        let entries = tenant_entries(&mut tx, &self.tenant_id).await?;
        tx.commit().await?;

        let mut totals = PeriodValuation::default();
        for product in &products {
            let Some(history) = entries.get(&product.id) else {
                continue;
            };
            totals += period_valuation(history, &range, product.base_cost_price());
        }

        debug!(
            start = %range.start,
            end = %range.end,
            products = products.len(),
            "Aggregated period valuation"
        );
        Ok(totals)
    }
}

/// Every product of a tenant, active or not; inactive products can still
/// hold stock that has to be valued.
async fn all_products(conn: &mut SqliteConnection, tenant_id: &str) -> DbResult<Vec<Product>> {
    let products = sqlx::query_as::<_, Product>(
        r#"
        SELECT id, tenant_id, name, category, base_sell_price_cents,
               base_cost_price_cents, reorder_point, is_active, created_at, updated_at
        FROM products
        WHERE tenant_id = ?1
        ORDER BY id
        "#,
    )
    .bind(tenant_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(products)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::error::ErrorCode;
    use crate::{Database, DbConfig};
    use chrono::NaiveDate;
    use salon_core::{DateRange, LogType, NewLedgerEntry, NewProduct, NewSale, Product};

    fn d(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, month, day).unwrap()
    }

    async fn serum(db: &Database) -> Product {
        db.products()
            .insert(&NewProduct {
                name: "Hair Serum".to_string(),
                category: Some("hair care".to_string()),
                base_sell_price_cents: 5000,
                base_cost_price_cents: 1800,
                reorder_point: 2,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_stock_value_now_and_as_of() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let p = serum(&db).await;

        db.ledger()
            .append(&NewLedgerEntry::purchase(&p.id, 10, 100, d(3, 1)))
            .await
            .unwrap();
        db.ledger()
            .append(&NewLedgerEntry::purchase(&p.id, 10, 200, d(3, 15)))
            .await
            .unwrap();

        // After both receipts: 20 units at 150.
        let now = db.reports().stock_value(&p.id, None).await.unwrap();
        assert_eq!(now.cents(), 3000);

        // Before the second receipt: 10 units at 100.
        let early = db.reports().stock_value(&p.id, Some(d(3, 10))).await.unwrap();
        assert_eq!(early.cents(), 1000);
    }

    #[tokio::test]
    async fn test_never_received_product_is_worth_nothing() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let p = serum(&db).await;
        assert!(db.reports().stock_value(&p.id, None).await.unwrap().is_zero());
    }

    #[tokio::test]
    async fn test_period_report() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let p = serum(&db).await;

        // February: 10 in at 100 → opening for March is 1000.
        db.ledger()
            .append(&NewLedgerEntry::purchase(&p.id, 10, 100, d(2, 10)))
            .await
            .unwrap();
        // March: 10 more at 100, 6 sold, 1 wasted.
        db.ledger()
            .append(&NewLedgerEntry::purchase(&p.id, 10, 100, d(3, 5)))
            .await
            .unwrap();
        db.sales()
            .record_sale(&NewSale {
                product_id: p.id.clone(),
                customer_id: "cust-3".to_string(),
                quantity: 6,
                unit_price_cents: 5000,
                logged_at: d(3, 12),
                reason: None,
                record_id: None,
            })
            .await
            .unwrap();
        db.ledger()
            .append(&NewLedgerEntry::movement(
                &p.id,
                LogType::WasteOut,
                -1,
                Some("leaking bottle".to_string()),
                d(3, 20),
            ))
            .await
            .unwrap();

        let march = DateRange::new(d(3, 1), d(3, 31));
        let report = db.reports().period_report(march).await.unwrap();

        assert_eq!(report.opening_value.cents(), 1000);
        assert_eq!(report.purchases_value.cents(), 1000);
        assert_eq!(report.closing_value.cents(), 1300);
        assert_eq!(report.cost_of_goods_sold.cents(), 700);
        assert_eq!(report.sales_revenue.cents(), 30_000);

        let cogs = db.reports().period_cost_of_goods_sold(march).await.unwrap();
        assert_eq!(cogs, report.cost_of_goods_sold);
    }

    #[tokio::test]
    async fn test_inverted_range_is_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let err = db
            .reports()
            .period_report(DateRange::new(d(3, 31), d(3, 1)))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
    }
}
