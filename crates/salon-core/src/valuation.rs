//! # Valuation
//!
//! Weighted-average cost and point-in-time stock value, computed by
//! replaying one product's ledger entries. Read-only: nothing here is ever
//! consulted to decide whether stock may leave the shelf.
//!
//! ## Weighted-Average Cost
//! ```text
//!            Σ (quantity × unit_cost)   over purchase_in, logged_at <= as_of
//!   W.A.C. = ────────────────────────
//!            Σ quantity                 over the same entries
//!
//!   purchase_in 10 @ 100, sale_out -4   →  W.A.C. = 100, stock 6, value 600
//!   purchase_in  3 @ 100, purchase_in 1 @ 104  →  W.A.C. = 101
//! ```
//! A product that has never been received is valued at its catalog cost.
//!
//! ## Period Cost of Goods Sold
//! ```text
//!   COGS = opening value (day before start) + purchases in range
//!        − closing value (end of range)
//! ```

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::money::Money;
use crate::types::{DateRange, LedgerEntry, LogType};

/// Stock and value of one product at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Valuation {
    pub stock: i64,
    /// Per unit, in minor units; fractional in general.
    pub weighted_average_cost: Decimal,
    /// `stock × weighted_average_cost`, unrounded.
    pub value: Decimal,
}

impl Valuation {
    pub fn value_money(&self) -> Money {
        Money::from_decimal_rounded(self.value)
    }
}

/// Period figures for one product, unrounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PeriodValuation {
    pub opening_value: Decimal,
    pub purchases_value: Decimal,
    pub closing_value: Decimal,
}

impl PeriodValuation {
    pub fn cost_of_goods_sold(&self) -> Decimal {
        self.opening_value + self.purchases_value - self.closing_value
    }
}

impl std::ops::AddAssign for PeriodValuation {
    fn add_assign(&mut self, other: Self) {
        self.opening_value += other.opening_value;
        self.purchases_value += other.purchases_value;
        self.closing_value += other.closing_value;
    }
}

fn logged_by(entry: &LedgerEntry, as_of: Option<NaiveDate>) -> bool {
    as_of.map_or(true, |date| entry.logged_at <= date)
}

fn purchase_cost(entry: &LedgerEntry) -> Option<(i64, i64)> {
    match (entry.log_type, entry.unit_cost_price_cents) {
        (LogType::PurchaseIn, Some(cost)) if entry.quantity > 0 => Some((entry.quantity, cost)),
        _ => None,
    }
}

/// Weighted-average unit cost of everything received up to `as_of`
/// (`None` = the whole history). Falls back to `catalog_cost` when nothing
/// has been received yet.
pub fn weighted_average_cost(
    entries: &[LedgerEntry],
    as_of: Option<NaiveDate>,
    catalog_cost: Money,
) -> Decimal {
    let (units, total_cost) = entries
        .iter()
        .filter(|e| logged_by(e, as_of))
        .filter_map(purchase_cost)
        .fold((0i64, Decimal::ZERO), |(units, cost), (qty, unit_cost)| {
            (units + qty, cost + Decimal::from(qty) * Decimal::from(unit_cost))
        });

    if units == 0 {
        return catalog_cost.to_decimal();
    }

    total_cost / Decimal::from(units)
}

/// Replays entries up to `as_of` and values the resulting stock.
pub fn valuation_as_of(
    entries: &[LedgerEntry],
    as_of: Option<NaiveDate>,
    catalog_cost: Money,
) -> Valuation {
    let stock: i64 = entries
        .iter()
        .filter(|e| logged_by(e, as_of))
        .map(|e| e.quantity)
        .sum();
    let weighted_average_cost = weighted_average_cost(entries, as_of, catalog_cost);

    Valuation {
        stock,
        weighted_average_cost,
        value: Decimal::from(stock) * weighted_average_cost,
    }
}

/// Cost value of goods received inside `range`.
pub fn purchases_value(entries: &[LedgerEntry], range: &DateRange) -> Decimal {
    entries
        .iter()
        .filter(|e| range.contains(e.logged_at))
        .filter_map(purchase_cost)
        .map(|(qty, cost)| Decimal::from(qty) * Decimal::from(cost))
        .sum()
}

/// Opening, purchases and closing value of one product over `range`.
pub fn period_valuation(
    entries: &[LedgerEntry],
    range: &DateRange,
    catalog_cost: Money,
) -> PeriodValuation {
    let opening_value = match range.start.pred_opt() {
        Some(day_before) => valuation_as_of(entries, Some(day_before), catalog_cost).value,
        None => Decimal::ZERO,
    };

    PeriodValuation {
        opening_value,
        purchases_value: purchases_value(entries, range),
        closing_value: valuation_as_of(entries, Some(range.end), catalog_cost).value,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn d(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, month, day).unwrap()
    }

    fn entry(log_type: LogType, quantity: i64, cost: Option<i64>, logged_at: NaiveDate) -> LedgerEntry {
        LedgerEntry {
            id: format!("{log_type}-{quantity}-{logged_at}"),
            tenant_id: "t".to_string(),
            product_id: "p-1".to_string(),
            log_type,
            quantity,
            unit_cost_price_cents: cost,
            unit_sell_price_cents: None,
            reason: None,
            related_sale_id: None,
            logged_at,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_purchase_then_sale() {
        let entries = vec![
            entry(LogType::PurchaseIn, 10, Some(100), d(1, 5)),
            entry(LogType::SaleOut, -4, None, d(1, 6)),
        ];
        let v = valuation_as_of(&entries, None, Money::zero());
        assert_eq!(v.stock, 6);
        assert_eq!(v.weighted_average_cost, Decimal::from(100));
        assert_eq!(v.value_money().cents(), 600);
    }

    #[test]
    fn test_weighted_by_quantity() {
        let entries = vec![
            entry(LogType::PurchaseIn, 3, Some(100), d(1, 5)),
            entry(LogType::PurchaseIn, 1, Some(104), d(1, 9)),
        ];
        assert_eq!(
            weighted_average_cost(&entries, None, Money::zero()),
            Decimal::from(101)
        );
        // Before the second receipt only the first one counts.
        assert_eq!(
            weighted_average_cost(&entries, Some(d(1, 8)), Money::zero()),
            Decimal::from(100)
        );
    }

    #[test]
    fn test_catalog_cost_fallback() {
        let entries = vec![entry(LogType::Adjust, 4, None, d(2, 1))];
        let v = valuation_as_of(&entries, None, Money::from_cents(250));
        assert_eq!(v.weighted_average_cost, Decimal::from(250));
        assert_eq!(v.value_money().cents(), 1000);
    }

    #[test]
    fn test_historical_replay_ignores_later_entries() {
        let entries = vec![
            entry(LogType::PurchaseIn, 10, Some(100), d(1, 5)),
            entry(LogType::SaleOut, -4, None, d(3, 1)),
        ];
        let v = valuation_as_of(&entries, Some(d(2, 28)), Money::zero());
        assert_eq!(v.stock, 10);
        assert_eq!(v.value_money().cents(), 1000);
    }

    #[test]
    fn test_period_cost_of_goods_sold() {
        let entries = vec![
            entry(LogType::PurchaseIn, 10, Some(100), d(1, 20)),
            entry(LogType::PurchaseIn, 10, Some(100), d(2, 10)),
            entry(LogType::SaleOut, -5, None, d(2, 15)),
            entry(LogType::WasteOut, -1, None, d(2, 16)),
        ];
        let range = DateRange::new(d(2, 1), d(2, 28));
        let p = period_valuation(&entries, &range, Money::zero());

        assert_eq!(p.opening_value, Decimal::from(1000));
        assert_eq!(p.purchases_value, Decimal::from(1000));
        assert_eq!(p.closing_value, Decimal::from(1400));
        assert_eq!(p.cost_of_goods_sold(), Decimal::from(600));
    }
}
