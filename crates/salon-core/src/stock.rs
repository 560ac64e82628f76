//! # Stock Rules
//!
//! The non-negative stock rule, as a pure function over the stock summed
//! inside the caller's locked transaction.
//!
//! ```text
//! current (Σ under lock) ──► apply_delta(log_type, quantity) ──► next
//!                                   │
//!                                   └── outflow / adjust below zero?
//!                                         → InsufficientStock
//! ```
//!
//! `purchase_in` / `return_in` never fail here; their sign is enforced by
//! [`crate::validation::validate_new_entry`].

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::{LedgerEntry, LogType};

/// Applies a signed delta to the current stock.
///
/// ## Errors
/// * [`CoreError::InsufficientStock`] when an outflow or a negative
///   adjustment would leave the product below zero
/// * [`CoreError::Validation`] when the new total does not fit in `i64`
pub fn apply_delta(
    product_id: &str,
    current: i64,
    log_type: LogType,
    quantity: i64,
) -> CoreResult<i64> {
    let next = current
        .checked_add(quantity)
        .ok_or_else(|| ValidationError::OutOfRange {
            field: format!("stock[{product_id}]"),
            min: 0,
            max: i64::MAX,
        })?;

    if next < 0 && !log_type.is_inflow() {
        return Err(CoreError::InsufficientStock {
            product_id: product_id.to_string(),
            available: current,
            requested: quantity.saturating_neg(),
        });
    }

    Ok(next)
}

/// Sums a product's entries.
pub fn stock_of(entries: &[LedgerEntry]) -> i64 {
    entries.iter().map(|e| e.quantity).sum()
}

/// Replays entries in ledger order and checks the running total never went
/// negative or overflowed. A diagnostic for audits and tests; writes rely on
/// [`apply_delta`] under lock instead.
pub fn replay_is_non_negative(entries: &[LedgerEntry]) -> bool {
    let mut running = 0i64;
    for entry in entries {
        match running.checked_add(entry.quantity) {
            Some(next) if next >= 0 => running = next,
            _ => return false,
        }
    }
    true
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn entry(log_type: LogType, quantity: i64) -> LedgerEntry {
        LedgerEntry {
            id: format!("e-{quantity}"),
            tenant_id: "t".to_string(),
            product_id: "p-1".to_string(),
            log_type,
            quantity,
            unit_cost_price_cents: None,
            unit_sell_price_cents: None,
            reason: None,
            related_sale_id: None,
            logged_at: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_outflow_within_stock() {
        assert_eq!(apply_delta("p-1", 5, LogType::SaleOut, -5).unwrap(), 0);
        assert_eq!(apply_delta("p-1", 5, LogType::WasteOut, -2).unwrap(), 3);
    }

    #[test]
    fn test_outflow_beyond_stock_is_refused() {
        let err = apply_delta("p-1", 1, LogType::SampleOut, -2).unwrap_err();
        match err {
            CoreError::InsufficientStock {
                available,
                requested,
                ..
            } => {
                assert_eq!(available, 1);
                assert_eq!(requested, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_adjust_keeps_total_non_negative() {
        assert_eq!(apply_delta("p-1", 3, LogType::Adjust, -3).unwrap(), 0);
        assert!(apply_delta("p-1", 3, LogType::Adjust, -4).is_err());
        assert_eq!(apply_delta("p-1", 0, LogType::Adjust, 7).unwrap(), 7);
    }

    #[test]
    fn test_inflows_always_apply() {
        assert_eq!(apply_delta("p-1", 0, LogType::PurchaseIn, 10).unwrap(), 10);
        assert_eq!(apply_delta("p-1", 2, LogType::ReturnIn, 1).unwrap(), 3);
    }

    #[test]
    fn test_overflowing_total_is_refused() {
        let err = apply_delta("p-1", i64::MAX - 5, LogType::PurchaseIn, 10).unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::OutOfRange { .. })));

        let err = apply_delta("p-1", i64::MAX, LogType::Adjust, 1).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn test_stock_is_sum_of_entries() {
        let entries = vec![
            entry(LogType::PurchaseIn, 10),
            entry(LogType::SaleOut, -4),
            entry(LogType::Adjust, 1),
        ];
        assert_eq!(stock_of(&entries), 7);
        assert!(replay_is_non_negative(&entries));

        let overdrawn = vec![entry(LogType::SaleOut, -1), entry(LogType::PurchaseIn, 5)];
        assert!(!replay_is_non_negative(&overdrawn));
    }
}
