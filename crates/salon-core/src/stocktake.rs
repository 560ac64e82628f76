//! # Stocktake Diff
//!
//! Compares physically counted quantities with ledger-derived stock.
//!
//! ```text
//!  counted  { shampoo: 8, color-7N: 3, towel: 40 }
//!  system   { shampoo: 10, color-7N: 3, towel: 38 }
//!      │
//!      ▼
//!  diff     [ shampoo  10 → 8   delta -2 ]
//!           [ towel    38 → 40  delta +2 ]      (color-7N omitted)
//! ```

use std::collections::BTreeMap;

use crate::error::CoreResult;
use crate::types::StocktakeDiff;
use crate::validation::validate_counted_stock;

/// Builds the non-zero diffs, ordered by product id.
///
/// `system` must hold an entry for every counted product; products missing
/// from it are treated as having zero stock.
pub fn compute_diff(
    system: &BTreeMap<String, i64>,
    counted: &BTreeMap<String, i64>,
) -> CoreResult<Vec<StocktakeDiff>> {
    let mut diffs = Vec::new();

    for (product_id, &counted_stock) in counted {
        validate_counted_stock(product_id, counted_stock)?;

        let system_stock = system.get(product_id).copied().unwrap_or(0);
        let delta = counted_stock - system_stock;
        if delta != 0 {
            diffs.push(StocktakeDiff {
                product_id: product_id.clone(),
                system_stock,
                counted_stock,
                delta,
            });
        }
    }

    Ok(diffs)
}

/// Standard reason label for a stocktake batch, e.g. `stocktake 2026-03`.
pub fn stocktake_label(year: i32, month: u32) -> String {
    format!("stocktake {year:04}-{month:02}")
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, i64)]) -> BTreeMap<String, i64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_only_nonzero_deltas() {
        let system = map(&[("a", 10), ("b", 3), ("c", 38)]);
        let counted = map(&[("a", 8), ("b", 3), ("c", 40)]);

        let diffs = compute_diff(&system, &counted).unwrap();
        assert_eq!(diffs.len(), 2);
        assert_eq!(diffs[0].product_id, "a");
        assert_eq!(diffs[0].delta, -2);
        assert_eq!(diffs[1].product_id, "c");
        assert_eq!(diffs[1].delta, 2);
    }

    #[test]
    fn test_matching_count_is_empty() {
        let system = map(&[("a", 5)]);
        assert!(compute_diff(&system, &system).unwrap().is_empty());
    }

    #[test]
    fn test_negative_count_is_rejected() {
        let system = map(&[("a", 5)]);
        let counted = map(&[("a", -1)]);
        assert!(compute_diff(&system, &counted).is_err());
    }

    #[test]
    fn test_label() {
        assert_eq!(stocktake_label(2026, 3), "stocktake 2026-03");
    }
}
