//! # Validation Module
//!
//! Input validation for ledger, ticket and sale intents.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: THIS MODULE - shape of the intent                            │
//! │  ├── required fields per log type                                      │
//! │  ├── sign of the quantity per log type                                 │
//! │  └── ranges (quantities, prices, sessions)                             │
//! │           │   runs before any lock is taken                             │
//! │           ▼                                                             │
//! │  Layer 2: stock / ticket modules - rules against current state         │
//! │  └── run inside the locked transaction                                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite CHECK / FOREIGN KEY constraints                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;

use crate::error::ValidationError;
use crate::types::{
    DateRange, LogType, NewCourseTicket, NewFreeSale, NewLedgerEntry, NewProduct, NewSale,
    StocktakeDiff,
};
use crate::{MAX_ENTRY_QUANTITY, MAX_PRICE_CENTS, MAX_REASON_LEN, MAX_TICKET_SESSIONS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Scalar Validators
// =============================================================================

/// Validates a non-empty name-like field of at most 200 characters.
pub fn validate_name(field: &str, value: &str) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::required(field));
    }

    if value.chars().count() > 200 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates a sale quantity (units sold).
///
/// ## Example
/// ```rust
/// use salon_core::validation::validate_quantity;
///
/// assert!(validate_quantity(1).is_ok());
/// assert!(validate_quantity(0).is_err());
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ENTRY_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ENTRY_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price or cost in minor units. Zero is allowed (free samples,
/// complimentary items).
pub fn validate_price_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    if cents > MAX_PRICE_CENTS {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_PRICE_CENTS,
        });
    }
    Ok(())
}

/// Validates an optional free-text reason, and requires it when `required`.
pub fn validate_reason(reason: Option<&str>, required: bool) -> ValidationResult<()> {
    match reason.map(str::trim) {
        None | Some("") if required => Err(ValidationError::required("reason")),
        Some(r) if r.chars().count() > MAX_REASON_LEN => Err(ValidationError::TooLong {
            field: "reason".to_string(),
            max: MAX_REASON_LEN,
        }),
        _ => Ok(()),
    }
}

/// Validates that a range does not end before it starts.
pub fn validate_date_range(range: &DateRange) -> ValidationResult<()> {
    if range.end < range.start {
        return Err(ValidationError::InvalidFormat {
            field: "date_range".to_string(),
            reason: format!("ends ({}) before it starts ({})", range.end, range.start),
        });
    }
    Ok(())
}

/// Validates a physically counted quantity.
pub fn validate_counted_stock(product_id: &str, counted: i64) -> ValidationResult<()> {
    if counted < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: format!("counted_stock[{product_id}]"),
        });
    }
    if counted > MAX_ENTRY_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: format!("counted_stock[{product_id}]"),
            min: 0,
            max: MAX_ENTRY_QUANTITY,
        });
    }
    Ok(())
}

/// Validates one stocktake line before it becomes an `adjust` entry.
///
/// The delta must be non-zero, agree with `counted - system`, and fit in a
/// single ledger entry.
pub fn validate_stocktake_diff(diff: &StocktakeDiff) -> ValidationResult<()> {
    if diff.product_id.trim().is_empty() {
        return Err(ValidationError::required("product_id"));
    }
    validate_counted_stock(&diff.product_id, diff.counted_stock)?;

    if diff.delta == 0 {
        return Err(ValidationError::NotAllowed {
            field: "delta".to_string(),
            reason: format!("zero adjustment for product {}", diff.product_id),
        });
    }

    if diff.counted_stock.checked_sub(diff.system_stock) != Some(diff.delta) {
        return Err(ValidationError::InvalidFormat {
            field: format!("delta[{}]", diff.product_id),
            reason: format!(
                "{} does not equal counted {} minus system {}",
                diff.delta, diff.counted_stock, diff.system_stock
            ),
        });
    }

    let magnitude = diff.delta.checked_abs().unwrap_or(i64::MAX);
    if magnitude > MAX_ENTRY_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: format!("delta[{}]", diff.product_id),
            min: -MAX_ENTRY_QUANTITY,
            max: MAX_ENTRY_QUANTITY,
        });
    }

    Ok(())
}

// =============================================================================
// Intent Validators
// =============================================================================

/// Validates a product registration.
pub fn validate_new_product(product: &NewProduct) -> ValidationResult<()> {
    validate_name("name", &product.name)?;
    validate_price_cents("base_sell_price_cents", product.base_sell_price_cents)?;
    validate_price_cents("base_cost_price_cents", product.base_cost_price_cents)?;
    if product.reorder_point < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "reorder_point".to_string(),
        });
    }
    Ok(())
}

/// Validates the shape of a direct ledger entry.
///
/// ## Rules per log type
/// ```text
/// purchase_in   quantity > 0, unit_cost_price required
/// return_in     quantity > 0
/// sale_out      quantity < 0
/// sample_out    quantity < 0
/// waste_out     quantity < 0, reason required
/// adjust        quantity != 0, reason required
/// ```
/// Whether the resulting stock stays non-negative is checked later, under
/// lock, by [`crate::stock::apply_delta`].
pub fn validate_new_entry(entry: &NewLedgerEntry) -> ValidationResult<()> {
    if entry.product_id.trim().is_empty() {
        return Err(ValidationError::required("product_id"));
    }

    let magnitude = entry.quantity.checked_abs().unwrap_or(i64::MAX);
    if magnitude > MAX_ENTRY_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: -MAX_ENTRY_QUANTITY,
            max: MAX_ENTRY_QUANTITY,
        });
    }

    let log_type = entry.log_type;
    if log_type.is_inflow() && entry.quantity <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }
    if log_type.is_outflow() && entry.quantity >= 0 {
        return Err(ValidationError::MustBeNegative {
            field: "quantity".to_string(),
        });
    }
    if log_type == LogType::Adjust && entry.quantity == 0 {
        return Err(ValidationError::NotAllowed {
            field: "quantity".to_string(),
            reason: "an adjustment of zero changes nothing".to_string(),
        });
    }

    match (log_type, entry.unit_cost_price_cents) {
        (LogType::PurchaseIn, None) => {
            return Err(ValidationError::required("unit_cost_price_cents"));
        }
        (_, Some(cost)) => validate_price_cents("unit_cost_price_cents", cost)?,
        _ => {}
    }

    if let Some(price) = entry.unit_sell_price_cents {
        if log_type != LogType::SaleOut {
            return Err(ValidationError::NotAllowed {
                field: "unit_sell_price_cents".to_string(),
                reason: format!("only recorded on sale_out, not {log_type}"),
            });
        }
        validate_price_cents("unit_sell_price_cents", price)?;
    }

    validate_reason(entry.reason.as_deref(), log_type.requires_reason())
}

/// Validates a catalog product sale. Whether the stock covers it is
/// decided later, under the product lock.
pub fn validate_new_sale(sale: &NewSale) -> ValidationResult<()> {
    if sale.product_id.trim().is_empty() {
        return Err(ValidationError::required("product_id"));
    }
    if sale.customer_id.trim().is_empty() {
        return Err(ValidationError::required("customer_id"));
    }
    validate_quantity(sale.quantity)?;
    validate_price_cents("unit_price_cents", sale.unit_price_cents)?;
    validate_reason(sale.reason.as_deref(), false)
}

/// Validates a free-text (non-catalog) sale.
pub fn validate_new_free_sale(sale: &NewFreeSale) -> ValidationResult<()> {
    validate_name("item_name", &sale.item_name)?;
    if sale.customer_id.trim().is_empty() {
        return Err(ValidationError::required("customer_id"));
    }
    validate_quantity(sale.quantity)?;
    validate_price_cents("unit_price_cents", sale.unit_price_cents)
}

/// Validates a course ticket sale.
pub fn validate_new_ticket(ticket: &NewCourseTicket) -> ValidationResult<()> {
    if ticket.customer_id.trim().is_empty() {
        return Err(ValidationError::required("customer_id"));
    }
    validate_name("ticket_name", &ticket.ticket_name)?;
    if ticket.total_sessions < 1 || ticket.total_sessions > MAX_TICKET_SESSIONS {
        return Err(ValidationError::OutOfRange {
            field: "total_sessions".to_string(),
            min: 1,
            max: MAX_TICKET_SESSIONS,
        });
    }
    validate_price_cents("price_cents", ticket.price_cents)
}

/// Validates an optional expiry date against the sale date.
pub fn validate_expiry(expiry: Option<NaiveDate>, sold_on: NaiveDate) -> ValidationResult<()> {
    match expiry {
        Some(date) if date < sold_on => Err(ValidationError::InvalidFormat {
            field: "expiry_date".to_string(),
            reason: format!("{date} is before the sale date {sold_on}"),
        }),
        _ => Ok(()),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
