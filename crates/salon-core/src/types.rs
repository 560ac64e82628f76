//! # Domain Types
//!
//! Core domain types used throughout the ledger engine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │  LedgerEntry    │   │      Sale       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │◄──│  product_id     │   │  id (UUID)      │       │
//! │  │  reorder_point  │   │  log_type       │──►│  product_id?    │       │
//! │  │  base prices    │   │  quantity (±)   │   │  quantity       │       │
//! │  └─────────────────┘   │  related_sale_id│   │  total_price    │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! │  ┌─────────────────┐   ┌─────────────────┐                             │
//! │  │  CourseTicket   │   │  TicketStatus   │                             │
//! │  │  ─────────────  │   │  ─────────────  │                             │
//! │  │  total_sessions │   │  Active         │                             │
//! │  │  used_sessions  │   │  Completed      │                             │
//! │  │  status         │   │  Expired  (ext) │                             │
//! │  └─────────────────┘   │  Cancelled (ext)│                             │
//! │                        └─────────────────┘                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Stock Is Derived
//! There is no `current_stock` field anywhere in this file. Stock is
//! `Σ LedgerEntry.quantity` for a product, summed inside the transaction
//! that needs it.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Date Range
// =============================================================================

/// Inclusive range of business dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DateRange {
    #[ts(as = "String")]
    pub start: NaiveDate,
    #[ts(as = "String")]
    pub end: NaiveDate,
}

impl DateRange {
    /// Creates a range; see [`crate::validation::validate_date_range`].
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        DateRange { start, end }
    }

    /// Whether `date` falls inside the range (both ends inclusive).
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

// =============================================================================
// Product
// =============================================================================

/// A catalog product whose stock is tracked by the ledger.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Tenant this product belongs to.
    pub tenant_id: String,

    /// Display name, snapshotted onto sales.
    pub name: String,

    /// Free-form category (hair care, color, retail, ...).
    pub category: Option<String>,

    /// List price in minor units.
    pub base_sell_price_cents: i64,

    /// Catalog cost, used for valuation until a purchase has been received.
    pub base_cost_price_cents: i64,

    /// Stock at or below this level is flagged for reorder.
    pub reorder_point: i64,

    /// Inactive products are hidden from summaries but keep their history.
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn base_sell_price(&self) -> Money {
        Money::from_cents(self.base_sell_price_cents)
    }

    #[inline]
    pub fn base_cost_price(&self) -> Money {
        Money::from_cents(self.base_cost_price_cents)
    }
}

/// Catalog input for registering a product.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewProduct {
    pub name: String,
    pub category: Option<String>,
    pub base_sell_price_cents: i64,
    pub base_cost_price_cents: i64,
    pub reorder_point: i64,
}

// =============================================================================
// Log Type
// =============================================================================

/// Kind of stock movement recorded by a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum LogType {
    /// Goods received from a supplier. Positive, carries unit cost.
    PurchaseIn,
    /// Sold to a customer. Negative, paired with a Sale by the coordinator.
    SaleOut,
    /// Handed out as a sample. Negative.
    SampleOut,
    /// Used up or discarded. Negative, reason required.
    WasteOut,
    /// Returned by a customer. Positive.
    ReturnIn,
    /// Manual correction (stocktake). Either sign, reason required.
    Adjust,
}

impl LogType {
    /// Log types that take stock out and must never overdraw it.
    pub const fn is_outflow(&self) -> bool {
        matches!(self, LogType::SaleOut | LogType::SampleOut | LogType::WasteOut)
    }

    /// Log types that only ever add stock.
    pub const fn is_inflow(&self) -> bool {
        matches!(self, LogType::PurchaseIn | LogType::ReturnIn)
    }

    /// Whether a free-text reason is mandatory.
    pub const fn requires_reason(&self) -> bool {
        matches!(self, LogType::WasteOut | LogType::Adjust)
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            LogType::PurchaseIn => "purchase_in",
            LogType::SaleOut => "sale_out",
            LogType::SampleOut => "sample_out",
            LogType::WasteOut => "waste_out",
            LogType::ReturnIn => "return_in",
            LogType::Adjust => "adjust",
        }
    }
}

impl fmt::Display for LogType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Ledger Entry
// =============================================================================

/// One immutable, signed stock movement.
///
/// Never updated. The only deletion path is a sale reversal, which removes
/// the sale and its paired `sale_out` entry in the same transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct LedgerEntry {
    pub id: String,
    pub tenant_id: String,
    pub product_id: String,
    pub log_type: LogType,
    /// Signed delta; positive increases stock.
    pub quantity: i64,
    /// Required for `purchase_in`.
    pub unit_cost_price_cents: Option<i64>,
    /// Optional, recorded on `sale_out`.
    pub unit_sell_price_cents: Option<i64>,
    pub reason: Option<String>,
    /// Back-reference to the Sale this entry is paired with.
    pub related_sale_id: Option<String>,
    /// Business date chosen by the operator.
    #[ts(as = "String")]
    pub logged_at: NaiveDate,
    /// System timestamp.
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A direct ledger movement submitted by receiving / consumption / waste /
/// stocktake screens.
///
/// Sale pairing is not settable here; only the sale coordinator links an
/// entry to a Sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewLedgerEntry {
    pub product_id: String,
    pub log_type: LogType,
    pub quantity: i64,
    pub unit_cost_price_cents: Option<i64>,
    pub unit_sell_price_cents: Option<i64>,
    pub reason: Option<String>,
    #[ts(as = "String")]
    pub logged_at: NaiveDate,
}

impl NewLedgerEntry {
    /// Receiving: `quantity` units at `unit_cost_cents` each.
    pub fn purchase(
        product_id: impl Into<String>,
        quantity: i64,
        unit_cost_cents: i64,
        logged_at: NaiveDate,
    ) -> Self {
        NewLedgerEntry {
            product_id: product_id.into(),
            log_type: LogType::PurchaseIn,
            quantity,
            unit_cost_price_cents: Some(unit_cost_cents),
            unit_sell_price_cents: None,
            reason: None,
            logged_at,
        }
    }

    /// Outflow or correction; `quantity` is the signed delta.
    pub fn movement(
        product_id: impl Into<String>,
        log_type: LogType,
        quantity: i64,
        reason: Option<String>,
        logged_at: NaiveDate,
    ) -> Self {
        NewLedgerEntry {
            product_id: product_id.into(),
            log_type,
            quantity,
            unit_cost_price_cents: None,
            unit_sell_price_cents: None,
            reason,
            logged_at,
        }
    }
}

// =============================================================================
// Course Ticket
// =============================================================================

/// Lifecycle of a course ticket.
///
/// `Active`/`Completed` are derived from the session counter.
/// `Expired`/`Cancelled` are set by other collaborators and never touched
/// by session operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Active,
    Completed,
    Expired,
    Cancelled,
}

impl TicketStatus {
    /// Status implied by the counter alone.
    pub const fn from_counter(used_sessions: i64, total_sessions: i64) -> Self {
        if used_sessions >= total_sessions {
            TicketStatus::Completed
        } else {
            TicketStatus::Active
        }
    }

    /// States owned by collaborators outside the session counter.
    pub const fn is_externally_owned(&self) -> bool {
        matches!(self, TicketStatus::Expired | TicketStatus::Cancelled)
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Active => "active",
            TicketStatus::Completed => "completed",
            TicketStatus::Expired => "expired",
            TicketStatus::Cancelled => "cancelled",
        }
    }
}

impl Default for TicketStatus {
    fn default() -> Self {
        TicketStatus::Active
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A prepaid multi-session treatment ticket.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CourseTicket {
    pub id: String,
    pub tenant_id: String,
    pub customer_id: String,
    pub ticket_name: String,
    /// Fixed at creation, at least 1.
    pub total_sessions: i64,
    /// `0 <= used_sessions <= total_sessions`.
    pub used_sessions: i64,
    pub status: TicketStatus,
    #[ts(as = "Option<String>")]
    pub expiry_date: Option<NaiveDate>,
    pub price_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl CourseTicket {
    #[inline]
    pub fn remaining_sessions(&self) -> i64 {
        self.total_sessions - self.used_sessions
    }
}

/// Input for selling a course ticket.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewCourseTicket {
    pub customer_id: String,
    pub ticket_name: String,
    pub total_sessions: i64,
    pub price_cents: i64,
    #[ts(as = "Option<String>")]
    pub expiry_date: Option<NaiveDate>,
}

/// Result of a consume / undo / adjust.
///
/// Carries the counter before and after so the screen can show the
/// operator exactly what changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SessionChange {
    pub previous_used: i64,
    pub used_sessions: i64,
    pub total_sessions: i64,
    pub status: TicketStatus,
}

impl SessionChange {
    #[inline]
    pub fn remaining(&self) -> i64 {
        self.total_sessions - self.used_sessions
    }
}

/// Which session operation produced a history row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SessionEventKind {
    Consume,
    Undo,
    Adjust,
}

/// Audit row written alongside every session counter mutation.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SessionEvent {
    pub id: String,
    pub ticket_id: String,
    pub kind: SessionEventKind,
    pub used_before: i64,
    pub used_after: i64,
    pub reason: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Sale
// =============================================================================

/// A customer-facing sale record.
///
/// When `product_id` is set there is exactly one `sale_out` ledger entry
/// whose `related_sale_id` points here.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: String,
    pub tenant_id: String,
    pub customer_id: String,
    /// `None` for free-text, non-catalog items.
    pub product_id: Option<String>,
    /// Product name snapshot, or the free-text item name.
    pub item_name: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub total_price_cents: i64,
    /// Optional treatment-record context.
    pub record_id: Option<String>,
    pub reason: Option<String>,
    #[ts(as = "String")]
    pub logged_at: NaiveDate,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Sale {
    #[inline]
    pub fn total_price(&self) -> Money {
        Money::from_cents(self.total_price_cents)
    }

    #[inline]
    pub fn is_product_linked(&self) -> bool {
        self.product_id.is_some()
    }
}

/// Intent: sell `quantity` of a catalog product.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewSale {
    pub product_id: String,
    pub customer_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    #[ts(as = "String")]
    pub logged_at: NaiveDate,
    pub reason: Option<String>,
    pub record_id: Option<String>,
}

/// Intent: record a non-catalog item; never touches stock.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewFreeSale {
    pub item_name: String,
    pub customer_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    #[ts(as = "String")]
    pub logged_at: NaiveDate,
    pub record_id: Option<String>,
}

/// Result of reversing a sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleReversal {
    pub sale_id: String,
    pub product_id: Option<String>,
    /// Units credited back to stock (0 for free sales).
    pub restored_quantity: i64,
    /// Stock after the reversal committed, for product-linked sales.
    pub remaining_stock: Option<i64>,
}

// =============================================================================
// Stocktake
// =============================================================================

/// One product whose physical count differs from the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StocktakeDiff {
    pub product_id: String,
    pub system_stock: i64,
    pub counted_stock: i64,
    /// `counted_stock - system_stock`, never zero.
    pub delta: i64,
}

// =============================================================================
// Inventory Summary & Reports
// =============================================================================

/// One row of the dashboard / low-stock view.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InventorySummaryRow {
    pub product_id: String,
    pub name: String,
    pub category: Option<String>,
    pub current_stock: i64,
    pub reorder_point: i64,
    #[ts(as = "String")]
    pub weighted_average_cost: Decimal,
    pub stock_value: Money,
    pub needs_reorder: bool,
}

/// Period aggregation behind the tax-report export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PeriodReport {
    pub range: DateRange,
    pub opening_value: Money,
    pub purchases_value: Money,
    pub closing_value: Money,
    /// `opening + purchases - closing`.
    pub cost_of_goods_sold: Money,
    pub sales_revenue: Money,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_type_direction() {
        assert!(LogType::SaleOut.is_outflow());
        assert!(LogType::WasteOut.is_outflow());
        assert!(LogType::PurchaseIn.is_inflow());
        assert!(!LogType::Adjust.is_outflow());
        assert!(!LogType::Adjust.is_inflow());
        assert!(LogType::Adjust.requires_reason());
    }

    #[test]
    fn test_log_type_serializes_snake_case() {
        let json = serde_json::to_string(&LogType::PurchaseIn).unwrap();
        assert_eq!(json, "\"purchase_in\"");
        let back: LogType = serde_json::from_str("\"waste_out\"").unwrap();
        assert_eq!(back, LogType::WasteOut);
    }

    #[test]
    fn test_ticket_status_from_counter() {
        assert_eq!(TicketStatus::from_counter(4, 5), TicketStatus::Active);
        assert_eq!(TicketStatus::from_counter(5, 5), TicketStatus::Completed);
        assert!(TicketStatus::Cancelled.is_externally_owned());
        assert!(!TicketStatus::Completed.is_externally_owned());
    }

    #[test]
    fn test_date_range_contains_both_ends() {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2026, 4, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 4, 30).unwrap(),
        );
        assert!(range.contains(NaiveDate::from_ymd_opt(2026, 4, 1).unwrap()));
        assert!(range.contains(NaiveDate::from_ymd_opt(2026, 4, 30).unwrap()));
        assert!(!range.contains(NaiveDate::from_ymd_opt(2026, 5, 1).unwrap()));
    }
}
