//! # Repository Module
//!
//! Database repository implementations for the ledger engine.
//!
//! ## Locked Write Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    One Mutation = One Transaction                       │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │   1. UPDATE products SET lock_version = lock_version + 1 WHERE id = ?  │
//! │      (first statement takes the SQLite write lock; 0 rows = not found)  │
//! │   2. SELECT COALESCE(SUM(quantity), 0) FROM inventory_logs ...          │
//! │      (stock as of this transaction, nobody else can change it now)      │
//! │   3. salon_core::stock::apply_delta(...)  → InsufficientStock? ROLLBACK │
//! │   4. INSERT sale / INSERT inventory_logs                                │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  A concurrent writer blocks at step 1 (busy_timeout) and then sees the │
//! │  committed stock at step 2.                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Catalog hooks
//! - [`LedgerRepository`](ledger::LedgerRepository) - Stock, cost and direct entries
//! - [`TicketRepository`](ticket::TicketRepository) - Session counter
//! - [`SaleRepository`](sale::SaleRepository) - Sale + ledger as one unit, reversal
//! - [`StocktakeRepository`](stocktake::StocktakeRepository) - Counted vs system reconciliation
//! - [`ReportRepository`](report::ReportRepository) - Valuation and period COGS

pub mod ledger;
pub mod product;
pub mod report;
pub mod sale;
pub mod stocktake;
pub mod ticket;

/// Generates a new row id.
pub(crate) fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
