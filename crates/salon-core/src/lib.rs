//! # salon-core: Pure Ledger Logic
//!
//! The rules of the inventory & session ledger engine, with zero I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Salon Ledger Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │           Calling screens (sale, receiving, stocktake,          │   │
//! │  │           ticket usage, tax export)                             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ intents                                │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │         salon-db: locked transactions + repositories            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ state read under lock                  │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ salon-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌──────────┐ ┌──────────┐ ┌────────┐ │   │
//! │  │   │  stock  │ │ ticket  │ │valuation │ │stocktake │ │ types  │ │   │
//! │  │   │ deltas  │ │  FSM    │ │  W.A.C.  │ │   diff   │ │ money  │ │   │
//! │  │   └─────────┘ └─────────┘ └──────────┘ └──────────┘ └────────┘ │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO LOCKS • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, LedgerEntry, CourseTicket, Sale, ...)
//! - [`money`] - Integer-cent money
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//! - [`stock`] - Signed-delta rules per log type
//! - [`ticket`] - Session counter state machine
//! - [`valuation`] - Weighted-average cost and point-in-time value
//! - [`stocktake`] - Counted-vs-system diff
//!
//! ## Example Usage
//!
//! ```rust
//! use salon_core::stock::apply_delta;
//! use salon_core::LogType;
//!
//! // 3 on hand, selling 2 leaves 1
//! assert_eq!(apply_delta("p-1", 3, LogType::SaleOut, -2).unwrap(), 1);
//!
//! // selling 4 is refused
//! assert!(apply_delta("p-1", 3, LogType::SaleOut, -4).is_err());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod stock;
pub mod stocktake;
pub mod ticket;
pub mod types;
pub mod validation;
pub mod valuation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default tenant ID.
///
/// Every operation is already scoped to one tenant by the caller; rows are
/// stamped with this id unless the engine is configured otherwise.
pub const DEFAULT_TENANT_ID: &str = "00000000-0000-0000-0000-000000000001";

/// Maximum units moved by a single ledger entry.
///
/// Catches typos like 1000 instead of 10 on receiving screens.
pub const MAX_ENTRY_QUANTITY: i64 = 100_000;

/// Maximum unit price or cost in minor units.
///
/// Keeps `unit × quantity` and period sums well inside `i64`.
pub const MAX_PRICE_CENTS: i64 = 100_000_000_000;

/// Maximum sessions a course ticket can be sold with.
pub const MAX_TICKET_SESSIONS: i64 = 1_000;

/// Maximum length of a free-text reason / stocktake label.
pub const MAX_REASON_LEN: usize = 500;
