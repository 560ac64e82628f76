//! # Error Types
//!
//! Domain-specific error types for salon-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  salon-core errors (this file)                                         │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Malformed / missing input (caller bug)         │
//! │                                                                         │
//! │  salon-db errors (separate crate)                                      │
//! │  └── DbError          - Wraps CoreError, adds contention + SQL errors  │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → calling screen          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! None of these are retried automatically. Only lock contention
//! (`DbError::ConcurrencyConflict`) is safe to retry, and it lives in salon-db.

use thiserror::Error;

use crate::types::TicketStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations raised by the ledger and session counter.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product id is unknown.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Outflow or negative adjustment would drive stock below zero.
    ///
    /// ## User Workflow
    /// ```text
    /// Sell 2 × Shampoo
    ///      │
    ///      ▼
    /// Stock summed under lock: 1
    ///      │
    ///      ▼
    /// InsufficientStock { available: 1, requested: 2 }
    ///      │
    ///      ▼
    /// Screen shows: "not enough stock"
    /// ```
    #[error("Insufficient stock for {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        available: i64,
        requested: i64,
    },

    /// Product still has ledger history and cannot be deleted.
    #[error("Product {product_id} has {entries} ledger entries; deactivate it instead")]
    ProductHasHistory { product_id: String, entries: i64 },

    /// Course ticket id is unknown.
    #[error("Course ticket not found: {0}")]
    TicketNotFound(String),

    /// Every session of the ticket has already been used.
    #[error("Ticket {ticket_id} has no sessions left ({total} of {total} used)")]
    TicketExhausted { ticket_id: String, total: i64 },

    /// Ticket is in a state session operations may not touch.
    #[error("Ticket {ticket_id} is {status}, session operations are not allowed")]
    TicketNotActive {
        ticket_id: String,
        status: TicketStatus,
    },

    /// Undo requested on a ticket with zero used sessions.
    #[error("Ticket {0} has no used sessions to undo")]
    NothingToUndo(String),

    /// Manual session adjustment outside `[0, total]`.
    #[error("Used sessions {requested} out of range for ticket {ticket_id} (0..={total})")]
    SessionsOutOfRange {
        ticket_id: String,
        requested: i64,
        total: i64,
    },

    /// Sale id is unknown.
    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    /// Sale was already reversed once.
    #[error("Sale {0} has already been reversed")]
    AlreadyReversed(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// True for the four session-counter business rules.
    pub fn is_ticket_rule(&self) -> bool {
        matches!(
            self,
            CoreError::TicketExhausted { .. }
                | CoreError::TicketNotActive { .. }
                | CoreError::NothingToUndo(_)
                | CoreError::SessionsOutOfRange { .. }
        )
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any lock is taken; a caller bug, never retried.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must be negative (outflow log types).
    #[error("{field} must be negative")]
    MustBeNegative { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., invalid UUID, inverted date range).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Field is not accepted for this kind of entry.
    #[error("{field} is not allowed here: {reason}")]
    NotAllowed { field: String, reason: String },
}

impl ValidationError {
    /// Shorthand for [`ValidationError::Required`].
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            product_id: "p-1".to_string(),
            available: 1,
            requested: 2,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for p-1: available 1, requested 2"
        );

        let err = CoreError::TicketNotActive {
            ticket_id: "t-1".to_string(),
            status: TicketStatus::Expired,
        };
        assert_eq!(
            err.to_string(),
            "Ticket t-1 is expired, session operations are not allowed"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::required("reason").into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert_eq!(core_err.to_string(), "Validation error: reason is required");
    }

    #[test]
    fn test_ticket_rule_classification() {
        assert!(CoreError::NothingToUndo("t".into()).is_ticket_rule());
        assert!(!CoreError::SaleNotFound("s".into()).is_ticket_rule());
    }
}
