//! # Database Error Types
//!
//! Error type returned by every engine operation.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  CoreError (business rule)     sqlx::Error (SQLite)                    │
//! │       │                              │                                  │
//! │       │ Domain(..)                   │ BUSY/LOCKED → ConcurrencyConflict│
//! │       ▼                              ▼                                  │
//! │  DbError (this module) ── code() ──► ErrorCode for the calling screen  │
//! │                                                                         │
//! │  Every mutating operation is one transaction: whatever the variant,    │
//! │  nothing partial was committed.                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use salon_core::{CoreError, ValidationError};
use serde::Serialize;
use thiserror::Error;

/// Engine operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Business rule violation or invalid input.
    #[error(transparent)]
    Domain(#[from] CoreError),

    /// Lock contention / serialization failure.
    ///
    /// Nothing was committed; the whole operation may be retried from
    /// scratch.
    #[error("Concurrent update conflict: {0}")]
    ConcurrencyConflict(String),

    /// Unique constraint violation.
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Stored data contradicts an engine invariant.
    #[error("Ledger integrity violation: {0}")]
    Integrity(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

/// Machine-readable classification handed to calling screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Malformed input; a caller bug.
    ValidationError,
    /// Not enough stock; shown to the operator.
    InsufficientStock,
    /// Ticket exhausted / not active / nothing to undo / out of range.
    TicketRule,
    /// Unknown product, ticket or sale.
    NotFound,
    /// Sale reversal attempted twice.
    AlreadyReversed,
    /// Product still referenced by the ledger.
    Conflict,
    /// Retry the whole operation.
    ConcurrencyConflict,
    /// Anything else.
    DatabaseError,
}

impl DbError {
    /// Classifies the error for the caller.
    pub fn code(&self) -> ErrorCode {
        match self {
            DbError::Domain(core) => match core {
                CoreError::Validation(_) => ErrorCode::ValidationError,
                CoreError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
                CoreError::ProductNotFound(_)
                | CoreError::TicketNotFound(_)
                | CoreError::SaleNotFound(_) => ErrorCode::NotFound,
                CoreError::AlreadyReversed(_) => ErrorCode::AlreadyReversed,
                CoreError::ProductHasHistory { .. } => ErrorCode::Conflict,
                e if e.is_ticket_rule() => ErrorCode::TicketRule,
                _ => ErrorCode::DatabaseError,
            },
            DbError::ConcurrencyConflict(_) | DbError::PoolExhausted => {
                ErrorCode::ConcurrencyConflict
            }
            DbError::UniqueViolation { .. } | DbError::ForeignKeyViolation { .. } => {
                ErrorCode::Conflict
            }
            _ => ErrorCode::DatabaseError,
        }
    }

    /// Whether retrying the whole operation can succeed.
    pub fn is_retryable(&self) -> bool {
        self.code() == ErrorCode::ConcurrencyConflict
    }

    /// The wrapped business error, if any.
    pub fn as_core(&self) -> Option<&CoreError> {
        match self {
            DbError::Domain(core) => Some(core),
            _ => None,
        }
    }
}

impl From<ValidationError> for DbError {
    fn from(err: ValidationError) -> Self {
        DbError::Domain(CoreError::Validation(err))
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// SQLITE_BUSY / SQLITE_LOCKED (+ extended codes) → ConcurrencyConflict
/// "UNIQUE constraint failed"                     → UniqueViolation
/// "FOREIGN KEY constraint failed"                → ForeignKeyViolation
/// PoolTimedOut                                   → PoolExhausted
/// Other                                          → QueryFailed / Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                if is_contention_code(db_err.code().as_deref()) {
                    DbError::ConcurrencyConflict(msg.to_string())
                } else if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// SQLITE_BUSY (5) and SQLITE_LOCKED (6), including their extended codes
/// (e.g. 517 BUSY_SNAPSHOT, 262 LOCKED_SHAREDCACHE). The primary code is
/// the low byte.
fn is_contention_code(code: Option<&str>) -> bool {
    code.and_then(|c| c.parse::<i32>().ok())
        .map(|c| matches!(c & 0xff, 5 | 6))
        .unwrap_or(false)
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Unit Tests
// =============================================================================
