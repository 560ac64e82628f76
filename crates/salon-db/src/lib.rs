//! # salon-db: Ledger Engine on SQLite
//!
//! Every write to the inventory ledger, the course ticket counters and the
//! sale records goes through this crate. Rules live in `salon-core`; this
//! crate runs them inside locked SQLite transactions.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Salon Ledger Data Flow                           │
//! │                                                                         │
//! │  Calling screen (sale, receive stock, consume session, stocktake)      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     salon-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ LedgerRepo    │    │ 001_initial  │  │   │
//! │  │   │ SqlitePool    │◄───│ TicketRepo    │    │ _schema.sql  │  │   │
//! │  │   │ busy_timeout  │    │ SaleRepo      │    │              │  │   │
//! │  │   │ WAL           │    │ StocktakeRepo │    │              │  │   │
//! │  │   └───────────────┘    │ ReportRepo    │    └──────────────┘  │   │
//! │  │                        └───────────────┘                      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (salon.db)                  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`config`] - Environment-driven engine configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (ledger, ticket, sale, etc.)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use salon_db::{Database, EngineConfig};
//!
//! let config = EngineConfig::from_env()?;
//! let db = Database::new(config.db_config()).await?;
//!
//! let sale = db.sales().record_sale(intent).await?;
//! let stock = db.ledger().current_stock(&sale.product_id.unwrap()).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{ConfigError, EngineConfig};
pub use error::{DbError, DbResult, ErrorCode};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::ledger::LedgerRepository;
pub use repository::product::ProductRepository;
pub use repository::report::ReportRepository;
pub use repository::sale::SaleRepository;
pub use repository::stocktake::StocktakeRepository;
pub use repository::ticket::TicketRepository;
