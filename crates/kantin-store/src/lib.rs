//! # kantin-store: Flat-File Storage for Kantin POS
//!
//! This crate persists the catalog and the ledger to two CSV files and
//! runs the Stock Transaction Engine that keeps them consistent.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Kantin POS Data Flow                             │
//! │                                                                         │
//! │  kantin sell BRK001 3                                                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   kantin-store (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │  StockEngine  │    │  Repositories │    │  Maintenance │  │   │
//! │  │   │  (engine.rs)  │    │               │    │              │  │   │
//! │  │   │               │───►│ CatalogStore  │    │ BackupManager│  │   │
//! │  │   │ record_sale   │    │ LedgerStore   │    │ Exporter     │  │   │
//! │  │   │ restock       │    │ ActivityLog   │    │ Reporter     │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │   data/products.csv        data/transactions.csv                │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`store`] - Opening the stores, directory layout
//! - [`repository`] - Catalog and ledger stores behind async traits
//! - [`engine`] - Sale / restock saga and catalog management
//! - [`backup`] - Point-in-time copies and restore
//! - [`reporting`] - Read-only summaries
//! - [`export`] - CSV and xlsx exports
//! - [`activity`] - Operator activity log
//! - [`error`] - Store error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kantin_store::{Storage, StoreConfig};
//!
//! let storage = Storage::open(StoreConfig::new("data")).await?;
//!
//! let receipt = storage.engine().record_sale("BRK001", 3).await?;
//! let report = storage.reporter().sales_report(DateRange::all(), 5).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod activity;
mod atomic;
pub mod backup;
pub mod engine;
pub mod error;
pub mod export;
mod locks;
pub mod reporting;
pub mod repository;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use activity::{ActivityEntry, ActivityKind, ActivityLog};
pub use backup::{BackupInfo, BackupManager};
pub use engine::{EngineError, EngineResult, StockEngine};
pub use error::{StoreError, StoreResult};
pub use export::{ExportFormat, Exporter};
pub use locks::KeyedLocks;
pub use reporting::{Reporter, SalesReport};
pub use store::{FileEngine, FileReporter, Storage, StoreConfig};

// Repository re-exports for convenience
pub use repository::{
    CatalogRepository, CatalogStore, LedgerQuery, LedgerRepository, LedgerStore,
};

/// Catalog file name inside the data directory.
pub const CATALOG_FILE: &str = "products.csv";

/// Ledger file name inside the data directory.
pub const LEDGER_FILE: &str = "transactions.csv";
