//! # Repository Module
//!
//! The two stores behind the engine, and the traits the engine sees them through.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  StockEngine<C, L>                                                     │
//! │       │                                                                 │
//! │       │  catalog.adjust_stock("BRK001", -3)                            │
//! │       │  ledger.append(record)                                         │
//! │       ▼                                                                 │
//! │  CatalogRepository            LedgerRepository                         │
//! │  ├── get(identifier)          ├── append(record)                       │
//! │  ├── list_all()               ├── query(range, product?)               │
//! │  ├── upsert(product)          ├── snapshot_to / restore_from           │
//! │  ├── adjust_stock(id, delta)  └── verify_snapshot                      │
//! │  └── snapshot_to / restore_from / verify_snapshot                      │
//! │       │                               │                                 │
//! │       ▼                               ▼                                 │
//! │  CatalogStore (products.csv)   LedgerStore (transactions.csv)          │
//! │                                                                         │
//! │  The traits exist so tests can wrap a real store and inject failures   │
//! │  (a ledger that refuses to append, a catalog that refuses to undo).    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Stores
//!
//! - [`CatalogStore`] - keyed product records, full-file atomic rewrites
//! - [`LedgerStore`] - append-only transaction records

pub mod catalog;
pub mod ledger;

use std::path::Path;

use async_trait::async_trait;
use kantin_core::{CatalogEvent, DateRange, Product, TransactionRecord};
use tokio::sync::broadcast;

use crate::error::StoreResult;

pub use catalog::CatalogStore;
pub use ledger::{LedgerIter, LedgerQuery, LedgerStore};

// =============================================================================
// Catalog
// =============================================================================

/// Durable keyed persistence of products.
#[async_trait]
pub trait CatalogRepository: Send + Sync + 'static {
    /// Fetches one product (active or retired). `NotFound` if absent.
    async fn get(&self, identifier: &str) -> StoreResult<Product>;

    /// Every product in insertion order, retired ones included.
    async fn list_all(&self) -> StoreResult<Vec<Product>>;

    /// Inserts or replaces by identifier.
    ///
    /// Rejects an empty identifier or negative stock with `Validation`.
    async fn upsert(&self, product: Product) -> StoreResult<()>;

    /// Atomic read-modify-write of one product's stock.
    ///
    /// Returns the updated product. `InsufficientStock` if the result would be
    /// negative, `NotFound` if the identifier is absent.
    async fn adjust_stock(&self, identifier: &str, delta: i64) -> StoreResult<Product>;

    /// Writes a consistent copy of the catalog file to `dest`.
    async fn snapshot_to(&self, dest: &Path) -> StoreResult<()>;

    /// Parses `src` without touching the live catalog.
    async fn verify_snapshot(&self, src: &Path) -> StoreResult<()>;

    /// Replaces the live catalog wholesale with `src`.
    async fn restore_from(&self, src: &Path) -> StoreResult<()>;

    /// Notifications for saved and retired products.
    fn subscribe(&self) -> broadcast::Receiver<CatalogEvent>;
}

// =============================================================================
// Ledger
// =============================================================================

/// Durable append-only persistence of transaction records.
#[async_trait]
pub trait LedgerRepository: Send + Sync + 'static {
    /// Appends one record, durable before returning.
    ///
    /// Returns the record as written (its timestamp may have been moved
    /// forward to keep the file in timestamp order).
    async fn append(&self, record: TransactionRecord) -> StoreResult<TransactionRecord>;

    /// Records in `range` (and for `product`, if given), oldest first.
    async fn query(&self, range: DateRange, product: Option<&str>) -> StoreResult<LedgerQuery>;

    /// Writes a consistent copy of the ledger file to `dest`.
    async fn snapshot_to(&self, dest: &Path) -> StoreResult<()>;

    /// Parses `src` without touching the live ledger.
    async fn verify_snapshot(&self, src: &Path) -> StoreResult<()>;

    /// Replaces the live ledger wholesale with `src`.
    async fn restore_from(&self, src: &Path) -> StoreResult<()>;
}
