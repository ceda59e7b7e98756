//! # Stock Transaction Engine
//!
//! The one place that changes the catalog and the ledger together.
//!
//! ## Sale Saga
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  record_sale("BRK001", 3)                                              │
//! │                                                                         │
//! │  1. quantity > 0?                       no ──► InvalidQuantity         │
//! │     quantity <= MAX_QUANTITY?           no ──► Validation              │
//! │  2. lock("BRK001")                                                     │
//! │  3. catalog.get                    absent ──► ProductNotFound          │
//! │  4. stock >= quantity?                  no ──► InsufficientStock       │
//! │  5. snapshot unit_cost / unit_price                                    │
//! │  6. catalog.adjust_stock(-3)        err ──► abort, ledger untouched    │
//! │  7. ledger.append(record)           err ──┐                             │
//! │                                           ▼                             │
//! │                        catalog.adjust_stock(+3)                        │
//! │                              ok ──► LedgerWriteFailed                  │
//! │                              err ─► CompensationFailed                 │
//! │  8. Receipt                                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Steps 1–5 have no side effects. Once step 6 starts the operation either
//! completes or compensates; there is no cancellation and no automatic retry.
//!
//! ## Locking
//! - A per-identifier lock is held from step 2 until the receipt (or the
//!   compensation) so two sales of one product never both see enough stock.
//! - Every mutation also holds the maintenance lock shared. Backup and
//!   restore take it exclusively, so they never see half a sale.

use std::sync::Arc;

use chrono::Utc;
use kantin_core::validation::{validate_product, validate_quantity, validate_search_query};
use kantin_core::{
    CatalogEvent, CoreError, Product, ProductEdit, Receipt, RestockAck, TransactionRecord,
    ValidationError,
};
use thiserror::Error;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, error, info, warn};

use crate::backup::{BackupInfo, BackupManager};
use crate::error::StoreError;
use crate::locks::KeyedLocks;
use crate::repository::{CatalogRepository, LedgerRepository};

// =============================================================================
// Engine Error
// =============================================================================

/// Every way an engine operation can fail.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Quantity was zero or negative.
    #[error("Invalid quantity {requested}: must be a positive whole number")]
    InvalidQuantity { requested: i64 },

    /// Malformed input. Nothing was written.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Identifier unknown, or the product is retired.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Identifier already used by another product.
    #[error("Product {0} already exists")]
    DuplicateProduct(String),

    /// Not enough stock. Nothing was written.
    #[error("Insufficient stock for {identifier}: available {available}, requested {requested}")]
    InsufficientStock {
        identifier: String,
        available: i64,
        requested: i64,
    },

    /// Ledger append failed and stock was put back. Safe to retry.
    #[error("Sale of {identifier} not completed, ledger write failed: {reason}")]
    LedgerWriteFailed { identifier: String, reason: String },

    /// A store file cannot be parsed. Restore from backup.
    #[error("{store} store is corrupt: {reason}")]
    StorageCorruption { store: String, reason: String },

    /// A catalog write failed before anything else happened. Nothing changed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Ledger append failed AND putting the stock back failed.
    ///
    /// The catalog is short by `quantity` units with no ledger record to
    /// explain it. Needs a manual stock correction.
    #[error(
        "Stock for {identifier} is off by {quantity} after a failed sale \
         and could not be corrected: {reason}"
    )]
    CompensationFailed {
        identifier: String,
        quantity: i64,
        reason: String,
    },
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { id, .. } => EngineError::ProductNotFound(id),
            StoreError::Duplicate { id, .. } => EngineError::DuplicateProduct(id),
            StoreError::Validation(e) => EngineError::Validation(e),
            StoreError::InsufficientStock {
                identifier,
                available,
                requested,
            } => EngineError::InsufficientStock {
                identifier,
                available,
                requested,
            },
            StoreError::StorageCorruption {
                store,
                path,
                reason,
            } => {
                error!(store = %store, path = %path.display(), reason = %reason, "Store corruption");
                EngineError::StorageCorruption {
                    store,
                    reason: format!("{} ({})", reason, path.display()),
                }
            }
            other @ (StoreError::WriteFailed { .. } | StoreError::Io(_)) => {
                EngineError::Storage(other.to_string())
            }
        }
    }
}

impl From<CoreError> for EngineError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ProductNotFound(id) => EngineError::ProductNotFound(id),
            CoreError::DuplicateProduct(id) => EngineError::DuplicateProduct(id),
            CoreError::InsufficientStock {
                identifier,
                available,
                requested,
            } => EngineError::InsufficientStock {
                identifier,
                available,
                requested,
            },
            CoreError::InvalidQuantity { requested } => EngineError::InvalidQuantity { requested },
            CoreError::Validation(e) => EngineError::Validation(e),
        }
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

// =============================================================================
// Engine
// =============================================================================

/// Applies sales, restocks and catalog edits across both stores.
///
/// ## Usage
/// ```rust,ignore
/// let engine = StockEngine::new(Arc::new(catalog), Arc::new(ledger));
/// let receipt = engine.record_sale("BRK001", 3).await?;
/// println!("{} x{} = {}", receipt.product_name, receipt.quantity, receipt.total);
/// ```
#[derive(Debug)]
pub struct StockEngine<C, L> {
    catalog: Arc<C>,
    ledger: Arc<L>,
    locks: KeyedLocks,
    maintenance: RwLock<()>,
}

impl<C, L> StockEngine<C, L>
where
    C: CatalogRepository,
    L: LedgerRepository,
{
    /// Creates an engine over the two stores.
    pub fn new(catalog: Arc<C>, ledger: Arc<L>) -> Self {
        StockEngine {
            catalog,
            ledger,
            locks: KeyedLocks::new(),
            maintenance: RwLock::new(()),
        }
    }

    /// The catalog this engine writes to.
    pub fn catalog(&self) -> &Arc<C> {
        &self.catalog
    }

    /// The ledger this engine writes to.
    pub fn ledger(&self) -> &Arc<L> {
        &self.ledger
    }

    /// Catalog change notifications (barcode label requests).
    pub fn subscribe(&self) -> broadcast::Receiver<CatalogEvent> {
        self.catalog.subscribe()
    }

    // =========================================================================
    // Sales and Restocks
    // =========================================================================

    /// Sells `quantity` units of `identifier`.
    pub async fn record_sale(&self, identifier: &str, quantity: i64) -> EngineResult<Receipt> {
        check_quantity(identifier, quantity, "Sale")?;

        let _maintenance = self.maintenance.read().await;
        let _guard = self.locks.lock(identifier).await;

        let product = self.catalog.get(identifier).await?;
        if let Err(rejection) = product.check_sale(quantity) {
            debug!(identifier = %identifier, quantity, reason = %rejection, "Sale rejected");
            return Err(rejection.into());
        }

        let record = TransactionRecord::sale(&product, quantity, Utc::now())?;

        let updated = self.catalog.adjust_stock(identifier, -quantity).await?;

        let record = match self.ledger.append(record).await {
            Ok(record) => record,
            Err(err) => return Err(self.compensate(identifier, quantity, err).await),
        };

        info!(
            transaction_id = %record.transaction_id,
            identifier = %identifier,
            quantity,
            profit = record.profit.minor(),
            stock = updated.stock,
            "Sale recorded"
        );

        Ok(Receipt::from_record(&record, &product.name, updated.stock))
    }

    /// Adds `quantity` units to `identifier` and writes a RESTOCK record.
    pub async fn restock(&self, identifier: &str, quantity: i64) -> EngineResult<RestockAck> {
        check_quantity(identifier, quantity, "Restock")?;

        let _maintenance = self.maintenance.read().await;
        let _guard = self.locks.lock(identifier).await;

        let product = self.active_product(identifier).await?;
        let record = TransactionRecord::restock(&product, quantity, Utc::now());

        let updated = self.catalog.adjust_stock(identifier, quantity).await?;

        let record = match self.ledger.append(record).await {
            Ok(record) => record,
            Err(err) => return Err(self.compensate(identifier, -quantity, err).await),
        };

        info!(
            transaction_id = %record.transaction_id,
            identifier = %identifier,
            quantity,
            stock = updated.stock,
            "Restock recorded"
        );

        Ok(RestockAck {
            transaction_id: record.transaction_id,
            identifier: identifier.to_string(),
            added: quantity,
            new_stock: updated.stock,
        })
    }

    /// Undoes a stock change whose ledger record could not be written.
    ///
    /// `undo` is the delta that reverses the applied change.
    async fn compensate(&self, identifier: &str, undo: i64, cause: StoreError) -> EngineError {
        let reason = cause.to_string();
        warn!(identifier = %identifier, undo, reason = %reason, "Ledger append failed, compensating");

        match self.catalog.adjust_stock(identifier, undo).await {
            Ok(restored) => {
                warn!(identifier = %identifier, stock = restored.stock, "Stock restored");
                match EngineError::from(cause) {
                    corrupt @ EngineError::StorageCorruption { .. } => corrupt,
                    _ => EngineError::LedgerWriteFailed {
                        identifier: identifier.to_string(),
                        reason,
                    },
                }
            }
            Err(undo_err) => {
                error!(
                    identifier = %identifier,
                    undo,
                    ledger_error = %reason,
                    error = %undo_err,
                    "Compensation failed, stock needs manual correction"
                );
                EngineError::CompensationFailed {
                    identifier: identifier.to_string(),
                    quantity: undo.abs(),
                    reason: format!("{reason}; then {undo_err}"),
                }
            }
        }
    }

    // =========================================================================
    // Catalog Management
    // =========================================================================

    /// Fetches a product, retired ones included.
    pub async fn get_product(&self, identifier: &str) -> EngineResult<Product> {
        Ok(self.catalog.get(identifier).await?)
    }

    /// Adds a new product to the catalog.
    ///
    /// The identifier may never be reused, not even one of a retired product.
    pub async fn register_product(&self, mut product: Product) -> EngineResult<Product> {
        product.name = product.name.trim().to_string();
        product.category = product.category.trim().to_string();
        product.active = true;
        validate_product(&product)?;

        let _maintenance = self.maintenance.read().await;
        let _guard = self.locks.lock(&product.identifier).await;

        match self.catalog.get(&product.identifier).await {
            Ok(_) => return Err(EngineError::DuplicateProduct(product.identifier)),
            Err(StoreError::NotFound { .. }) => {}
            Err(other) => return Err(other.into()),
        }

        if product.sells_below_cost() {
            warn!(identifier = %product.identifier, "Sell price is below cost price");
        }

        self.catalog.upsert(product.clone()).await?;
        info!(identifier = %product.identifier, stock = product.stock, "Product registered");
        Ok(product)
    }

    /// Changes name, category or prices. Stock is left alone.
    pub async fn edit_product(&self, identifier: &str, edit: ProductEdit) -> EngineResult<Product> {
        if edit.is_empty() {
            return Err(ValidationError::required("at least one field to change").into());
        }

        let _maintenance = self.maintenance.read().await;
        let _guard = self.locks.lock(identifier).await;

        let current = self.active_product(identifier).await?;
        let updated = edit.apply_to(&current);
        validate_product(&updated)?;

        if updated.sells_below_cost() {
            warn!(identifier = %identifier, "Sell price is below cost price");
        }

        self.catalog.upsert(updated.clone()).await?;
        info!(identifier = %identifier, "Product edited");
        Ok(updated)
    }

    /// Hides a product from sale and active listings. History is kept.
    pub async fn retire_product(&self, identifier: &str) -> EngineResult<Product> {
        let _maintenance = self.maintenance.read().await;
        let _guard = self.locks.lock(identifier).await;

        let mut product = self.active_product(identifier).await?;
        product.active = false;

        self.catalog.upsert(product.clone()).await?;
        info!(identifier = %identifier, "Product retired");
        Ok(product)
    }

    /// Products in catalog order.
    pub async fn list_products(&self, active_only: bool) -> EngineResult<Vec<Product>> {
        let products = self.catalog.list_all().await?;
        Ok(products
            .into_iter()
            .filter(|p| p.active || !active_only)
            .collect())
    }

    /// Case-insensitive substring search over active products.
    pub async fn search_products(&self, query: &str) -> EngineResult<Vec<Product>> {
        let needle = validate_search_query(query)?;
        let products = self.list_products(true).await?;

        if needle.is_empty() {
            return Ok(products);
        }

        Ok(products
            .into_iter()
            .filter(|p| {
                p.identifier.to_lowercase().contains(&needle)
                    || p.name.to_lowercase().contains(&needle)
                    || p.category.to_lowercase().contains(&needle)
            })
            .collect())
    }

    async fn active_product(&self, identifier: &str) -> EngineResult<Product> {
        let product = self.catalog.get(identifier).await?;
        if !product.active {
            return Err(EngineError::ProductNotFound(identifier.to_string()));
        }
        Ok(product)
    }

    // =========================================================================
    // Backup and Restore
    // =========================================================================

    /// Copies both stores with no sale in flight.
    pub async fn create_backup(&self, backups: &BackupManager) -> EngineResult<BackupInfo> {
        let _maintenance = self.maintenance.write().await;
        Ok(backups
            .create(&*self.catalog, &*self.ledger, None)
            .await?)
    }

    /// Replaces both stores with the backup `id`. No merge.
    ///
    /// ## Steps
    /// ```text
    /// verify catalog + ledger files ──► safety backup of current state
    ///      ──► replace catalog ──► replace ledger
    ///                                  │ err
    ///                                  ▼
    ///                      catalog put back from safety backup
    /// ```
    pub async fn restore_backup(&self, backups: &BackupManager, id: &str) -> EngineResult<BackupInfo> {
        let _maintenance = self.maintenance.write().await;

        let target = backups.find(id).await.map_err(|e| match e {
            StoreError::NotFound { id, .. } => EngineError::Validation(
                ValidationError::invalid_format("backup", format!("no backup named '{id}'")),
            ),
            other => other.into(),
        })?;
        self.catalog.verify_snapshot(&target.catalog_path()).await?;
        self.ledger.verify_snapshot(&target.ledger_path()).await?;

        let safety = backups
            .create(&*self.catalog, &*self.ledger, Some("pre-restore"))
            .await?;
        info!(backup = %target.id, safety = %safety.id, "Restoring backup");

        self.catalog.restore_from(&target.catalog_path()).await?;

        if let Err(err) = self.ledger.restore_from(&target.ledger_path()).await {
            error!(backup = %target.id, error = %err, "Ledger restore failed, rolling catalog back");
            if let Err(rollback) = self.catalog.restore_from(&safety.catalog_path()).await {
                error!(safety = %safety.id, error = %rollback, "Catalog rollback failed");
                return Err(EngineError::StorageCorruption {
                    store: "catalog".to_string(),
                    reason: format!(
                        "restore of {} failed ({err}) and rollback failed ({rollback}); \
                         restore backup {} manually",
                        target.id, safety.id
                    ),
                });
            }
            return Err(err.into());
        }

        info!(backup = %target.id, "Backup restored");
        Ok(target)
    }
}

/// Step 1 of the saga: a positive quantity within [`kantin_core::MAX_QUANTITY`].
fn check_quantity(identifier: &str, quantity: i64, operation: &str) -> EngineResult<()> {
    if quantity <= 0 {
        debug!(identifier = %identifier, quantity, "{operation} rejected: invalid quantity");
        return Err(EngineError::InvalidQuantity {
            requested: quantity,
        });
    }
    validate_quantity(quantity)?;
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{CatalogStore, LedgerStore};
    use kantin_core::Money;

    async fn engine() -> (tempfile::TempDir, StockEngine<CatalogStore, LedgerStore>) {
        let dir = tempfile::tempdir().unwrap();
        let catalog = CatalogStore::open(dir.path().join("products.csv"))
            .await
            .unwrap();
        let ledger = LedgerStore::open(dir.path().join("transactions.csv"))
            .await
            .unwrap();
        (dir, StockEngine::new(Arc::new(catalog), Arc::new(ledger)))
    }

    fn roti() -> Product {
        Product::new(
            "BRK001",
            "Roti Bakar",
            "Makanan",
            10,
            Money::from_minor(1000),
            Money::from_minor(1500),
        )
    }

    #[tokio::test]
    async fn test_register_rejects_duplicates_and_invalid() {
        let (_dir, engine) = engine().await;
        engine.register_product(roti()).await.unwrap();

        assert!(matches!(
            engine.register_product(roti()).await,
            Err(EngineError::DuplicateProduct(id)) if id == "BRK001"
        ));

        let mut bad = roti();
        bad.identifier = "X Y".to_string();
        assert!(matches!(
            engine.register_product(bad).await,
            Err(EngineError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_retired_identifier_cannot_be_reused() {
        let (_dir, engine) = engine().await;
        engine.register_product(roti()).await.unwrap();
        engine.retire_product("BRK001").await.unwrap();

        assert!(matches!(
            engine.register_product(roti()).await,
            Err(EngineError::DuplicateProduct(_))
        ));
    }

    #[tokio::test]
    async fn test_edit_keeps_stock() {
        let (_dir, engine) = engine().await;
        engine.register_product(roti()).await.unwrap();
        engine.record_sale("BRK001", 4).await.unwrap();

        let edited = engine
            .edit_product(
                "BRK001",
                ProductEdit {
                    sell_price: Some(Money::from_minor(2000)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(edited.stock, 6);
        assert_eq!(edited.sell_price, Money::from_minor(2000));
        assert!(matches!(
            engine.edit_product("BRK001", ProductEdit::default()).await,
            Err(EngineError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_retired_products_cannot_be_sold_or_restocked() {
        let (_dir, engine) = engine().await;
        engine.register_product(roti()).await.unwrap();
        engine.retire_product("BRK001").await.unwrap();

        assert!(matches!(
            engine.record_sale("BRK001", 1).await,
            Err(EngineError::ProductNotFound(_))
        ));
        assert!(matches!(
            engine.restock("BRK001", 1).await,
            Err(EngineError::ProductNotFound(_))
        ));

        // Still visible for history
        let product = engine.get_product("BRK001").await.unwrap();
        assert!(!product.active);
        assert!(engine.list_products(true).await.unwrap().is_empty());
        assert_eq!(engine.list_products(false).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_search_products() {
        let (_dir, engine) = engine().await;
        engine.register_product(roti()).await.unwrap();
        engine
            .register_product(Product::new(
                "MNM001",
                "Es Teh Manis",
                "Minuman",
                20,
                Money::from_minor(1500),
                Money::from_minor(3000),
            ))
            .await
            .unwrap();

        let by_name = engine.search_products("teh").await.unwrap();
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].identifier, "MNM001");

        let by_category = engine.search_products("MAKANAN").await.unwrap();
        assert_eq!(by_category[0].identifier, "BRK001");

        assert_eq!(engine.search_products("").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_quantity_touches_nothing() {
        let (_dir, engine) = engine().await;
        engine.register_product(roti()).await.unwrap();

        for qty in [0, -5] {
            assert!(matches!(
                engine.record_sale("BRK001", qty).await,
                Err(EngineError::InvalidQuantity { .. })
            ));
            assert!(matches!(
                engine.restock("BRK001", qty).await,
                Err(EngineError::InvalidQuantity { .. })
            ));
        }
        assert_eq!(engine.get_product("BRK001").await.unwrap().stock, 10);
        assert!(engine.ledger().is_empty().await);
    }

    #[tokio::test]
    async fn test_oversized_amounts_are_refused_without_writing() {
        let (_dir, engine) = engine().await;

        let mut big = roti();
        big.identifier = "BIG001".to_string();
        big.stock = 1_000_000_000_000;
        big.sell_price = Money::from_minor(10_000_000);
        assert!(matches!(
            engine.register_product(big.clone()).await,
            Err(EngineError::Validation(ValidationError::OutOfRange { .. }))
        ));

        assert!(matches!(
            engine.record_sale("BRK001", 1_000_000_000_000).await,
            Err(EngineError::Validation(ValidationError::OutOfRange { .. }))
        ));

        // A price no form would accept, written straight to the catalog
        big.stock = 10;
        big.sell_price = Money::from_minor(i64::MAX);
        engine.catalog().upsert(big).await.unwrap();
        assert!(matches!(
            engine.record_sale("BIG001", 2).await,
            Err(EngineError::Validation(_))
        ));
        assert_eq!(engine.get_product("BIG001").await.unwrap().stock, 10);
        assert!(engine.ledger().is_empty().await);
    }

    #[test]
    fn test_store_errors_map_to_engine_errors() {
        let err: EngineError = StoreError::not_found("Product", "UNKNOWN").into();
        assert!(matches!(err, EngineError::ProductNotFound(id) if id == "UNKNOWN"));

        let err: EngineError = StoreError::corruption(
            "ledger",
            std::path::Path::new("transactions.csv"),
            "torn tail",
        )
        .into();
        assert!(matches!(err, EngineError::StorageCorruption { store, .. } if store == "ledger"));
    }
}
