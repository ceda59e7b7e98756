//! Shared fixtures for the store integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use kantin_core::{CatalogEvent, DateRange, Money, Product, TransactionRecord};
use kantin_store::{
    CatalogRepository, CatalogStore, LedgerQuery, LedgerRepository, LedgerStore, StockEngine,
    StoreError, StoreResult,
};
use tokio::sync::broadcast;

pub fn roti(stock: i64) -> Product {
    Product::new(
        "BRK001",
        "Roti Bakar",
        "Makanan",
        stock,
        Money::from_minor(1000),
        Money::from_minor(1500),
    )
}

pub fn es_teh(stock: i64) -> Product {
    Product::new(
        "MNM001",
        "Es Teh Manis",
        "Minuman",
        stock,
        Money::from_minor(1500),
        Money::from_minor(3000),
    )
}

pub async fn open_stores(dir: &Path) -> (Arc<CatalogStore>, Arc<LedgerStore>) {
    let catalog = CatalogStore::open(dir.join("products.csv")).await.unwrap();
    let ledger = LedgerStore::open(dir.join("transactions.csv")).await.unwrap();
    (Arc::new(catalog), Arc::new(ledger))
}

// =============================================================================
// Failure Injection
// =============================================================================

/// A real ledger that can be told to refuse appends or restores.
pub struct FlakyLedger {
    pub inner: Arc<LedgerStore>,
    fail_appends: AtomicBool,
    fail_restores: AtomicBool,
}

impl FlakyLedger {
    pub fn new(inner: Arc<LedgerStore>) -> Self {
        FlakyLedger {
            inner,
            fail_appends: AtomicBool::new(false),
            fail_restores: AtomicBool::new(false),
        }
    }

    pub fn fail_appends(&self, fail: bool) {
        self.fail_appends.store(fail, Ordering::SeqCst);
    }

    pub fn fail_restores(&self, fail: bool) {
        self.fail_restores.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl LedgerRepository for FlakyLedger {
    async fn append(&self, record: TransactionRecord) -> StoreResult<TransactionRecord> {
        if self.fail_appends.load(Ordering::SeqCst) {
            return Err(StoreError::WriteFailed {
                path: self.inner.path().to_path_buf(),
                reason: "No space left on device".to_string(),
            });
        }
        self.inner.append(record).await
    }

    async fn query(&self, range: DateRange, product: Option<&str>) -> StoreResult<LedgerQuery> {
        self.inner.query(range, product).await
    }

    async fn snapshot_to(&self, dest: &Path) -> StoreResult<()> {
        self.inner.snapshot_to(dest).await
    }

    async fn verify_snapshot(&self, src: &Path) -> StoreResult<()> {
        self.inner.verify_snapshot(src).await
    }

    async fn restore_from(&self, src: &Path) -> StoreResult<()> {
        if self.fail_restores.load(Ordering::SeqCst) {
            return Err(StoreError::WriteFailed {
                path: self.inner.path().to_path_buf(),
                reason: "Input/output error".to_string(),
            });
        }
        self.inner.restore_from(src).await
    }
}

/// A real catalog that can be told to refuse stock increases
/// (the compensating step of a failed sale).
pub struct FlakyCatalog {
    pub inner: Arc<CatalogStore>,
    fail_increments: AtomicBool,
}

impl FlakyCatalog {
    pub fn new(inner: Arc<CatalogStore>) -> Self {
        FlakyCatalog {
            inner,
            fail_increments: AtomicBool::new(false),
        }
    }

    pub fn fail_increments(&self, fail: bool) {
        self.fail_increments.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl CatalogRepository for FlakyCatalog {
    async fn get(&self, identifier: &str) -> StoreResult<Product> {
        self.inner.get(identifier).await
    }

    async fn list_all(&self) -> StoreResult<Vec<Product>> {
        self.inner.list_all().await
    }

    async fn upsert(&self, product: Product) -> StoreResult<()> {
        self.inner.upsert(product).await
    }

    async fn adjust_stock(&self, identifier: &str, delta: i64) -> StoreResult<Product> {
        if delta > 0 && self.fail_increments.load(Ordering::SeqCst) {
            return Err(StoreError::WriteFailed {
                path: self.inner.path().to_path_buf(),
                reason: "Read-only file system".to_string(),
            });
        }
        self.inner.adjust_stock(identifier, delta).await
    }

    async fn snapshot_to(&self, dest: &Path) -> StoreResult<()> {
        self.inner.snapshot_to(dest).await
    }

    async fn verify_snapshot(&self, src: &Path) -> StoreResult<()> {
        self.inner.verify_snapshot(src).await
    }

    async fn restore_from(&self, src: &Path) -> StoreResult<()> {
        self.inner.restore_from(src).await
    }

    fn subscribe(&self) -> broadcast::Receiver<CatalogEvent> {
        self.inner.subscribe()
    }
}

pub type FlakyEngine = StockEngine<FlakyCatalog, FlakyLedger>;

/// Engine over flaky wrappers, plus handles to flip the failures.
pub async fn flaky_engine(dir: &Path) -> (Arc<FlakyCatalog>, Arc<FlakyLedger>, FlakyEngine) {
    let (catalog, ledger) = open_stores(dir).await;
    let catalog = Arc::new(FlakyCatalog::new(catalog));
    let ledger = Arc::new(FlakyLedger::new(ledger));
    let engine = StockEngine::new(Arc::clone(&catalog), Arc::clone(&ledger));
    (catalog, ledger, engine)
}
