//! # Catalog Store
//!
//! Products persisted to `products.csv`.
//!
//! ## File Format
//! ```text
//! identifier,name,category,stock,costPrice,sellPrice,active
//! BRK001,Roti Bakar,Makanan,7,1000,1500,true
//! MNM001,Es Teh Manis,Minuman,40,1500,3000,true
//! OLD001,"Permen, Mint",Snack,0,200,500,false     ← retired (logical delete)
//! ```
//!
//! ## Mutation Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  adjust_stock("BRK001", -3)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  write lock ──► clone rows ──► apply change ──► encode CSV             │
//! │                                                   │                     │
//! │                                                   ▼                     │
//! │                          products.csv.tmp ► fsync ► rename             │
//! │                                                   │                     │
//! │                     ┌─────────────────────────────┴──────┐              │
//! │                     ▼ ok                                 ▼ err          │
//! │            swap in-memory rows                 rows untouched,          │
//! │                                                file untouched           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Memory and disk change together or not at all.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use kantin_core::validation::{validate_price, validate_stock};
use kantin_core::{CatalogEvent, Product, ValidationError, MAX_STOCK};
use tokio::fs;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info};

use crate::atomic::write_atomic;
use crate::error::{StoreError, StoreResult};
use crate::repository::CatalogRepository;

/// Column order of `products.csv`.
pub const CATALOG_HEADER: [&str; 7] = [
    "identifier",
    "name",
    "category",
    "stock",
    "costPrice",
    "sellPrice",
    "active",
];

const STORE_NAME: &str = "catalog";
const EVENT_CAPACITY: usize = 64;

/// Flat-file product catalog.
///
/// ## Usage
/// ```rust,ignore
/// let catalog = CatalogStore::open("data/products.csv").await?;
/// let roti = catalog.get("BRK001").await?;
/// catalog.adjust_stock("BRK001", -3).await?;
/// ```
#[derive(Debug)]
pub struct CatalogStore {
    path: PathBuf,
    products: RwLock<Vec<Product>>,
    events: broadcast::Sender<CatalogEvent>,
}

impl CatalogStore {
    /// Opens the catalog, creating an empty one if the file is missing or
    /// has zero bytes.
    ///
    /// Fails with `StorageCorruption` if the file cannot be parsed.
    pub async fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();

        let exists = fs::try_exists(&path).await?;
        let bytes = if exists { fs::read(&path).await? } else { Vec::new() };

        let products = if bytes.is_empty() {
            info!(path = %path.display(), "Creating empty catalog");
            write_atomic(&path, &encode_catalog(&[])?).await?;
            Vec::new()
        } else {
            parse_catalog(&bytes, &path)?
        };

        info!(path = %path.display(), products = products.len(), "Catalog loaded");

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(CatalogStore {
            path,
            products: RwLock::new(products),
            events,
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persists `next`, then makes it the live state.
    async fn commit(&self, live: &mut Vec<Product>, next: Vec<Product>) -> StoreResult<()> {
        let bytes = encode_catalog(&next)?;
        write_atomic(&self.path, &bytes).await?;
        *live = next;
        Ok(())
    }

    fn emit(&self, event: CatalogEvent) {
        // No receivers is fine.
        let _ = self.events.send(event);
    }
}

#[async_trait]
impl CatalogRepository for CatalogStore {
    async fn get(&self, identifier: &str) -> StoreResult<Product> {
        let products = self.products.read().await;
        products
            .iter()
            .find(|p| p.identifier == identifier)
            .cloned()
            .ok_or_else(|| StoreError::not_found("Product", identifier))
    }

    async fn list_all(&self) -> StoreResult<Vec<Product>> {
        Ok(self.products.read().await.clone())
    }

    async fn upsert(&self, product: Product) -> StoreResult<()> {
        if product.identifier.is_empty() {
            return Err(ValidationError::required("identifier").into());
        }
        validate_stock(product.stock)?;

        let mut live = self.products.write().await;
        let mut next = live.clone();
        match next.iter_mut().find(|p| p.identifier == product.identifier) {
            Some(existing) => *existing = product.clone(),
            None => next.push(product.clone()),
        }

        self.commit(&mut live, next).await?;
        drop(live);

        debug!(identifier = %product.identifier, active = product.active, "Product saved");

        if product.active {
            self.emit(CatalogEvent::ProductSaved {
                identifier: product.identifier,
                name: product.name,
            });
        } else {
            self.emit(CatalogEvent::ProductRetired {
                identifier: product.identifier,
            });
        }
        Ok(())
    }

    async fn adjust_stock(&self, identifier: &str, delta: i64) -> StoreResult<Product> {
        let mut live = self.products.write().await;

        let index = live
            .iter()
            .position(|p| p.identifier == identifier)
            .ok_or_else(|| StoreError::not_found("Product", identifier))?;

        let current = live[index].stock;
        let new_stock = current
            .checked_add(delta)
            .ok_or_else(|| ValidationError::out_of_range("stock", 0, MAX_STOCK))?;
        if new_stock < 0 {
            return Err(StoreError::InsufficientStock {
                identifier: identifier.to_string(),
                available: current,
                requested: delta.saturating_neg(),
            });
        }
        validate_stock(new_stock)?;

        let mut next = live.clone();
        next[index].stock = new_stock;
        let updated = next[index].clone();

        self.commit(&mut live, next).await?;

        debug!(identifier = %identifier, delta = delta, stock = new_stock, "Stock adjusted");
        Ok(updated)
    }

    async fn snapshot_to(&self, dest: &Path) -> StoreResult<()> {
        let products = self.products.read().await;
        let bytes = encode_catalog(&products)?;
        write_atomic(dest, &bytes).await
    }

    async fn verify_snapshot(&self, src: &Path) -> StoreResult<()> {
        let bytes = fs::read(src).await?;
        parse_catalog(&bytes, src).map(|_| ())
    }

    async fn restore_from(&self, src: &Path) -> StoreResult<()> {
        let bytes = fs::read(src).await?;
        let restored = parse_catalog(&bytes, src)?;

        let mut live = self.products.write().await;
        let count = restored.len();
        self.commit(&mut live, restored).await?;

        info!(from = %src.display(), products = count, "Catalog restored");
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<CatalogEvent> {
        self.events.subscribe()
    }
}

// =============================================================================
// CSV Encoding
// =============================================================================

/// Encodes the full catalog file (header always present).
pub(crate) fn encode_catalog(products: &[Product]) -> StoreResult<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    let encode_err = |e: csv::Error| ValidationError::invalid_format("product", e.to_string());

    writer.write_record(CATALOG_HEADER).map_err(encode_err)?;
    for product in products {
        writer.serialize(product).map_err(encode_err)?;
    }

    writer
        .into_inner()
        .map_err(|e| StoreError::Io(e.into_error()))
}

/// Parses and checks a catalog file.
///
/// ## Rejected (StorageCorruption)
/// - Header differs from [`CATALOG_HEADER`]
/// - Unparsable row
/// - Empty or duplicate identifier
/// - Stock or price negative or past its cap
pub(crate) fn parse_catalog(bytes: &[u8], path: &Path) -> StoreResult<Vec<Product>> {
    let corrupt = |reason: String| StoreError::corruption(STORE_NAME, path, reason);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| corrupt(format!("unreadable header: {e}")))?;
    if headers.iter().ne(CATALOG_HEADER.iter().copied()) {
        return Err(corrupt(format!(
            "unexpected header '{}'",
            headers.iter().collect::<Vec<_>>().join(",")
        )));
    }

    let mut products = Vec::new();
    let mut seen = HashSet::new();

    for row in reader.deserialize::<Product>() {
        let product = row.map_err(|e| corrupt(format!("bad row: {e}")))?;

        if product.identifier.is_empty() {
            return Err(corrupt(format!(
                "row {} has an empty identifier",
                products.len() + 1
            )));
        }
        if !seen.insert(product.identifier.clone()) {
            return Err(corrupt(format!(
                "identifier '{}' appears twice",
                product.identifier
            )));
        }
        validate_stock(product.stock)
            .and_then(|_| validate_price("costPrice", product.cost_price))
            .and_then(|_| validate_price("sellPrice", product.sell_price))
            .map_err(|e| corrupt(format!("'{}': {e}", product.identifier)))?;

        products.push(product);
    }

    Ok(products)
}

// =============================================================================
// Unit Tests
// =============================================================================
