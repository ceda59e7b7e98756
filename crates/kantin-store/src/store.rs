//! # Storage Handle
//!
//! Opens both store files and wires the engine, reporter, backups,
//! exporter and activity log around them.
//!
//! ## Startup
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  StoreConfig::new("data")                                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Storage::open(config).await                                           │
//! │       │                                                                 │
//! │       ├── CatalogStore::open(data/products.csv)      ← corrupt? refuse │
//! │       ├── LedgerStore::open(data/transactions.csv)   ← corrupt? refuse │
//! │       ├── ActivityLog::open(data/activity_log.csv)                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌───────────────────────────────────────────────┐                     │
//! │  │ Storage                                       │                     │
//! │  │  engine()   → StockEngine (sales, catalog)    │                     │
//! │  │  reporter() → Reporter    (read-only)         │                     │
//! │  │  backups()  → BackupManager                   │                     │
//! │  │  exporter() → Exporter                        │                     │
//! │  │  activity() → ActivityLog (who did what)      │                     │
//! │  └───────────────────────────────────────────────┘                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use crate::activity::{ActivityLog, ACTIVITY_FILE};
use crate::backup::BackupManager;
use crate::engine::StockEngine;
use crate::error::StoreResult;
use crate::export::Exporter;
use crate::reporting::Reporter;
use crate::repository::{CatalogStore, LedgerStore};
use crate::{CATALOG_FILE, LEDGER_FILE};

// =============================================================================
// Configuration
// =============================================================================

/// Where the store files live.
///
/// ## Example
/// ```rust,ignore
/// let config = StoreConfig::new("./data")
///     .backup_dir("/mnt/usb/kantin-backup");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Directory holding `products.csv` and `transactions.csv`.
    pub data_dir: PathBuf,

    /// Backup root. Default: `{data_dir}/backup`
    pub backup_dir: PathBuf,

    /// Export output. Default: `{data_dir}/exports`
    pub export_dir: PathBuf,
}

impl StoreConfig {
    /// Creates a configuration rooted at `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        StoreConfig {
            backup_dir: data_dir.join("backup"),
            export_dir: data_dir.join("exports"),
            data_dir,
        }
    }

    /// Sets the backup directory.
    pub fn backup_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.backup_dir = dir.into();
        self
    }

    /// Sets the export directory.
    pub fn export_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.export_dir = dir.into();
        self
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.data_dir.join(CATALOG_FILE)
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join(LEDGER_FILE)
    }

    pub fn activity_path(&self) -> PathBuf {
        self.data_dir.join(ACTIVITY_FILE)
    }
}

// =============================================================================
// Storage
// =============================================================================

/// The engine over the file-backed stores.
pub type FileEngine = StockEngine<CatalogStore, LedgerStore>;

/// The reporter over the file-backed stores.
pub type FileReporter = Reporter<CatalogStore, LedgerStore>;

/// Main storage handle.
#[derive(Debug)]
pub struct Storage {
    config: StoreConfig,
    engine: FileEngine,
    reporter: FileReporter,
    backups: BackupManager,
    exporter: Exporter,
    activity: ActivityLog,
}

impl Storage {
    /// Opens (or creates) both stores.
    ///
    /// Fails with `StorageCorruption` if either file cannot be parsed.
    pub async fn open(config: StoreConfig) -> StoreResult<Self> {
        info!(data_dir = %config.data_dir.display(), "Opening stores");

        let catalog = Arc::new(CatalogStore::open(config.catalog_path()).await?);
        let ledger = Arc::new(LedgerStore::open(config.ledger_path()).await?);
        let activity = ActivityLog::open(config.activity_path()).await?;

        Ok(Storage {
            engine: StockEngine::new(Arc::clone(&catalog), Arc::clone(&ledger)),
            reporter: Reporter::new(catalog, ledger),
            backups: BackupManager::new(&config.backup_dir),
            exporter: Exporter::new(&config.export_dir),
            activity,
            config,
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Sales, restocks and catalog changes.
    pub fn engine(&self) -> &FileEngine {
        &self.engine
    }

    /// Read-only summaries.
    pub fn reporter(&self) -> &FileReporter {
        &self.reporter
    }

    pub fn backups(&self) -> &BackupManager {
        &self.backups
    }

    pub fn exporter(&self) -> &Exporter {
        &self.exporter
    }

    /// Operator actions on the catalog and backups.
    pub fn activity(&self) -> &ActivityLog {
        &self.activity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::CatalogRepository;

    #[test]
    fn test_default_layout() {
        let config = StoreConfig::new("data");
        assert_eq!(config.catalog_path(), PathBuf::from("data/products.csv"));
        assert_eq!(config.ledger_path(), PathBuf::from("data/transactions.csv"));
        assert_eq!(config.backup_dir, PathBuf::from("data/backup"));
        assert_eq!(config.export_dir, PathBuf::from("data/exports"));
        assert_eq!(config.activity_path(), PathBuf::from("data/activity_log.csv"));
    }

    #[tokio::test]
    async fn test_open_creates_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::open(StoreConfig::new(dir.path())).await.unwrap();

        assert!(storage.config().catalog_path().exists());
        assert!(storage.config().ledger_path().exists());
        assert!(storage.config().activity_path().exists());
        assert!(storage
            .engine()
            .catalog()
            .list_all()
            .await
            .unwrap()
            .is_empty());
    }
}
