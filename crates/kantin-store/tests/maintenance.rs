//! Backups, corruption handling, reports and exports.

mod common;

use chrono::{Duration, Utc};
use kantin_core::{DateRange, Money};
use kantin_store::{
    BackupManager, CatalogRepository, CatalogStore, EngineError, ExportFormat, LedgerRepository,
    Storage, StoreConfig, StoreError,
};

use common::{es_teh, flaky_engine, roti};

async fn storage(dir: &std::path::Path) -> Storage {
    Storage::open(StoreConfig::new(dir)).await.unwrap()
}

// =============================================================================
// Backup and Restore
// =============================================================================

#[tokio::test]
async fn restore_replaces_both_stores_wholesale() {
    let dir = tempfile::tempdir().unwrap();
    let storage = storage(dir.path()).await;
    let engine = storage.engine();

    engine.register_product(roti(10)).await.unwrap();
    engine.record_sale("BRK001", 3).await.unwrap();
    let backup = engine.create_backup(storage.backups()).await.unwrap();

    engine.record_sale("BRK001", 2).await.unwrap();
    engine.register_product(es_teh(20)).await.unwrap();

    let restored = engine
        .restore_backup(storage.backups(), &backup.id)
        .await
        .unwrap();
    assert_eq!(restored.id, backup.id);

    assert_eq!(engine.get_product("BRK001").await.unwrap().stock, 7);
    assert!(matches!(
        engine.get_product("MNM001").await,
        Err(EngineError::ProductNotFound(_))
    ));
    assert_eq!(engine.ledger().len().await, 1);

    // The state that was replaced is kept as its own backup
    let all = storage.backups().list().await.unwrap();
    assert_eq!(all.len(), 2);
    assert!(all.iter().any(|b| b.label() == Some("pre-restore")));

    // And the restored files are what a fresh process sees
    drop(storage);
    let reopened = Storage::open(StoreConfig::new(dir.path())).await.unwrap();
    assert_eq!(
        reopened.engine().catalog().get("BRK001").await.unwrap().stock,
        7
    );
    assert_eq!(reopened.engine().ledger().len().await, 1);
}

#[tokio::test]
async fn failed_ledger_restore_puts_the_catalog_back() {
    let dir = tempfile::tempdir().unwrap();
    let (catalog, ledger, engine) = flaky_engine(dir.path()).await;
    let backups = BackupManager::new(dir.path().join("backups"));

    engine.register_product(roti(10)).await.unwrap();
    let backup = engine.create_backup(&backups).await.unwrap();
    engine.record_sale("BRK001", 4).await.unwrap();
    engine.register_product(es_teh(20)).await.unwrap();
    let before = catalog.list_all().await.unwrap();

    ledger.fail_restores(true);
    let err = engine
        .restore_backup(&backups, &backup.id)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Storage(_)));

    assert_eq!(catalog.list_all().await.unwrap(), before);
    assert_eq!(ledger.inner.len().await, 1);

    let on_disk = CatalogStore::open(dir.path().join("products.csv"))
        .await
        .unwrap();
    assert_eq!(on_disk.list_all().await.unwrap(), before);

    // The target is still intact and can be restored once the ledger recovers
    ledger.fail_restores(false);
    engine.restore_backup(&backups, &backup.id).await.unwrap();
    assert_eq!(engine.get_product("BRK001").await.unwrap().stock, 10);
}

#[tokio::test]
async fn sales_continue_after_restore() {
    let dir = tempfile::tempdir().unwrap();
    let storage = storage(dir.path()).await;
    let engine = storage.engine();

    engine.register_product(roti(10)).await.unwrap();
    let backup = engine.create_backup(storage.backups()).await.unwrap();
    engine.record_sale("BRK001", 4).await.unwrap();
    engine
        .restore_backup(storage.backups(), &backup.id)
        .await
        .unwrap();

    let receipt = engine.record_sale("BRK001", 1).await.unwrap();
    assert_eq!(receipt.remaining_stock, 9);
    assert_eq!(engine.ledger().len().await, 1);
}

#[tokio::test]
async fn corrupt_backup_is_refused_before_touching_live_data() {
    let dir = tempfile::tempdir().unwrap();
    let storage = storage(dir.path()).await;
    let engine = storage.engine();

    engine.register_product(roti(10)).await.unwrap();
    engine.record_sale("BRK001", 3).await.unwrap();
    let backup = engine.create_backup(storage.backups()).await.unwrap();
    engine.record_sale("BRK001", 1).await.unwrap();

    // Torn final row
    let mut text = tokio::fs::read_to_string(backup.ledger_path()).await.unwrap();
    text.push_str("019000aa-0000-7000-8000-000000000000,2024-03-01T08:00:00Z,BRK0");
    tokio::fs::write(backup.ledger_path(), text).await.unwrap();

    let err = engine
        .restore_backup(storage.backups(), &backup.id)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::StorageCorruption { .. }));

    assert_eq!(engine.get_product("BRK001").await.unwrap().stock, 6);
    assert_eq!(engine.ledger().len().await, 2);
}

#[tokio::test]
async fn unknown_backup_id_is_a_validation_error() {
    let dir = tempfile::tempdir().unwrap();
    let storage = storage(dir.path()).await;

    for id in ["20240301_080000_000", "../products.csv", ""] {
        let err = storage
            .engine()
            .restore_backup(storage.backups(), id)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)), "{id}: {err:?}");
    }
}

#[tokio::test]
async fn prune_removes_only_old_backups() {
    let dir = tempfile::tempdir().unwrap();
    let storage = storage(dir.path()).await;
    storage.engine().register_product(roti(10)).await.unwrap();
    storage.engine().create_backup(storage.backups()).await.unwrap();

    let kept = storage.backups().prune(7, Utc::now()).await.unwrap();
    assert!(kept.is_empty());
    assert_eq!(storage.backups().list().await.unwrap().len(), 1);

    let removed = storage
        .backups()
        .prune(7, Utc::now() + Duration::days(8))
        .await
        .unwrap();
    assert_eq!(removed.len(), 1);
    assert!(storage.backups().list().await.unwrap().is_empty());
}

// =============================================================================
// Corruption at Startup
// =============================================================================

#[tokio::test]
async fn corrupt_catalog_refuses_to_open() {
    let dir = tempfile::tempdir().unwrap();
    tokio::fs::write(
        dir.path().join("products.csv"),
        "identifier,name,category,stock,costPrice,sellPrice,active\n\
         BRK001,Roti Bakar,Makanan,lots,1000,1500,true\n",
    )
    .await
    .unwrap();

    let err = Storage::open(StoreConfig::new(dir.path())).await.unwrap_err();
    assert!(matches!(err, StoreError::StorageCorruption { ref store, .. } if store == "catalog"));
}

#[tokio::test]
async fn corrupt_ledger_refuses_to_open() {
    let dir = tempfile::tempdir().unwrap();
    {
        let storage = storage(dir.path()).await;
        storage.engine().register_product(roti(10)).await.unwrap();
        storage.engine().record_sale("BRK001", 3).await.unwrap();
    }

    let ledger = dir.path().join("transactions.csv");
    let mut text = tokio::fs::read_to_string(&ledger).await.unwrap();
    text.truncate(text.len() - 5);
    tokio::fs::write(&ledger, text).await.unwrap();

    let err = Storage::open(StoreConfig::new(dir.path())).await.unwrap_err();
    assert!(matches!(err, StoreError::StorageCorruption { ref store, .. } if store == "ledger"));
}

// =============================================================================
// Reports
// =============================================================================

#[tokio::test]
async fn sales_report_over_mixed_activity() {
    let dir = tempfile::tempdir().unwrap();
    let storage = storage(dir.path()).await;
    let engine = storage.engine();

    engine.register_product(roti(10)).await.unwrap();
    engine.register_product(es_teh(20)).await.unwrap();
    engine.record_sale("BRK001", 3).await.unwrap();
    engine.record_sale("MNM001", 5).await.unwrap();
    engine.restock("BRK001", 10).await.unwrap();

    let report = storage
        .reporter()
        .sales_report(DateRange::all(), 5)
        .await
        .unwrap();

    // Restocks are not sales
    assert_eq!(report.summary.transactions, 2);
    assert_eq!(report.summary.units_sold, 8);
    assert_eq!(report.summary.revenue, Money::from_minor(4500 + 15000));
    assert_eq!(report.summary.profit, Money::from_minor(1500 + 7500));
    assert_eq!(report.daily.len(), 1);
    assert_eq!(report.top_sellers[0].identifier, "MNM001");
    assert_eq!(report.top_sellers[0].name, "Es Teh Manis");
}

#[tokio::test]
async fn empty_range_reports_zero() {
    let dir = tempfile::tempdir().unwrap();
    let storage = storage(dir.path()).await;
    storage.engine().register_product(roti(10)).await.unwrap();
    storage.engine().record_sale("BRK001", 3).await.unwrap();

    let tomorrow = Utc::now() + Duration::days(1);
    let report = storage
        .reporter()
        .sales_report(DateRange::between(tomorrow, tomorrow + Duration::days(1)), 5)
        .await
        .unwrap();

    assert_eq!(report.summary.transactions, 0);
    assert!(report.summary.revenue.is_zero());
    assert!(report.summary.average_transaction.is_zero());
    assert!(report.daily.is_empty());
    assert!(report.top_sellers.is_empty());
}

#[tokio::test]
async fn low_stock_lists_active_products_only() {
    let dir = tempfile::tempdir().unwrap();
    let storage = storage(dir.path()).await;
    let engine = storage.engine();

    engine.register_product(roti(4)).await.unwrap();
    engine.register_product(es_teh(2)).await.unwrap();
    engine.retire_product("MNM001").await.unwrap();

    let low = storage.reporter().low_stock(10).await.unwrap();
    let ids: Vec<_> = low.iter().map(|p| p.identifier.as_str()).collect();
    assert_eq!(ids, ["BRK001"]);
}

// =============================================================================
// Export
// =============================================================================

#[tokio::test]
async fn transaction_export_matches_ledger_rows() {
    let dir = tempfile::tempdir().unwrap();
    let storage = storage(dir.path()).await;
    storage.engine().register_product(roti(10)).await.unwrap();
    storage.engine().record_sale("BRK001", 3).await.unwrap();
    storage.engine().record_sale("BRK001", 2).await.unwrap();

    let records = storage
        .reporter()
        .transactions(DateRange::all())
        .await
        .unwrap();
    let path = storage
        .exporter()
        .transactions(&records, ExportFormat::Csv, Utc::now())
        .await
        .unwrap();

    assert!(path.starts_with(&storage.config().export_dir));
    let text = tokio::fs::read_to_string(&path).await.unwrap();
    assert_eq!(text.lines().count(), 3);
    assert!(text.lines().nth(1).unwrap().contains("BRK001"));

    // The live ledger is untouched by exporting
    let ledger = storage.engine().ledger().query(DateRange::all(), None).await.unwrap();
    assert_eq!(ledger.records().unwrap(), records);
}

#[tokio::test]
async fn inventory_value_counts_active_stock_only() {
    let dir = tempfile::tempdir().unwrap();
    let storage = storage(dir.path()).await;
    let engine = storage.engine();
    engine.register_product(roti(10)).await.unwrap();
    engine.register_product(es_teh(4)).await.unwrap();
    engine.record_sale("BRK001", 3).await.unwrap();
    engine.retire_product("MNM001").await.unwrap();

    let value = storage.reporter().inventory_value().await.unwrap();
    assert_eq!(value.products, 1);
    assert_eq!(value.units, 7);
    assert_eq!(value.cost_value, Money::from_minor(7_000));
    assert_eq!(value.retail_value, Money::from_minor(10_500));
}
