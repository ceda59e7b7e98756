//! End-to-end command runs against a throwaway data directory.

use std::path::{Path, PathBuf};

use clap::Parser;
use kantin_cli::cli::Cli;
use kantin_cli::error::{CliResult, ErrorCode};

struct Shop {
    dir: tempfile::TempDir,
    config: PathBuf,
}

impl Shop {
    fn new() -> Shop {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("kantin.toml");
        std::fs::write(&config, config_toml(&dir.path().join("data"))).unwrap();
        Shop { dir, config }
    }

    fn data(&self) -> PathBuf {
        self.dir.path().join("data")
    }

    async fn run(&self, args: &[&str]) -> CliResult<String> {
        self.run_as("admin", "admin123", args).await
    }

    async fn run_as(&self, user: &str, password: &str, args: &[&str]) -> CliResult<String> {
        let config = self.config.to_string_lossy().into_owned();
        let mut argv = vec!["kantin", "--config", config.as_str(), "--user", user, "--password", password];
        argv.extend_from_slice(args);
        kantin_cli::execute(Cli::try_parse_from(argv).unwrap()).await
    }
}

fn config_toml(data_dir: &Path) -> String {
    format!(
        "[storage]\ndata_dir = '{}'\n\n[shop]\nname = \"Kantin Test\"\nlow_stock_threshold = 5\n",
        data_dir.display()
    )
}

#[tokio::test]
async fn counter_day_end_to_end() {
    let shop = Shop::new();

    shop.run(&["product", "add", "BRK001", "Roti Bakar", "Makanan", "10", "1000", "1500"])
        .await
        .unwrap();

    let receipt = shop.run(&["sell", "BRK001\r\n", "3"]).await.unwrap();
    assert!(receipt.contains("Kantin Test"));
    assert!(receipt.contains("Rp 4.500"));
    assert!(receipt.contains("Stock left: 7"));

    let err = shop.run(&["sell", "BRK001", "8"]).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::InsufficientStock);

    let json = shop.run(&["--json", "report"]).await.unwrap();
    let report: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(report["summary"]["transactions"], 1);
    assert_eq!(report["summary"]["profit"], 1500);
    assert_eq!(report["topSellers"][0]["identifier"], "BRK001");

    let low = shop.run(&["low-stock"]).await.unwrap();
    assert!(low.starts_with("No products below 5"));
    let low = shop.run(&["low-stock", "--threshold", "8"]).await.unwrap();
    assert!(low.contains("BRK001"));
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let shop = Shop::new();
    let err = shop
        .run_as("admin", "tebak", &["product", "list"])
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::Unauthorized);
    assert_eq!(err.exit_code(), 5);
}

#[tokio::test]
async fn unknown_code_and_bad_input() {
    let shop = Shop::new();

    let err = shop.run(&["sell", "UNKNOWN", "1"]).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::NotFound);

    let err = shop.run(&["scan", "no spaces allowed"]).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ValidationError);

    shop.run(&["product", "add", "MNM001", "Es Teh", "Minuman", "5", "1500", "3000"])
        .await
        .unwrap();
    let err = shop.run(&["sell", "MNM001", "0"]).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ValidationError);
}

#[tokio::test]
async fn retired_products_drop_out_of_the_counter() {
    let shop = Shop::new();
    shop.run(&["product", "add", "MNM001", "Es Teh", "Minuman", "5", "1500", "3000"])
        .await
        .unwrap();
    shop.run(&["product", "retire", "MNM001"]).await.unwrap();

    let list = shop.run(&["product", "list"]).await.unwrap();
    assert_eq!(list, "No products found");
    let all = shop.run(&["product", "list", "--all"]).await.unwrap();
    assert!(all.contains("(retired)"));

    let err = shop.run(&["scan", "MNM001"]).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::NotFound);

    // History lookups still work
    let shown = shop.run(&["product", "show", "MNM001"]).await.unwrap();
    assert!(shown.contains("retired"));
}

#[tokio::test]
async fn backup_and_restore_through_the_cli() {
    let shop = Shop::new();
    shop.run(&["product", "add", "BRK001", "Roti Bakar", "Makanan", "10", "1000", "1500"])
        .await
        .unwrap();

    let created = shop.run(&["--json", "backup", "create"]).await.unwrap();
    let created: serde_json::Value = serde_json::from_str(&created).unwrap();
    let id = created["id"].as_str().unwrap().to_string();

    shop.run(&["sell", "BRK001", "4"]).await.unwrap();
    shop.run(&["backup", "restore", id.as_str()]).await.unwrap();

    let shown = shop.run(&["--json", "product", "show", "BRK001"]).await.unwrap();
    let shown: serde_json::Value = serde_json::from_str(&shown).unwrap();
    assert_eq!(shown["stock"], 10);

    let list = shop.run(&["backup", "list"]).await.unwrap();
    assert!(list.contains(&id));
    assert!(list.contains("pre-restore"));
}

#[tokio::test]
async fn export_writes_a_file() {
    let shop = Shop::new();
    shop.run(&["product", "add", "BRK001", "Roti Bakar", "Makanan", "10", "1000", "1500"])
        .await
        .unwrap();

    let out = shop.run(&["--json", "export", "products"]).await.unwrap();
    let out: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(out["rows"], 1);
    assert!(Path::new(out["path"].as_str().unwrap()).exists());
}

#[tokio::test]
async fn xlsx_export_writes_a_workbook() {
    let shop = Shop::new();
    shop.run(&["product", "add", "BRK001", "Roti Bakar", "Makanan", "10", "1000", "1500"])
        .await
        .unwrap();
    shop.run(&["sell", "BRK001", "2"]).await.unwrap();

    let out = shop
        .run(&["--json", "export", "transactions", "--format", "xlsx"])
        .await
        .unwrap();
    let out: serde_json::Value = serde_json::from_str(&out).unwrap();
    let path = Path::new(out["path"].as_str().unwrap());
    assert_eq!(path.extension().and_then(|e| e.to_str()), Some("xlsx"));
    assert!(std::fs::read(path).unwrap().starts_with(b"PK"));
}

#[tokio::test]
async fn saved_products_get_a_label() {
    let shop = Shop::new();
    shop.run(&["product", "add", "BRK001", "Roti Bakar", "Makanan", "10", "1000", "1500"])
        .await
        .unwrap();

    let label = shop.data().join("labels").join("BRK001.svg");
    assert!(label.exists());

    std::fs::remove_file(&label).unwrap();
    shop.run(&["product", "add", "MNM001", "Es Teh", "Minuman", "5", "1500", "3000"])
        .await
        .unwrap();

    let out = shop.run(&["labels", "regenerate", "--missing"]).await.unwrap();
    assert_eq!(out, "Generated 1 of 2 label(s), 1 already present");
    assert!(label.exists());

    let err = shop.run(&["labels", "generate", "NOPE01"]).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::NotFound);
}

#[tokio::test]
async fn catalog_and_backup_actions_are_logged_with_the_operator() {
    let shop = Shop::new();
    shop.run(&["product", "add", "BRK001", "Roti Bakar", "Makanan", "10", "1000", "1500"])
        .await
        .unwrap();
    shop.run(&["product", "edit", "BRK001", "--price", "2000"]).await.unwrap();
    shop.run(&["restock", "BRK001", "5"]).await.unwrap();
    shop.run(&["sell", "BRK001", "1"]).await.unwrap();
    shop.run(&["backup", "create"]).await.unwrap();

    let json = shop.run(&["--json", "activity"]).await.unwrap();
    let entries: serde_json::Value = serde_json::from_str(&json).unwrap();
    let kinds: Vec<&str> = entries
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["activityType"].as_str().unwrap())
        .collect();
    // Sales stay in the ledger only
    assert_eq!(
        kinds,
        vec!["PRODUCT_ADDED", "PRODUCT_EDITED", "RESTOCK", "BACKUP_CREATED"]
    );
    assert!(entries.as_array().unwrap().iter().all(|e| e["user"] == "admin"));
    assert_eq!(entries[1]["description"], "BRK001 price");

    let last = shop.run(&["activity", "--limit", "1"]).await.unwrap();
    assert_eq!(last.lines().count(), 1);
    assert!(last.contains("BACKUP_CREATED"));
}

#[tokio::test]
async fn info_reports_stock_value() {
    let shop = Shop::new();
    shop.run(&["product", "add", "BRK001", "Roti Bakar", "Makanan", "10", "1000", "1500"])
        .await
        .unwrap();
    shop.run(&["product", "add", "MNM001", "Es Teh", "Minuman", "4", "1500", "3000"])
        .await
        .unwrap();
    shop.run(&["sell", "BRK001", "3"]).await.unwrap();

    let json = shop.run(&["--json", "info"]).await.unwrap();
    let info: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(info["inventory"]["products"], 2);
    assert_eq!(info["inventory"]["units"], 11);
    assert_eq!(info["inventory"]["costValue"], 13_000);
    assert_eq!(info["inventory"]["retailValue"], 22_500);
    assert_eq!(info["ledgerRecords"], 1);

    let text = shop.run(&["info"]).await.unwrap();
    assert!(text.contains("Rp 22.500"));
}
