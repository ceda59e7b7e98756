//! # Export
//!
//! Spreadsheet copies of transactions, products and daily totals, as CSV
//! or as an Excel workbook.
//!
//! ```text
//! data/exports/
//! ├── transactions_20240301_153012.csv
//! ├── products_20240301_153020.xlsx
//! └── daily_20240301_153031.csv
//! ```
//!
//! ## Encoding Path
//! ```text
//! rows ──serde──► CSV bytes ──┬──────────────────────────► .csv
//!                             │
//!                             └──► one sheet, bold header ──► .xlsx
//! ```
//!
//! Both formats share the CSV encoding, so a column has the same name in
//! either file. Export files are written through the same temp-then-rename
//! path as the catalog, so a half-written export never appears under its
//! final name.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use kantin_core::report::DailyTotal;
use kantin_core::{Product, TransactionRecord, ValidationError};
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::atomic::write_atomic;
use crate::error::{StoreError, StoreResult};

/// Columns kept as text in a workbook even when they look numeric.
///
/// An identifier such as `0899` must not turn into the number 899.
const TEXT_COLUMNS: [&str; 5] = [
    "identifier",
    "productIdentifier",
    "transactionId",
    "name",
    "category",
];

/// File format of an export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Xlsx,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
        }
    }
}

/// Writes export files into one directory.
#[derive(Debug, Clone)]
pub struct Exporter {
    dir: PathBuf,
}

impl Exporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Exporter { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `transactions_{stamp}`, same columns as the ledger.
    pub async fn transactions(
        &self,
        records: &[TransactionRecord],
        format: ExportFormat,
        now: DateTime<Utc>,
    ) -> StoreResult<PathBuf> {
        self.write("transactions", records, format, now).await
    }

    /// `products_{stamp}`, same columns as the catalog.
    pub async fn products(
        &self,
        products: &[Product],
        format: ExportFormat,
        now: DateTime<Utc>,
    ) -> StoreResult<PathBuf> {
        self.write("products", products, format, now).await
    }

    /// `daily_{stamp}`.
    pub async fn daily_totals(
        &self,
        days: &[DailyTotal],
        format: ExportFormat,
        now: DateTime<Utc>,
    ) -> StoreResult<PathBuf> {
        self.write("daily", days, format, now).await
    }

    async fn write<T: Serialize>(
        &self,
        prefix: &str,
        rows: &[T],
        format: ExportFormat,
        now: DateTime<Utc>,
    ) -> StoreResult<PathBuf> {
        let path = self.dir.join(export_file_name(prefix, format, now));

        let csv_bytes = encode_csv(prefix, rows)?;
        let bytes = match format {
            ExportFormat::Csv => csv_bytes,
            ExportFormat::Xlsx => {
                encode_xlsx(prefix, &csv_bytes).map_err(|e| StoreError::write_failed(&path, e))?
            }
        };

        write_atomic(&path, &bytes).await?;
        info!(path = %path.display(), rows = rows.len(), "Export written");
        Ok(path)
    }
}

fn export_file_name(prefix: &str, format: ExportFormat, now: DateTime<Utc>) -> String {
    format!(
        "{}_{}.{}",
        prefix,
        now.format("%Y%m%d_%H%M%S"),
        format.extension()
    )
}

fn encode_csv<T: Serialize>(prefix: &str, rows: &[T]) -> StoreResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| ValidationError::invalid_format(prefix, e.to_string()))?;
    }
    writer
        .into_inner()
        .map_err(|e| StoreError::Io(e.into_error()))
}

/// Copies CSV rows into a single sheet named after the export.
///
/// The first row is the header (bold). Integer cells become numbers unless
/// the column is in [`TEXT_COLUMNS`].
fn encode_xlsx(sheet: &str, csv_bytes: &[u8]) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet)?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(csv_bytes);

    let mut text_columns: Vec<bool> = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record.map_err(|e| XlsxError::ParameterError(e.to_string()))?;
        let row = u32::try_from(row).map_err(|_| XlsxError::RowColumnLimitError)?;

        for (col, field) in record.iter().enumerate() {
            let col = u16::try_from(col).map_err(|_| XlsxError::RowColumnLimitError)?;

            if row == 0 {
                text_columns.push(TEXT_COLUMNS.contains(&field));
                worksheet.write_string_with_format(row, col, field, &header_format)?;
                continue;
            }

            let as_text = text_columns.get(usize::from(col)).copied().unwrap_or(true);
            match field.parse::<i64>() {
                Ok(number) if !as_text => worksheet.write_number(row, col, number as f64)?,
                _ => worksheet.write_string(row, col, field)?,
            };
        }
    }

    workbook.save_to_buffer()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use kantin_core::Money;

    fn roti() -> Product {
        Product::new(
            "BRK001",
            "Roti Bakar",
            "Makanan",
            7,
            Money::from_minor(1000),
            Money::from_minor(1500),
        )
    }

    #[test]
    fn test_file_name() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 15, 30, 12).unwrap();
        assert_eq!(
            export_file_name("transactions", ExportFormat::Csv, now),
            "transactions_20240301_153012.csv"
        );
        assert_eq!(
            export_file_name("products", ExportFormat::Xlsx, now),
            "products_20240301_153012.xlsx"
        );
    }

    #[tokio::test]
    async fn test_products_export_has_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = Exporter::new(dir.path().join("exports"));

        let path = exporter
            .products(&[roti()], ExportFormat::Csv, Utc::now())
            .await
            .unwrap();
        let text = tokio::fs::read_to_string(&path).await.unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("identifier,name,category,stock,costPrice,sellPrice,active")
        );
        assert_eq!(lines.next(), Some("BRK001,Roti Bakar,Makanan,7,1000,1500,true"));
    }

    #[tokio::test]
    async fn test_xlsx_export_is_a_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = Exporter::new(dir.path());

        let path = exporter
            .products(&[roti()], ExportFormat::Xlsx, Utc::now())
            .await
            .unwrap();
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("xlsx"));

        // xlsx is a zip container
        let bytes = tokio::fs::read(&path).await.unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }

    #[tokio::test]
    async fn test_empty_export_is_still_written() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = Exporter::new(dir.path());
        for format in [ExportFormat::Csv, ExportFormat::Xlsx] {
            let path = exporter.daily_totals(&[], format, Utc::now()).await.unwrap();
            assert!(path.exists());
        }
    }
}
