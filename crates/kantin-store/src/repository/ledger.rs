//! # Ledger Store
//!
//! Append-only transaction records persisted to `transactions.csv`.
//!
//! ## File Format
//! ```text
//! transactionId,timestamp,productIdentifier,quantity,unitCost,unitPrice,profit,kind
//! 018e...,2024-03-01T07:30:00.120Z,BRK001,3,1000,1500,1500,SALE
//! 018e...,2024-03-01T09:05:41.003Z,BRK001,20,1000,1500,0,RESTOCK
//! ```
//!
//! ## Append Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  append(record)                                                         │
//! │       │                                                                 │
//! │       ├── quantity <= 0 / profit mismatch? ──► Validation              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  lock ──► timestamp < tail? move it forward ──► encode one row         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  open(append) ──► write_all ──► sync_data ──► Ok(record)               │
//! │                        │             │                                  │
//! │                        └──── err ────┴──► set_len(previous length)     │
//! │                                           ──► WriteFailed              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rows are never rewritten or removed by normal operation. Because every
//! append keeps timestamps non-decreasing, write order is timestamp order and
//! queries stream the file front to back, stopping at the end of the range.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kantin_core::validation::validate_record;
use kantin_core::{DateRange, TransactionRecord, ValidationError};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::atomic::write_atomic;
use crate::error::{StoreError, StoreResult};
use crate::repository::LedgerRepository;

/// Column order of `transactions.csv`.
pub const LEDGER_HEADER: [&str; 8] = [
    "transactionId",
    "timestamp",
    "productIdentifier",
    "quantity",
    "unitCost",
    "unitPrice",
    "profit",
    "kind",
];

const STORE_NAME: &str = "ledger";

/// What the store remembers about the file between calls.
#[derive(Debug, Default)]
struct LedgerState {
    /// Committed byte length. Anything past it is an aborted write.
    len: u64,
    records: usize,
    last_timestamp: Option<DateTime<Utc>>,
    ids: HashSet<String>,
    /// Set when a failed append could not be rolled back.
    poisoned: Option<String>,
}

/// Flat-file append-only ledger.
///
/// ## Usage
/// ```rust,ignore
/// let ledger = LedgerStore::open("data/transactions.csv").await?;
/// let written = ledger.append(record).await?;
/// let today = ledger.query(DateRange::days(today, today), None).await?;
/// for record in today.iter() {
///     println!("{}", record?.transaction_id);
/// }
/// ```
#[derive(Debug)]
pub struct LedgerStore {
    path: PathBuf,
    state: Mutex<LedgerState>,
}

impl LedgerStore {
    /// Opens the ledger, creating a header-only file if none exists.
    ///
    /// Fails with `StorageCorruption` if the existing file cannot be parsed.
    pub async fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();

        let exists = fs::try_exists(&path).await?;
        let bytes = if exists { fs::read(&path).await? } else { Vec::new() };

        let state = if bytes.is_empty() {
            info!(path = %path.display(), "Creating empty ledger");
            let header = header_line();
            write_atomic(&path, &header).await?;
            LedgerState {
                len: header.len() as u64,
                ..Default::default()
            }
        } else {
            scan_ledger(&bytes, &path)?
        };

        info!(path = %path.display(), records = state.records, "Ledger loaded");

        Ok(LedgerStore {
            path,
            state: Mutex::new(state),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of committed records.
    pub async fn len(&self) -> usize {
        self.state.lock().await.records
    }

    /// True if no record was ever committed.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn check_poisoned(&self, state: &LedgerState) -> StoreResult<()> {
        match &state.poisoned {
            Some(reason) => Err(StoreError::corruption(STORE_NAME, &self.path, reason.clone())),
            None => Ok(()),
        }
    }

    /// Committed bytes of the file.
    async fn committed_bytes(&self, state: &LedgerState) -> StoreResult<Vec<u8>> {
        let mut bytes = fs::read(&self.path).await?;
        let len = state.len as usize;
        if bytes.len() < len {
            return Err(StoreError::corruption(
                STORE_NAME,
                &self.path,
                format!("file shrank to {} bytes, expected {}", bytes.len(), len),
            ));
        }
        bytes.truncate(len);
        Ok(bytes)
    }
}

#[async_trait]
impl LedgerRepository for LedgerStore {
    async fn append(&self, mut record: TransactionRecord) -> StoreResult<TransactionRecord> {
        validate_record(&record)?;

        let mut state = self.state.lock().await;
        self.check_poisoned(&state)?;

        if state.ids.contains(&record.transaction_id) {
            return Err(StoreError::duplicate("Transaction", record.transaction_id));
        }

        if let Some(last) = state.last_timestamp {
            if record.timestamp < last {
                debug!(
                    transaction_id = %record.transaction_id,
                    from = %record.timestamp,
                    to = %last,
                    "Clock behind ledger tail, moving timestamp forward"
                );
                record.timestamp = last;
            }
        }

        let line = encode_row(&record)?;

        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| StoreError::write_failed(&self.path, e))?;

        let written: std::io::Result<()> = async {
            file.write_all(&line).await?;
            file.flush().await?;
            file.sync_data().await
        }
        .await;

        if let Err(err) = written {
            warn!(
                transaction_id = %record.transaction_id,
                error = %err,
                "Ledger append failed, truncating to last committed row"
            );
            let rollback: std::io::Result<()> = async {
                file.set_len(state.len).await?;
                file.sync_data().await
            }
            .await;
            if let Err(rollback_err) = rollback {
                error!(
                    path = %self.path.display(),
                    error = %rollback_err,
                    "Could not truncate torn ledger row; ledger disabled until restored"
                );
                state.poisoned = Some(format!(
                    "torn append could not be rolled back: {rollback_err}"
                ));
            }
            return Err(StoreError::write_failed(&self.path, err));
        }

        state.len += line.len() as u64;
        state.records += 1;
        state.last_timestamp = Some(record.timestamp);
        state.ids.insert(record.transaction_id.clone());

        debug!(
            transaction_id = %record.transaction_id,
            identifier = %record.product_identifier,
            quantity = record.quantity,
            kind = record.kind.as_str(),
            "Ledger record appended"
        );
        Ok(record)
    }

    async fn query(&self, range: DateRange, product: Option<&str>) -> StoreResult<LedgerQuery> {
        let state = self.state.lock().await;
        self.check_poisoned(&state)?;
        let bytes = self.committed_bytes(&state).await?;
        drop(state);

        Ok(LedgerQuery {
            bytes: Arc::from(bytes),
            path: self.path.clone(),
            range,
            product: product.map(str::to_string),
        })
    }

    async fn snapshot_to(&self, dest: &Path) -> StoreResult<()> {
        let state = self.state.lock().await;
        self.check_poisoned(&state)?;
        let bytes = self.committed_bytes(&state).await?;
        write_atomic(dest, &bytes).await
    }

    async fn verify_snapshot(&self, src: &Path) -> StoreResult<()> {
        let bytes = fs::read(src).await?;
        scan_ledger(&bytes, src).map(|_| ())
    }

    async fn restore_from(&self, src: &Path) -> StoreResult<()> {
        let bytes = fs::read(src).await?;
        let restored = scan_ledger(&bytes, src)?;

        let mut state = self.state.lock().await;
        write_atomic(&self.path, &bytes).await?;
        let records = restored.records;
        *state = restored;

        info!(from = %src.display(), records, "Ledger restored");
        Ok(())
    }
}

// =============================================================================
// Query
// =============================================================================

/// A point-in-time view of the ledger, filtered lazily.
///
/// The bytes are captured when the query is made, so iterating twice
/// yields the same records even if appends happen in between.
#[derive(Debug, Clone)]
pub struct LedgerQuery {
    bytes: Arc<[u8]>,
    path: PathBuf,
    range: DateRange,
    product: Option<String>,
}

impl LedgerQuery {
    /// Starts (or restarts) iteration from the first row.
    pub fn iter(&self) -> LedgerIter<'_> {
        let rows = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(&self.bytes[..])
            .into_deserialize::<TransactionRecord>();

        LedgerIter {
            rows,
            range: self.range,
            product: self.product.as_deref(),
            path: &self.path,
            done: false,
        }
    }

    /// Collects every matching record.
    pub fn records(&self) -> StoreResult<Vec<TransactionRecord>> {
        self.iter().collect()
    }

    /// The window this query was made with.
    pub fn range(&self) -> DateRange {
        self.range
    }
}

/// Iterator over one [`LedgerQuery`].
pub struct LedgerIter<'a> {
    rows: csv::DeserializeRecordsIntoIter<&'a [u8], TransactionRecord>,
    range: DateRange,
    product: Option<&'a str>,
    path: &'a Path,
    done: bool,
}

impl Iterator for LedgerIter<'_> {
    type Item = StoreResult<TransactionRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            let record = match self.rows.next()? {
                Ok(record) => record,
                Err(e) => {
                    self.done = true;
                    return Some(Err(StoreError::corruption(
                        STORE_NAME,
                        self.path,
                        format!("bad row: {e}"),
                    )));
                }
            };

            // Rows are in timestamp order: nothing later can match.
            if self.range.is_past_end(&record.timestamp) {
                self.done = true;
                return None;
            }

            if !self.range.contains(&record.timestamp) {
                continue;
            }

            if let Some(product) = self.product {
                if record.product_identifier != product {
                    continue;
                }
            }

            return Some(Ok(record));
        }
        None
    }
}

// =============================================================================
// CSV Encoding
// =============================================================================

fn header_line() -> Vec<u8> {
    let mut line = LEDGER_HEADER.join(",").into_bytes();
    line.push(b'\n');
    line
}

/// Encodes one data row, newline-terminated.
fn encode_row(record: &TransactionRecord) -> StoreResult<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    writer
        .serialize(record)
        .map_err(|e| ValidationError::invalid_format("transaction", e.to_string()))?;

    writer
        .into_inner()
        .map_err(|e| StoreError::Io(e.into_error()))
}

/// Parses a whole ledger file and rebuilds the in-memory state.
///
/// ## Rejected (StorageCorruption)
/// - Torn tail (last row not newline-terminated)
/// - Header differs from [`LEDGER_HEADER`]
/// - Unparsable row, non-positive quantity, or profit that does not match
///   quantity and prices
/// - Duplicate transaction id
/// - Timestamp earlier than the row before it
fn scan_ledger(bytes: &[u8], path: &Path) -> StoreResult<LedgerState> {
    let corrupt = |reason: String| StoreError::corruption(STORE_NAME, path, reason);

    if bytes.last() != Some(&b'\n') {
        return Err(corrupt("last row is incomplete (torn write)".to_string()));
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| corrupt(format!("unreadable header: {e}")))?;
    if headers.iter().ne(LEDGER_HEADER.iter().copied()) {
        return Err(corrupt(format!(
            "unexpected header '{}'",
            headers.iter().collect::<Vec<_>>().join(",")
        )));
    }

    let mut state = LedgerState {
        len: bytes.len() as u64,
        ..Default::default()
    };

    for (index, row) in reader.deserialize::<TransactionRecord>().enumerate() {
        let line = index + 2;
        let record = row.map_err(|e| corrupt(format!("line {line}: {e}")))?;

        validate_record(&record).map_err(|e| corrupt(format!("line {line}: {e}")))?;

        if let Some(last) = state.last_timestamp {
            if record.timestamp < last {
                return Err(corrupt(format!(
                    "line {line}: timestamp {} is earlier than the row before it",
                    record.timestamp
                )));
            }
        }

        if !state.ids.insert(record.transaction_id.clone()) {
            return Err(corrupt(format!(
                "line {line}: transaction id {} appears twice",
                record.transaction_id
            )));
        }

        state.last_timestamp = Some(record.timestamp);
        state.records += 1;
    }

    Ok(state)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, TimeZone};
    use kantin_core::{EntryKind, Money, Product};

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

    async fn open_temp() -> (tempfile::TempDir, LedgerStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = LedgerStore::open(dir.path().join("transactions.csv"))
            .await
            .unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_append_and_reopen() {
        let (dir, ledger) = open_temp().await;
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 7, 30, 0).unwrap();

        let written = ledger
            .append(TransactionRecord::sale(&roti(), 3, at).unwrap())
            .await
            .unwrap();
        ledger
            .append(TransactionRecord::restock(&roti(), 5, at + Duration::minutes(5)))
            .await
            .unwrap();

        let reopened = LedgerStore::open(dir.path().join("transactions.csv"))
            .await
            .unwrap();
        assert_eq!(reopened.len().await, 2);

        let all = reopened.query(DateRange::all(), None).await.unwrap();
        let records = all.records().unwrap();
        assert_eq!(records[0], written);
        assert_eq!(records[1].kind, EntryKind::Restock);
    }

    #[tokio::test]
    async fn test_append_rejects_bad_records() {
        let (_dir, ledger) = open_temp().await;

        let mut zero = TransactionRecord::sale(&roti(), 1, Utc::now()).unwrap();
        zero.quantity = 0;
        zero.profit = Money::zero();
        assert!(matches!(
            ledger.append(zero).await,
            Err(StoreError::Validation(_))
        ));

        let record = TransactionRecord::sale(&roti(), 1, Utc::now()).unwrap();
        ledger.append(record.clone()).await.unwrap();
        assert!(matches!(
            ledger.append(record).await,
            Err(StoreError::Duplicate { .. })
        ));
        assert_eq!(ledger.len().await, 1);
    }

    #[tokio::test]
    async fn test_timestamps_never_go_backwards() {
        let (_dir, ledger) = open_temp().await;
        let later = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        let earlier = later - Duration::hours(1);

        ledger
            .append(TransactionRecord::sale(&roti(), 1, later).unwrap())
            .await
            .unwrap();
        let moved = ledger
            .append(TransactionRecord::sale(&roti(), 1, earlier).unwrap())
            .await
            .unwrap();

        assert_eq!(moved.timestamp, later);
    }

    #[tokio::test]
    async fn test_query_filters_by_range_and_product() {
        let (_dir, ledger) = open_temp().await;
        let mut teh = roti();
        teh.identifier = "MNM001".to_string();

        for (product, day) in [(&roti(), 1), (&teh, 1), (&roti(), 2), (&roti(), 3)] {
            let at = Utc.with_ymd_and_hms(2024, 3, day, 8, 0, 0).unwrap();
            ledger
                .append(TransactionRecord::sale(product, 1, at).unwrap())
                .await
                .unwrap();
        }

        let first = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let second = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();

        let query = ledger
            .query(DateRange::days(first, second), Some("BRK001"))
            .await
            .unwrap();
        let records = query.records().unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.product_identifier == "BRK001"));

        let empty = ledger
            .query(
                DateRange::days(
                    NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
                    NaiveDate::from_ymd_opt(2023, 1, 2).unwrap(),
                ),
                None,
            )
            .await
            .unwrap();
        assert_eq!(empty.iter().count(), 0);
    }

    #[tokio::test]
    async fn test_query_is_a_stable_snapshot() {
        let (_dir, ledger) = open_temp().await;
        ledger
            .append(TransactionRecord::sale(&roti(), 1, Utc::now()).unwrap())
            .await
            .unwrap();

        let query = ledger.query(DateRange::all(), None).await.unwrap();
        let first = query.records().unwrap();

        ledger
            .append(TransactionRecord::sale(&roti(), 2, Utc::now()).unwrap())
            .await
            .unwrap();

        assert_eq!(query.records().unwrap(), first);
        assert_eq!(first.len(), 1);
    }

    #[tokio::test]
    async fn test_open_detects_torn_tail() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transactions.csv");
        {
            let ledger = LedgerStore::open(&path).await.unwrap();
            ledger
                .append(TransactionRecord::sale(&roti(), 1, Utc::now()).unwrap())
                .await
                .unwrap();
        }

        let mut file = OpenOptions::new().append(true).open(&path).await.unwrap();
        file.write_all(b"0190-half-a-row,2024-03").await.unwrap();
        file.sync_all().await.unwrap();
        drop(file);

        let err = LedgerStore::open(&path).await.unwrap_err();
        assert!(matches!(err, StoreError::StorageCorruption { .. }));
    }

    #[test]
    fn test_scan_rejects_tampered_profit() {
        let path = Path::new("transactions.csv");
        let header = String::from_utf8(header_line()).unwrap();
        let row = "a1,2024-03-01T07:30:00Z,BRK001,3,1000,1500,9999,SALE\n";
        let err = scan_ledger(format!("{header}{row}").as_bytes(), path).unwrap_err();
        assert!(err.to_string().contains("line 2"));

        let ok = "a1,2024-03-01T07:30:00Z,BRK001,3,1000,1500,1500,SALE\n";
        let state = scan_ledger(format!("{header}{ok}").as_bytes(), path).unwrap();
        assert_eq!(state.records, 1);
    }

    #[tokio::test]
    async fn test_open_refuses_rows_with_overflowing_amounts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transactions.csv");
        let header = String::from_utf8(header_line()).unwrap();

        for row in [
            format!("a1,2024-03-01T07:30:00Z,BRK001,{},0,2,0,SALE\n", i64::MAX),
            format!("a1,2024-03-01T07:30:00Z,BRK001,2,0,{},0,SALE\n", i64::MAX),
        ] {
            fs::write(&path, format!("{header}{row}")).await.unwrap();
            let err = LedgerStore::open(&path).await.unwrap_err();
            assert!(matches!(err, StoreError::StorageCorruption { .. }));
        }
    }

    #[test]
    fn test_scan_rejects_duplicate_and_out_of_order() {
        let path = Path::new("transactions.csv");
        let header = String::from_utf8(header_line()).unwrap();

        let dup = "a1,2024-03-01T07:30:00Z,BRK001,1,1000,1500,500,SALE\n\
                   a1,2024-03-01T07:31:00Z,BRK001,1,1000,1500,500,SALE\n";
        assert!(scan_ledger(format!("{header}{dup}").as_bytes(), path).is_err());

        let backwards = "a1,2024-03-01T07:30:00Z,BRK001,1,1000,1500,500,SALE\n\
                         a2,2024-03-01T07:00:00Z,BRK001,1,1000,1500,500,SALE\n";
        assert!(scan_ledger(format!("{header}{backwards}").as_bytes(), path).is_err());
    }
}
