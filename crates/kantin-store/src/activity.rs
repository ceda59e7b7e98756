//! # Activity Log
//!
//! Who changed the catalog, and who took or restored a backup.
//!
//! ## File Format
//! ```text
//! timestamp,user,activityType,description
//! 2024-03-01T07:02:11.532Z,admin,PRODUCT_ADDED,BRK001 Roti Bakar (stock 20)
//! 2024-03-01T16:45:00.004Z,admin,BACKUP_CREATED,20240301_164500_004
//! ```
//!
//! Like the ledger, the file is only ever appended to. Unlike the ledger it
//! is not part of a sale: a failed append is reported to the caller, who
//! decides whether the action it describes still counts. Sales are already
//! in `transactions.csv` and are not repeated here.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use kantin_core::ValidationError;
use serde::{Deserialize, Serialize};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::atomic::write_atomic;
use crate::error::{StoreError, StoreResult};

/// Activity log file name inside the data directory.
pub const ACTIVITY_FILE: &str = "activity_log.csv";

/// Column order of `activity_log.csv`.
pub const ACTIVITY_HEADER: [&str; 4] = ["timestamp", "user", "activityType", "description"];

/// Entries returned by [`ActivityLog::recent`] when no limit is given.
pub const DEFAULT_RECENT_ACTIVITY: usize = 10;

const STORE_NAME: &str = "activity log";

/// What was done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityKind {
    ProductAdded,
    ProductEdited,
    ProductRetired,
    Restock,
    BackupCreated,
    BackupRestored,
    BackupPruned,
    LabelsGenerated,
    Export,
}

impl ActivityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::ProductAdded => "PRODUCT_ADDED",
            ActivityKind::ProductEdited => "PRODUCT_EDITED",
            ActivityKind::ProductRetired => "PRODUCT_RETIRED",
            ActivityKind::Restock => "RESTOCK",
            ActivityKind::BackupCreated => "BACKUP_CREATED",
            ActivityKind::BackupRestored => "BACKUP_RESTORED",
            ActivityKind::BackupPruned => "BACKUP_PRUNED",
            ActivityKind::LabelsGenerated => "LABELS_GENERATED",
            ActivityKind::Export => "EXPORT",
        }
    }
}

/// One row of the activity log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub timestamp: DateTime<Utc>,
    pub user: String,
    pub activity_type: ActivityKind,
    pub description: String,
}

/// Append-only log of operator actions.
#[derive(Debug)]
pub struct ActivityLog {
    path: PathBuf,
    // Serializes appends so two rows never interleave
    write: Mutex<()>,
}

impl ActivityLog {
    /// Opens the log, creating a header-only file if it is missing or empty.
    ///
    /// Existing rows are not parsed here. A damaged log shows up in
    /// [`recent`](Self::recent) and never keeps the till from starting.
    pub async fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();

        let empty = match fs::metadata(&path).await {
            Ok(meta) => meta.len() == 0,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
            Err(e) => return Err(e.into()),
        };
        if empty {
            info!(path = %path.display(), "Creating empty activity log");
            write_atomic(&path, &header_line()).await?;
        }

        Ok(ActivityLog {
            path,
            write: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one entry stamped with the current time.
    pub async fn record(
        &self,
        user: &str,
        kind: ActivityKind,
        description: impl Into<String>,
    ) -> StoreResult<ActivityEntry> {
        let user = user.trim();
        if user.is_empty() {
            return Err(ValidationError::required("user").into());
        }

        let entry = ActivityEntry {
            timestamp: Utc::now(),
            user: user.to_string(),
            activity_type: kind,
            description: description.into(),
        };
        let line = encode_row(&entry)?;

        let _guard = self.write.lock().await;
        let written: std::io::Result<()> = async {
            let mut file = OpenOptions::new().append(true).open(&self.path).await?;
            file.write_all(&line).await?;
            file.sync_data().await
        }
        .await;
        written.map_err(|e| StoreError::write_failed(&self.path, e))?;

        debug!(user = %entry.user, kind = kind.as_str(), "Activity recorded");
        Ok(entry)
    }

    /// The last `limit` entries, oldest first.
    pub async fn recent(&self, limit: usize) -> StoreResult<Vec<ActivityEntry>> {
        let bytes = fs::read(&self.path).await?;
        let mut entries = parse_entries(&bytes, &self.path)?;
        let skip = entries.len().saturating_sub(limit);
        Ok(entries.split_off(skip))
    }
}

fn header_line() -> Vec<u8> {
    let mut line = ACTIVITY_HEADER.join(",").into_bytes();
    line.push(b'\n');
    line
}

fn encode_row(entry: &ActivityEntry) -> StoreResult<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer
        .serialize(entry)
        .map_err(|e| ValidationError::invalid_format("activity", e.to_string()))?;
    writer
        .into_inner()
        .map_err(|e| StoreError::Io(e.into_error()))
}

fn parse_entries(bytes: &[u8], path: &Path) -> StoreResult<Vec<ActivityEntry>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| StoreError::corruption(STORE_NAME, path, e.to_string()))?;
    if !headers.is_empty() && headers.iter().ne(ACTIVITY_HEADER.iter().copied()) {
        return Err(StoreError::corruption(
            STORE_NAME,
            path,
            format!("unexpected header {:?}", headers),
        ));
    }

    reader
        .deserialize()
        .enumerate()
        .map(|(row, entry)| {
            entry.map_err(|e| {
                StoreError::corruption(STORE_NAME, path, format!("row {}: {}", row + 2, e))
            })
        })
        .collect()
}
