//! # Backups
//!
//! Point-in-time copies of both store files.
//!
//! ## Layout
//! ```text
//! data/backup/
//! ├── 20240301_153012_004/
//! │   ├── products.csv
//! │   └── transactions.csv
//! └── 20240302_071500_911_pre-restore/      ← taken automatically before a restore
//!     ├── products.csv
//!     └── transactions.csv
//! ```
//!
//! The directory name is the creation time (UTC, millisecond precision)
//! plus an optional label. Listing and pruning read the time back from it.
//!
//! Consistency between the two files comes from the engine: it holds its
//! maintenance lock exclusively while [`BackupManager::create`] runs.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::Serialize;
use tokio::fs;
use tracing::{info, warn};

use crate::error::{StoreError, StoreResult};
use crate::repository::{CatalogRepository, LedgerRepository};
use crate::{CATALOG_FILE, LEDGER_FILE};

/// Default retention for `prune`, matching the weekly market run.
pub const DEFAULT_RETENTION_DAYS: u32 = 7;

/// One backup directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupInfo {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub path: PathBuf,
}

impl BackupInfo {
    pub fn catalog_path(&self) -> PathBuf {
        self.path.join(CATALOG_FILE)
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.path.join(LEDGER_FILE)
    }

    /// Label after the timestamp, e.g. `pre-restore`.
    pub fn label(&self) -> Option<&str> {
        self.id.get(20..).filter(|l| !l.is_empty())
    }
}

/// Creates, lists and prunes backup directories.
#[derive(Debug, Clone)]
pub struct BackupManager {
    dir: PathBuf,
}

impl BackupManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        BackupManager { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Copies both stores into a new backup directory.
    ///
    /// Callers must make sure no mutation is in flight (the engine does).
    pub async fn create<C, L>(
        &self,
        catalog: &C,
        ledger: &L,
        label: Option<&str>,
    ) -> StoreResult<BackupInfo>
    where
        C: CatalogRepository + ?Sized,
        L: LedgerRepository + ?Sized,
    {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| StoreError::write_failed(&self.dir, e))?;

        let mut stamp = Utc::now();
        let (id, path) = loop {
            let id = backup_id(stamp, label);
            let path = self.dir.join(&id);
            match fs::create_dir(&path).await {
                Ok(()) => break (id, path),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    stamp += Duration::milliseconds(1);
                }
                Err(e) => return Err(StoreError::write_failed(&path, e)),
            }
        };

        let copied = async {
            catalog.snapshot_to(&path.join(CATALOG_FILE)).await?;
            ledger.snapshot_to(&path.join(LEDGER_FILE)).await
        }
        .await;

        if let Err(err) = copied {
            if let Err(cleanup) = fs::remove_dir_all(&path).await {
                warn!(path = %path.display(), error = %cleanup, "Could not remove partial backup");
            }
            return Err(err);
        }

        info!(backup = %id, path = %path.display(), "Backup created");
        Ok(BackupInfo {
            id,
            created_at: truncate_to_millis(stamp),
            path,
        })
    }

    /// Complete backups, newest first.
    pub async fn list(&self) -> StoreResult<Vec<BackupInfo>> {
        if !fs::try_exists(&self.dir).await? {
            return Ok(Vec::new());
        }

        let mut backups = Vec::new();
        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if let Some(info) = self.inspect(&name).await? {
                backups.push(info);
            }
        }

        backups.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(backups)
    }

    /// Looks up one backup by id.
    pub async fn find(&self, id: &str) -> StoreResult<BackupInfo> {
        if id.is_empty() || id.contains(['/', '\\']) || id.contains("..") {
            return Err(StoreError::not_found("Backup", id));
        }
        self.inspect(id)
            .await?
            .ok_or_else(|| StoreError::not_found("Backup", id))
    }

    /// Deletes backups older than `days` days before `now`.
    ///
    /// Returns what was removed.
    pub async fn prune(&self, days: u32, now: DateTime<Utc>) -> StoreResult<Vec<BackupInfo>> {
        let cutoff = now - Duration::days(i64::from(days));
        let mut removed = Vec::new();

        for backup in self.list().await? {
            if backup.created_at >= cutoff {
                continue;
            }
            fs::remove_dir_all(&backup.path)
                .await
                .map_err(|e| StoreError::write_failed(&backup.path, e))?;
            info!(backup = %backup.id, "Old backup removed");
            removed.push(backup);
        }

        Ok(removed)
    }

    /// A directory counts as a backup if its name parses and both files exist.
    async fn inspect(&self, name: &str) -> StoreResult<Option<BackupInfo>> {
        let Some(created_at) = parse_backup_time(name) else {
            return Ok(None);
        };
        let path = self.dir.join(name);
        let complete = fs::try_exists(path.join(CATALOG_FILE)).await?
            && fs::try_exists(path.join(LEDGER_FILE)).await?;
        if !complete {
            return Ok(None);
        }
        Ok(Some(BackupInfo {
            id: name.to_string(),
            created_at,
            path,
        }))
    }
}

// =============================================================================
// Backup Names
// =============================================================================

fn backup_id(stamp: DateTime<Utc>, label: Option<&str>) -> String {
    let base = stamp.format("%Y%m%d_%H%M%S").to_string();
    let millis = stamp.timestamp_subsec_millis();
    match label {
        Some(label) => format!("{base}_{millis:03}_{label}"),
        None => format!("{base}_{millis:03}"),
    }
}

/// `20240301_153012_004[_label]` → 2024-03-01T15:30:12.004Z
fn parse_backup_time(name: &str) -> Option<DateTime<Utc>> {
    let seconds = NaiveDateTime::parse_from_str(name.get(..15)?, "%Y%m%d_%H%M%S").ok()?;
    if name.get(15..16)? != "_" {
        return None;
    }
    let millis: i64 = name.get(16..19)?.parse().ok()?;
    match name.get(19..20) {
        None | Some("_") => {}
        Some(_) => return None,
    }
    Some(seconds.and_utc() + Duration::milliseconds(millis))
}

fn truncate_to_millis(stamp: DateTime<Utc>) -> DateTime<Utc> {
    let extra = stamp.timestamp_subsec_nanos() % 1_000_000;
    stamp - Duration::nanoseconds(i64::from(extra))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_backup_id_round_trips_time() {
        let stamp = Utc.with_ymd_and_hms(2024, 3, 1, 15, 30, 12).unwrap()
            + Duration::milliseconds(4);
        assert_eq!(backup_id(stamp, None), "20240301_153012_004");
        assert_eq!(parse_backup_time("20240301_153012_004"), Some(stamp));

        let labelled = backup_id(stamp, Some("pre-restore"));
        assert_eq!(labelled, "20240301_153012_004_pre-restore");
        assert_eq!(parse_backup_time(&labelled), Some(stamp));
    }

    #[test]
    fn test_foreign_directories_are_ignored() {
        assert_eq!(parse_backup_time("notes"), None);
        assert_eq!(parse_backup_time("20240301_153012"), None);
        assert_eq!(parse_backup_time("20240301_153012_004x"), None);
    }

    #[test]
    fn test_label() {
        let info = BackupInfo {
            id: "20240301_153012_004_pre-restore".to_string(),
            created_at: Utc::now(),
            path: PathBuf::from("x"),
        };
        assert_eq!(info.label(), Some("pre-restore"));

        let plain = BackupInfo {
            id: "20240301_153012_004".to_string(),
            ..info
        };
        assert_eq!(plain.label(), None);
    }
}
