//! # Backup Commands
//!
//! ```text
//! kantin backup create            data/backup/20240301_153012_042/
//! kantin backup list              newest first
//! kantin backup restore <id>      current state saved as *_pre-restore first
//! kantin backup prune --days 7
//! ```

use std::fmt::Write as _;

use chrono::Utc;
use kantin_store::{ActivityKind, BackupInfo};
use tracing::info;

use super::Context;
use crate::cli::BackupCommand;
use crate::error::CliResult;

pub async fn run(ctx: &Context<'_>, command: BackupCommand) -> CliResult<String> {
    let engine = ctx.storage.engine();
    let backups = ctx.storage.backups();

    match command {
        BackupCommand::Create => {
            let backup = engine.create_backup(backups).await?;
            ctx.record_activity(ActivityKind::BackupCreated, backup.id.clone()).await;
            ctx.render(&backup, |b| format!("Backup {} written to {}", b.id, b.path.display()))
        }

        BackupCommand::List => {
            let all = backups.list().await?;
            ctx.render(&all, |list| backup_table(list))
        }

        BackupCommand::Restore { id } => {
            info!(backup = %id, operator = ctx.session.username(), "Restore requested");
            let backup = engine.restore_backup(backups, &id).await?;
            ctx.record_activity(ActivityKind::BackupRestored, backup.id.clone()).await;
            ctx.render(&backup, |b| {
                format!("Restored backup {} (taken {})", b.id, b.created_at.format("%Y-%m-%d %H:%M:%S UTC"))
            })
        }

        BackupCommand::Prune { days } => {
            let removed = backups.prune(days, Utc::now()).await?;
            if !removed.is_empty() {
                ctx.record_activity(
                    ActivityKind::BackupPruned,
                    format!("{} backup(s) older than {} day(s)", removed.len(), days),
                )
                .await;
            }
            ctx.render(&removed, |list| {
                format!("Removed {} backup(s) older than {} day(s)", list.len(), days)
            })
        }
    }
}

fn backup_table(backups: &[BackupInfo]) -> String {
    if backups.is_empty() {
        return "No backups".to_string();
    }
    let mut out = String::new();
    for b in backups {
        let _ = writeln!(
            out,
            "{:<40} {}",
            b.id,
            b.created_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }
    out.trim_end().to_string()
}
