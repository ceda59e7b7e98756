//! # Activity Command
//!
//! ```text
//! kantin activity              last 10 entries, oldest first
//! kantin activity --limit 50
//! ```

use std::fmt::Write as _;

use kantin_store::ActivityEntry;

use super::Context;
use crate::error::CliResult;

pub async fn recent(ctx: &Context<'_>, limit: usize) -> CliResult<String> {
    let entries = ctx.storage.activity().recent(limit).await?;
    ctx.render(&entries, |list| activity_table(list))
}

fn activity_table(entries: &[ActivityEntry]) -> String {
    if entries.is_empty() {
        return "No activity recorded".to_string();
    }
    let mut out = String::new();
    for e in entries {
        let _ = writeln!(
            out,
            "{}  {:<10} {:<17} {}",
            e.timestamp.format("%Y-%m-%d %H:%M:%S"),
            e.user,
            e.activity_type.as_str(),
            e.description
        );
    }
    out.trim_end().to_string()
}
