//! # Commands Module
//!
//! One handler per CLI subcommand.
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs      ◄─── You are here (Context, dispatch)
//! ├── product.rs  ◄─── add, edit, retire, show, list, search
//! ├── sale.rs     ◄─── scan, sell, restock
//! ├── report.rs   ◄─── report, low-stock, export, info
//! ├── backup.rs   ◄─── backup create/list/restore/prune
//! ├── labels.rs   ◄─── labels generate/regenerate
//! └── activity.rs ◄─── activity
//! ```
//!
//! ## How Commands Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Command Flow                                         │
//! │                                                                         │
//! │  kantin sell BRK001 3                                                  │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  Cli::parse() ──► Session::login ──► Storage::open                     │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  commands::execute(&ctx, command)                                       │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  sale::sell(&ctx, "BRK001", 3) ──► engine.record_sale(...)              │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  Ok(String)  text or JSON, printed by the caller on stdout             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Handlers return the rendered output instead of printing it so they can
//! be tested end to end without capturing stdout.

pub mod activity;
pub mod backup;
pub mod labels;
pub mod product;
pub mod report;
pub mod sale;

use chrono::{NaiveDate, Utc};
use kantin_core::Money;
use kantin_store::{ActivityKind, Storage};
use serde::Serialize;
use tracing::warn;

use crate::cli::Command;
use crate::labels::LabelPrinter;
use crate::error::{CliError, CliResult, ErrorCode};
use crate::state::{AppConfig, Session};

/// Everything a handler may use.
pub struct Context<'a> {
    pub storage: &'a Storage,
    pub config: &'a AppConfig,
    pub session: &'a Session,
    pub json: bool,
}

impl Context<'_> {
    /// Formats an amount with the configured currency.
    pub fn money(&self, amount: Money) -> String {
        self.config.currency.format(amount)
    }

    /// Today's date (UTC), the end of default report ranges.
    pub fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }

    /// Label writer for the configured label directory.
    pub fn labels(&self) -> LabelPrinter {
        LabelPrinter::new(self.config.label_dir())
    }

    /// Appends to the activity log under the session's operator.
    ///
    /// The action has already happened, so a log write failure is only
    /// reported on stderr.
    pub async fn record_activity(&self, kind: ActivityKind, description: impl Into<String>) {
        let user = self.session.username();
        if let Err(e) = self.storage.activity().record(user, kind, description).await {
            warn!(user, kind = kind.as_str(), error = %e, "Activity not recorded");
        }
    }

    /// JSON when `--json` was given, otherwise the text rendering.
    pub fn render<T, F>(&self, value: &T, text: F) -> CliResult<String>
    where
        T: Serialize + ?Sized,
        F: FnOnce(&T) -> String,
    {
        if self.json {
            serde_json::to_string_pretty(value)
                .map_err(|e| CliError::new(ErrorCode::Internal, e.to_string()))
        } else {
            Ok(text(value))
        }
    }
}

/// Runs one parsed command.
pub async fn execute(ctx: &Context<'_>, command: Command) -> CliResult<String> {
    match command {
        Command::Product(cmd) => product::run(ctx, cmd).await,
        Command::Scan { token } => sale::scan(ctx, &token).await,
        Command::Sell { token, quantity } => sale::sell(ctx, &token, quantity).await,
        Command::Restock {
            identifier,
            quantity,
        } => sale::restock(ctx, &identifier, quantity).await,
        Command::Report { range, top } => report::sales(ctx, &range, top).await,
        Command::LowStock { threshold } => report::low_stock(ctx, threshold).await,
        Command::Export {
            what,
            format,
            range,
        } => report::export(ctx, what, format.into(), &range).await,
        Command::Info => report::info(ctx).await,
        Command::Backup(cmd) => backup::run(ctx, cmd).await,
        Command::Labels(cmd) => labels::run(ctx, cmd).await,
        Command::Activity { limit } => activity::recent(ctx, limit).await,
    }
}
