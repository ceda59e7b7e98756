//! # Report Commands
//!
//! Read-only summaries and spreadsheet exports.
//!
//! ```text
//! kantin report                       last 7 days
//! kantin report --from 2024-03-01     1 March through today
//! kantin low-stock
//! kantin info                         stock value, record counts
//! kantin export transactions --from 2024-03-01 --to 2024-03-31
//! kantin export products --format xlsx
//! ```

use std::fmt::Write as _;

use chrono::Utc;
use kantin_core::report::InventoryValue;
use kantin_core::DateRange;
use kantin_store::{ActivityKind, ExportFormat, SalesReport};
use serde::Serialize;

use super::Context;
use crate::cli::{ExportKind, RangeArgs, DEFAULT_REPORT_DAYS};
use crate::error::CliResult;

pub async fn sales(ctx: &Context<'_>, range: &RangeArgs, top: usize) -> CliResult<String> {
    let range = range.resolve(ctx.today(), Some(DEFAULT_REPORT_DAYS))?;
    let report = ctx.storage.reporter().sales_report(range, top).await?;
    ctx.render(&report, |r| report_text(ctx, r))
}

pub async fn low_stock(ctx: &Context<'_>, threshold: Option<i64>) -> CliResult<String> {
    let threshold = threshold.unwrap_or(ctx.config.shop.low_stock_threshold);
    let products = ctx.storage.reporter().low_stock(threshold).await?;
    ctx.render(&products, |ps| {
        if ps.is_empty() {
            return format!("No products below {} units", threshold);
        }
        let mut out = format!("Below {} units:\n", threshold);
        for p in ps {
            let _ = writeln!(out, "  {:<12} {:<28} {:>6}", p.identifier, p.name, p.stock);
        }
        out.trim_end().to_string()
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportResult {
    path: String,
    rows: usize,
}

/// Writes one export file and reports where it went.
///
/// Transactions and daily totals default to everything when no dates are
/// given; products ignore the range.
pub async fn export(
    ctx: &Context<'_>,
    what: ExportKind,
    format: ExportFormat,
    range: &RangeArgs,
) -> CliResult<String> {
    let reporter = ctx.storage.reporter();
    let exporter = ctx.storage.exporter();
    let now = Utc::now();

    let (path, rows) = match what {
        ExportKind::Transactions => {
            let records = reporter
                .transactions(range.resolve(ctx.today(), None)?)
                .await?;
            (exporter.transactions(&records, format, now).await?, records.len())
        }
        ExportKind::Products => {
            let products = ctx.storage.engine().list_products(false).await?;
            (exporter.products(&products, format, now).await?, products.len())
        }
        ExportKind::Daily => {
            let days = reporter
                .daily_totals(range.resolve(ctx.today(), None)?)
                .await?;
            (exporter.daily_totals(&days, format, now).await?, days.len())
        }
    };

    let result = ExportResult {
        path: path.display().to_string(),
        rows,
    };
    ctx.record_activity(
        ActivityKind::Export,
        format!("{} row(s) to {}", result.rows, result.path),
    )
    .await;
    ctx.render(&result, |r| format!("Wrote {} row(s) to {}", r.rows, r.path))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ShopInfo {
    shop: String,
    data_dir: String,
    inventory: InventoryValue,
    ledger_records: usize,
    backups: usize,
}

/// What the stock is worth and how much history the stores hold.
pub async fn info(ctx: &Context<'_>) -> CliResult<String> {
    let inventory = ctx.storage.reporter().inventory_value().await?;
    let ledger_records = ctx.storage.engine().ledger().len().await;
    let backups = ctx.storage.backups().list().await?.len();

    let info = ShopInfo {
        shop: ctx.config.shop.name.clone(),
        data_dir: ctx.storage.data_dir().display().to_string(),
        inventory,
        ledger_records,
        backups,
    };
    ctx.render(&info, |i| info_text(ctx, i))
}

fn info_text(ctx: &Context<'_>, i: &ShopInfo) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} ({})", i.shop, i.data_dir);
    let _ = writeln!(out);
    let _ = writeln!(out, "Active products:  {:>14}", i.inventory.products);
    let _ = writeln!(out, "Units on shelf:   {:>14}", i.inventory.units);
    let _ = writeln!(out, "Stock at cost:    {:>14}", ctx.money(i.inventory.cost_value));
    let _ = writeln!(out, "Stock at price:   {:>14}", ctx.money(i.inventory.retail_value));
    let _ = writeln!(out, "Ledger records:   {:>14}", i.ledger_records);
    let _ = write!(out, "Backups:          {:>14}", i.backups);
    out
}

fn report_text(ctx: &Context<'_>, r: &SalesReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} sales report", ctx.config.shop.name);
    let _ = writeln!(out, "Period: {}", range_label(&r.range));
    let _ = writeln!(out);
    let _ = writeln!(out, "Transactions:     {:>14}", r.summary.transactions);
    let _ = writeln!(out, "Units sold:       {:>14}", r.summary.units_sold);
    let _ = writeln!(out, "Revenue:          {:>14}", ctx.money(r.summary.revenue));
    let _ = writeln!(out, "Profit:           {:>14}", ctx.money(r.summary.profit));
    let _ = writeln!(
        out,
        "Avg transaction:  {:>14}",
        ctx.money(r.summary.average_transaction)
    );

    if !r.daily.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "{:<12} {:>6} {:>14} {:>14}", "DATE", "TX", "REVENUE", "PROFIT");
        for day in &r.daily {
            let _ = writeln!(
                out,
                "{:<12} {:>6} {:>14} {:>14}",
                day.date,
                day.transactions,
                ctx.money(day.revenue),
                ctx.money(day.profit)
            );
        }
    }

    if !r.top_sellers.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Top sellers:");
        for (rank, seller) in r.top_sellers.iter().enumerate() {
            let _ = writeln!(
                out,
                "{:>2}. {:<28} {:>6} sold {:>14}",
                rank + 1,
                seller.name,
                seller.units_sold,
                ctx.money(seller.revenue)
            );
        }
    }

    out.trim_end().to_string()
}

fn range_label(range: &DateRange) -> String {
    let day = |ts: &chrono::DateTime<Utc>| ts.format("%Y-%m-%d").to_string();
    // The end bound is exclusive midnight; show the last included day
    let last = |ts: &chrono::DateTime<Utc>| day(&(*ts - chrono::Duration::seconds(1)));
    match (&range.start, &range.end) {
        (Some(start), Some(end)) => format!("{} to {}", day(start), last(end)),
        (Some(start), None) => format!("from {}", day(start)),
        (None, Some(end)) => format!("through {}", last(end)),
        (None, None) => "all time".to_string(),
    }
}
