//! # Reporting Read Path
//!
//! Feeds the pure aggregators in `kantin_core::report` from the stores.
//!
//! ```text
//! Reporter ──► ledger.query(range) ──┐
//!          └─► catalog.list_all() ───┼──► kantin_core::report::* ──► SalesReport
//!                                    │
//!              read-only, never mutates either store
//! ```
//!
//! Reads run alongside sales. A report may see a sale's stock change
//! without its ledger row (or the reverse) if it lands mid-sale.

use std::sync::Arc;

use kantin_core::report::{
    self, DailyTotal, InventoryValue, PeriodSummary, StockMovement, TopSeller,
};
use kantin_core::{DateRange, Product, TransactionRecord};
use serde::Serialize;

use crate::error::StoreResult;
use crate::repository::{CatalogRepository, LedgerRepository};

/// Everything the `report` screen shows for one period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesReport {
    pub range: DateRange,
    pub summary: PeriodSummary,
    pub daily: Vec<DailyTotal>,
    pub top_sellers: Vec<TopSeller>,
}

/// Read-only view over both stores.
#[derive(Debug)]
pub struct Reporter<C, L> {
    catalog: Arc<C>,
    ledger: Arc<L>,
}

impl<C, L> Clone for Reporter<C, L> {
    fn clone(&self) -> Self {
        Reporter {
            catalog: Arc::clone(&self.catalog),
            ledger: Arc::clone(&self.ledger),
        }
    }
}

impl<C, L> Reporter<C, L>
where
    C: CatalogRepository,
    L: LedgerRepository,
{
    pub fn new(catalog: Arc<C>, ledger: Arc<L>) -> Self {
        Reporter { catalog, ledger }
    }

    /// Ledger records in `range`, oldest first.
    pub async fn transactions(&self, range: DateRange) -> StoreResult<Vec<TransactionRecord>> {
        self.ledger.query(range, None).await?.records()
    }

    /// Summary, per-day totals and the top `top` sellers for `range`.
    pub async fn sales_report(&self, range: DateRange, top: usize) -> StoreResult<SalesReport> {
        let records = self.transactions(range).await?;
        let products = self.catalog.list_all().await?;

        Ok(SalesReport {
            range,
            summary: report::summarize(&records),
            daily: report::daily_totals(&records),
            top_sellers: report::top_sellers(&records, &products, top),
        })
    }

    /// Per-day totals for `range`.
    pub async fn daily_totals(&self, range: DateRange) -> StoreResult<Vec<DailyTotal>> {
        Ok(report::daily_totals(&self.transactions(range).await?))
    }

    /// Active products under `threshold`.
    pub async fn low_stock(&self, threshold: i64) -> StoreResult<Vec<Product>> {
        Ok(report::low_stock(&self.catalog.list_all().await?, threshold))
    }

    /// Cost and retail value of active stock.
    pub async fn inventory_value(&self) -> StoreResult<InventoryValue> {
        Ok(report::inventory_value(&self.catalog.list_all().await?))
    }

    /// Everything ever sold and restocked for `identifier`.
    pub async fn stock_movement(&self, identifier: &str) -> StoreResult<StockMovement> {
        let query = self.ledger.query(DateRange::all(), Some(identifier)).await?;
        let records = query.records()?;
        Ok(report::stock_movement(&records, identifier))
    }
}
