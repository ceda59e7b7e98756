//! # Reporting Aggregator
//!
//! Pure summaries over ledger records and catalog snapshots.
//!
//! ## Data Flow
//! ```text
//! ┌──────────────────────┐     ┌──────────────────────┐
//! │ Ledger.query(range)  │     │ Catalog.list_all()   │
//! └──────────┬───────────┘     └──────────┬───────────┘
//!            │ &[TransactionRecord]       │ &[Product]
//!            ▼                            ▼
//! ┌─────────────────────────────────────────────────────┐
//! │  summarize · daily_totals · top_sellers             │
//! │  low_stock · inventory_value · stock_movement       │
//! └─────────────────────────────────────────────────────┘
//!            │
//!            ▼
//!     CLI tables / CSV export
//! ```
//!
//! Every function accepts empty input and returns zeros or an empty list.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::types::{Product, TransactionRecord};

// =============================================================================
// Period Summary
// =============================================================================

/// Totals over a set of SALE records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodSummary {
    pub transactions: u64,
    pub units_sold: i64,
    pub revenue: Money,
    pub profit: Money,
    pub average_transaction: Money,
}

/// Sums sales. Restock rows are ignored.
///
/// Totals saturate at the i64 bounds rather than wrap.
pub fn summarize<'a, I>(records: I) -> PeriodSummary
where
    I: IntoIterator<Item = &'a TransactionRecord>,
{
    let mut summary = PeriodSummary::default();

    for record in records.into_iter().filter(|r| r.is_sale()) {
        summary.transactions += 1;
        summary.units_sold = summary.units_sold.saturating_add(record.quantity);
        summary.revenue += record.revenue();
        summary.profit += record.profit;
    }

    summary.average_transaction = summary.revenue.average_over(summary.transactions);
    summary
}

// =============================================================================
// Daily Totals
// =============================================================================

/// Sales totals for one UTC day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyTotal {
    pub date: NaiveDate,
    pub transactions: u64,
    pub units_sold: i64,
    pub revenue: Money,
    pub profit: Money,
}

/// Groups sales by UTC calendar day, oldest day first.
///
/// Days without sales are omitted.
pub fn daily_totals(records: &[TransactionRecord]) -> Vec<DailyTotal> {
    let mut days: BTreeMap<NaiveDate, DailyTotal> = BTreeMap::new();

    for record in records.iter().filter(|r| r.is_sale()) {
        let date = record.timestamp.date_naive();
        let day = days.entry(date).or_insert_with(|| DailyTotal {
            date,
            transactions: 0,
            units_sold: 0,
            revenue: Money::zero(),
            profit: Money::zero(),
        });
        day.transactions += 1;
        day.units_sold = day.units_sold.saturating_add(record.quantity);
        day.revenue += record.revenue();
        day.profit += record.profit;
    }

    days.into_values().collect()
}

// =============================================================================
// Top Sellers
// =============================================================================

/// One row of the best-seller table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopSeller {
    pub identifier: String,
    pub name: String,
    pub units_sold: i64,
    pub revenue: Money,
    pub profit: Money,
}

/// Best sellers by units, ties broken by identifier.
///
/// Names come from the catalog; a product missing from the catalog is
/// listed under its identifier.
pub fn top_sellers(
    records: &[TransactionRecord],
    products: &[Product],
    limit: usize,
) -> Vec<TopSeller> {
    let names: HashMap<&str, &str> = products
        .iter()
        .map(|p| (p.identifier.as_str(), p.name.as_str()))
        .collect();

    let mut by_product: HashMap<&str, TopSeller> = HashMap::new();
    for record in records.iter().filter(|r| r.is_sale()) {
        let id = record.product_identifier.as_str();
        let entry = by_product.entry(id).or_insert_with(|| TopSeller {
            identifier: id.to_string(),
            name: names.get(id).copied().unwrap_or(id).to_string(),
            units_sold: 0,
            revenue: Money::zero(),
            profit: Money::zero(),
        });
        entry.units_sold = entry.units_sold.saturating_add(record.quantity);
        entry.revenue += record.revenue();
        entry.profit += record.profit;
    }

    let mut sellers: Vec<TopSeller> = by_product.into_values().collect();
    sellers.sort_by(|a, b| {
        b.units_sold
            .cmp(&a.units_sold)
            .then_with(|| a.identifier.cmp(&b.identifier))
    });
    sellers.truncate(limit);
    sellers
}

// =============================================================================
// Stock Views
// =============================================================================

/// Active products under `threshold`, emptiest shelf first.
pub fn low_stock(products: &[Product], threshold: i64) -> Vec<Product> {
    let mut low: Vec<Product> = products
        .iter()
        .filter(|p| p.active && p.is_low_stock(threshold))
        .cloned()
        .collect();
    low.sort_by(|a, b| {
        a.stock
            .cmp(&b.stock)
            .then_with(|| a.identifier.cmp(&b.identifier))
    });
    low
}

/// What the stock on the shelf is worth.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryValue {
    pub products: u64,
    pub units: i64,
    pub cost_value: Money,
    pub retail_value: Money,
}

/// Cost and retail value of active stock.
pub fn inventory_value(products: &[Product]) -> InventoryValue {
    products
        .iter()
        .filter(|p| p.active)
        .fold(InventoryValue::default(), |mut acc, p| {
            acc.products += 1;
            acc.units = acc.units.saturating_add(p.stock);
            acc.cost_value += p.cost_price.multiply_quantity(p.stock);
            acc.retail_value += p.sell_price.multiply_quantity(p.stock);
            acc
        })
}

/// Units moved for one product across the given records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockMovement {
    pub sold: i64,
    pub restocked: i64,
}

impl StockMovement {
    /// Stock the product should have now, given what it started with.
    ///
    /// ```text
    /// initial + restocked - sold == current stock
    /// ```
    pub fn expected_stock(&self, initial: i64) -> i64 {
        initial.saturating_add(self.restocked).saturating_sub(self.sold)
    }
}

/// Sold and restocked totals for `identifier`.
pub fn stock_movement<'a, I>(records: I, identifier: &str) -> StockMovement
where
    I: IntoIterator<Item = &'a TransactionRecord>,
{
    records
        .into_iter()
        .filter(|r| r.product_identifier == identifier)
        .fold(StockMovement::default(), |mut acc, r| {
            if r.is_sale() {
                acc.sold = acc.sold.saturating_add(r.quantity);
            } else {
                acc.restocked = acc.restocked.saturating_add(r.quantity);
            }
            acc
        })
}

// =============================================================================
// Unit Tests
// =============================================================================
