//! # Domain Types
//!
//! Core domain types used throughout Kantin POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌──────────────────────┐   ┌─────────────────┐  │
//! │  │    Product      │   │  TransactionRecord   │   │    Receipt      │  │
//! │  │  ─────────────  │   │  ──────────────────  │   │  ─────────────  │  │
//! │  │  identifier (PK)│◄──│  product_identifier  │──►│  transaction_id │  │
//! │  │  name, category │   │  transaction_id      │   │  quantity       │  │
//! │  │  stock          │   │  quantity            │   │  unit_price     │  │
//! │  │  cost / sell    │   │  unit_cost/unit_price│   │  profit         │  │
//! │  │  active         │   │  profit, kind        │   └─────────────────┘  │
//! │  └─────────────────┘   └──────────────────────┘                         │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   EntryKind     │   │   DateRange     │   │  CatalogEvent   │       │
//! │  │  SALE           │   │  [start, end)   │   │  ProductSaved   │       │
//! │  │  RESTOCK        │   │  UTC            │   │  ProductRetired │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Single-Key Identity
//! A product has exactly one key, its `identifier`. It is the primary key of
//! the catalog file AND the payload printed into the product's barcode label,
//! so it never changes once created.
//!
//! ## Serialized Names
//! Field names serialize in camelCase. The CSV headers of `products.csv` and
//! `transactions.csv` come straight from these structs.

use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::timestamp::context::NoContext;
use uuid::{Timestamp, Uuid};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;

// =============================================================================
// Product
// =============================================================================

/// A product on the canteen shelf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Unique, case-sensitive key. Also the barcode payload.
    pub identifier: String,

    /// Display name shown to the cashier and on receipts.
    pub name: String,

    /// Free-text category (Makanan, Minuman, Snack, ...).
    pub category: String,

    /// Units on hand. Never negative; changed only by sales and restocks.
    pub stock: i64,

    /// Purchase price per unit.
    pub cost_price: Money,

    /// Selling price per unit.
    pub sell_price: Money,

    /// Whether the product is active (logical delete).
    pub active: bool,
}

impl Product {
    /// Creates an active product.
    pub fn new(
        identifier: impl Into<String>,
        name: impl Into<String>,
        category: impl Into<String>,
        stock: i64,
        cost_price: Money,
        sell_price: Money,
    ) -> Self {
        Product {
            identifier: identifier.into(),
            name: name.into(),
            category: category.into(),
            stock,
            cost_price,
            sell_price,
            active: true,
        }
    }

    /// Profit made on one unit at current prices (may be negative).
    #[inline]
    pub fn unit_margin(&self) -> Money {
        self.sell_price - self.cost_price
    }

    /// True when the selling price is below cost. Allowed, but worth a warning.
    #[inline]
    pub fn sells_below_cost(&self) -> bool {
        self.sell_price < self.cost_price
    }

    /// True when stock has dropped under the alert threshold.
    #[inline]
    pub fn is_low_stock(&self, threshold: i64) -> bool {
        self.stock < threshold
    }

    /// Checks that `quantity` units of this product may be sold right now.
    ///
    /// ## Checks (in order)
    /// ```text
    /// quantity <= 0 ─────────► InvalidQuantity
    /// retired product ───────► ProductNotFound
    /// stock < quantity ──────► InsufficientStock { available, requested }
    /// otherwise ─────────────► Ok
    /// ```
    ///
    /// No partial sale is ever allowed: either all units are available or
    /// the call fails.
    pub fn check_sale(&self, quantity: i64) -> CoreResult<()> {
        if quantity <= 0 {
            return Err(CoreError::InvalidQuantity {
                requested: quantity,
            });
        }

        if !self.active {
            return Err(CoreError::ProductNotFound(self.identifier.clone()));
        }

        if self.stock < quantity {
            return Err(CoreError::InsufficientStock {
                identifier: self.identifier.clone(),
                available: self.stock,
                requested: quantity,
            });
        }

        Ok(())
    }
}

// =============================================================================
// Product Edit
// =============================================================================

/// A partial update to a product's descriptive fields and prices.
///
/// Stock is deliberately absent: it only moves through sales and restocks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductEdit {
    pub name: Option<String>,
    pub category: Option<String>,
    pub cost_price: Option<Money>,
    pub sell_price: Option<Money>,
}

impl ProductEdit {
    /// True if the edit would change nothing.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.category.is_none()
            && self.cost_price.is_none()
            && self.sell_price.is_none()
    }

    /// Returns a copy of `product` with this edit applied.
    pub fn apply_to(&self, product: &Product) -> Product {
        let mut updated = product.clone();
        if let Some(name) = &self.name {
            updated.name = name.trim().to_string();
        }
        if let Some(category) = &self.category {
            updated.category = category.trim().to_string();
        }
        if let Some(cost) = self.cost_price {
            updated.cost_price = cost;
        }
        if let Some(price) = self.sell_price {
            updated.sell_price = price;
        }
        updated
    }
}

// =============================================================================
// Ledger Entry Kind
// =============================================================================

/// What a ledger row records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryKind {
    /// Units left the shelf for money.
    Sale,
    /// Units arrived on the shelf (audit only, profit is zero).
    Restock,
}

impl EntryKind {
    /// Name as written to the ledger file.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Sale => "SALE",
            EntryKind::Restock => "RESTOCK",
        }
    }
}

// =============================================================================
// Transaction Record
// =============================================================================

/// One immutable row of the ledger.
///
/// ## Snapshot Pattern
/// `unit_cost` and `unit_price` are COPIED from the product at the moment of
/// the sale. Editing the product's prices later never changes this record,
/// so historical profit stays what it was.
///
/// ```text
/// Product BRK001: cost 1000, sell 1500
///      │ sale(qty 3)
///      ▼
/// Record: unit_cost 1000, unit_price 1500, profit 3 × 500 = 1500
///      │
/// Product edited: sell 2000   ──► Record unchanged
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    /// UUID v7 string (timestamp-ordered).
    pub transaction_id: String,

    /// When the record was written (UTC).
    pub timestamp: DateTime<Utc>,

    /// The product this record moved.
    pub product_identifier: String,

    /// Units moved. Always positive.
    pub quantity: i64,

    /// Product cost price at the time of the record.
    pub unit_cost: Money,

    /// Product sell price at the time of the record.
    pub unit_price: Money,

    /// `quantity * (unit_price - unit_cost)` for sales, zero for restocks.
    pub profit: Money,

    /// Sale or restock.
    pub kind: EntryKind,
}

impl TransactionRecord {
    /// Builds a SALE record from the product's current prices.
    ///
    /// Fails if the revenue or profit of `quantity` units does not fit in
    /// an amount. Validated products and quantities always fit.
    pub fn sale(product: &Product, quantity: i64, at: DateTime<Utc>) -> CoreResult<Self> {
        let too_large = || {
            CoreError::Validation(ValidationError::invalid_format(
                "quantity",
                format!("{quantity} units of {} exceed the largest amount", product.identifier),
            ))
        };

        if product.sell_price.checked_multiply_quantity(quantity).is_none() {
            return Err(too_large());
        }
        let profit = product
            .sell_price
            .checked_sub(product.cost_price)
            .and_then(|margin| margin.checked_multiply_quantity(quantity))
            .ok_or_else(too_large)?;

        Ok(Self::build(product, quantity, profit, EntryKind::Sale, at))
    }

    /// Builds a RESTOCK record. Prices are snapshotted for audit; profit is zero.
    pub fn restock(product: &Product, quantity: i64, at: DateTime<Utc>) -> Self {
        Self::build(product, quantity, Money::zero(), EntryKind::Restock, at)
    }

    fn build(
        product: &Product,
        quantity: i64,
        profit: Money,
        kind: EntryKind,
        at: DateTime<Utc>,
    ) -> Self {
        TransactionRecord {
            transaction_id: transaction_id_at(at),
            timestamp: at,
            product_identifier: product.identifier.clone(),
            quantity,
            unit_cost: product.cost_price,
            unit_price: product.sell_price,
            profit,
            kind,
        }
    }

    /// True for SALE rows.
    #[inline]
    pub fn is_sale(&self) -> bool {
        self.kind == EntryKind::Sale
    }

    /// Money taken at the till for this row (zero for restocks).
    pub fn revenue(&self) -> Money {
        match self.kind {
            EntryKind::Sale => self.unit_price.multiply_quantity(self.quantity),
            EntryKind::Restock => Money::zero(),
        }
    }

    /// The profit this row should carry given its quantity and prices.
    ///
    /// `None` if the product of quantity and prices overflows.
    pub fn expected_profit(&self) -> Option<Money> {
        match self.kind {
            EntryKind::Sale => self
                .unit_price
                .checked_sub(self.unit_cost)
                .and_then(|margin| margin.checked_multiply_quantity(self.quantity)),
            EntryKind::Restock => Some(Money::zero()),
        }
    }

    /// Signed stock effect of this row (negative for sales).
    pub fn stock_delta(&self) -> i64 {
        match self.kind {
            EntryKind::Sale => -self.quantity,
            EntryKind::Restock => self.quantity,
        }
    }
}

/// Derives a UUID v7 from the record time.
fn transaction_id_at(at: DateTime<Utc>) -> String {
    let secs = at.timestamp().max(0) as u64;
    let nanos = at.timestamp_subsec_nanos();
    Uuid::new_v7(Timestamp::from_unix(NoContext, secs, nanos)).to_string()
}

// =============================================================================
// Engine Results
// =============================================================================

/// What the cashier gets back from a successful sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub transaction_id: String,
    pub timestamp: DateTime<Utc>,
    pub product_identifier: String,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub total: Money,
    pub profit: Money,
    /// Stock left after the sale.
    pub remaining_stock: i64,
}

impl Receipt {
    /// Builds the receipt for a committed sale record.
    pub fn from_record(record: &TransactionRecord, product_name: &str, remaining_stock: i64) -> Self {
        Receipt {
            transaction_id: record.transaction_id.clone(),
            timestamp: record.timestamp,
            product_identifier: record.product_identifier.clone(),
            product_name: product_name.to_string(),
            quantity: record.quantity,
            unit_price: record.unit_price,
            total: record.revenue(),
            profit: record.profit,
            remaining_stock,
        }
    }
}

/// Acknowledgement of a committed restock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestockAck {
    pub transaction_id: String,
    pub identifier: String,
    pub added: i64,
    pub new_stock: i64,
}

// =============================================================================
// Catalog Events
// =============================================================================

/// Notifications emitted after a catalog change is durable.
///
/// The label printer listens for `ProductSaved` and renders a barcode for
/// the identifier. Nothing in the engine depends on anyone listening.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum CatalogEvent {
    ProductSaved { identifier: String, name: String },
    ProductRetired { identifier: String },
}

// =============================================================================
// Date Range
// =============================================================================

/// Half-open UTC time window `[start, end)` used by ledger queries.
///
/// `None` on either side means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl DateRange {
    /// Every record ever written.
    pub const fn all() -> Self {
        DateRange {
            start: None,
            end: None,
        }
    }

    /// Explicit bounds.
    pub const fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        DateRange {
            start: Some(start),
            end: Some(end),
        }
    }

    /// Whole UTC days from `first` through `last`, both inclusive.
    ///
    /// If `first` is after `last` the range is empty.
    pub fn days(first: NaiveDate, last: NaiveDate) -> Self {
        let start = first.and_time(NaiveTime::MIN).and_utc();
        let end = last
            .checked_add_days(Days::new(1))
            .map(|d| d.and_time(NaiveTime::MIN).and_utc());
        DateRange {
            start: Some(start),
            end,
        }
    }

    /// The `count` days ending with `today` (inclusive).
    pub fn last_days(today: NaiveDate, count: u64) -> Self {
        let first = today
            .checked_sub_days(Days::new(count.saturating_sub(1)))
            .unwrap_or(NaiveDate::MIN);
        DateRange::days(first, today)
    }

    /// True if `ts` falls inside the window.
    pub fn contains(&self, ts: &DateTime<Utc>) -> bool {
        if let Some(start) = &self.start {
            if ts < start {
                return false;
            }
        }
        if let Some(end) = &self.end {
            if ts >= end {
                return false;
            }
        }
        true
    }

    /// True if `ts` is at or past the end bound (no later record can match).
    pub fn is_past_end(&self, ts: &DateTime<Utc>) -> bool {
        matches!(&self.end, Some(end) if ts >= end)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
