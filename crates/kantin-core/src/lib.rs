//! # kantin-core: Pure Business Logic for Kantin POS
//!
//! This crate is the **heart** of Kantin POS. It holds the domain types and
//! every rule that can be evaluated without touching a file.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Kantin POS Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    kantin CLI (Presentation)                    │   │
//! │  │    scan ──► sell ──► restock ──► report ──► backup              │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ kantin-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌─────────┐ ┌────────────┐ ┌──────┐ ┌────────┐  │   │
//! │  │   │  types   │ │  money  │ │ validation │ │ code │ │ report │  │   │
//! │  │   │ Product  │ │  Money  │ │   rules    │ │Resolv│ │ totals │  │   │
//! │  │   │ Record   │ │ Format  │ │   checks   │ │ -er  │ │ top-N  │  │   │
//! │  │   └──────────┘ └─────────┘ └────────────┘ └──────┘ └────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO FILES • NO NETWORK • PURE FUNCTIONS              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             kantin-store (Catalog + Ledger + Engine)            │   │
//! │  │              products.csv, transactions.csv                      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, TransactionRecord, Receipt, DateRange)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//! - [`code`] - Code Resolver contract (scanned/typed token → identifier)
//! - [`report`] - Reporting Aggregator math over ledger/catalog snapshots
//!
//! ## Example Usage
//!
//! ```rust
//! use kantin_core::money::Money;
//! use kantin_core::types::{Product, TransactionRecord};
//! use chrono::Utc;
//!
//! let product = Product::new("BRK001", "Roti Bakar", "Makanan", 10,
//!     Money::from_minor(1000), Money::from_minor(1500));
//!
//! let record = TransactionRecord::sale(&product, 3, Utc::now()).unwrap();
//! assert_eq!(record.profit, Money::from_minor(1500));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod code;
pub mod error;
pub mod money;
pub mod report;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use code::{CodeResolver, ManualEntryResolver, Resolution};
pub use error::{CoreError, ValidationError};
pub use money::{CurrencyFormat, Money};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Stock level below which a product is flagged as running low.
///
/// ## Business Reason
/// The canteen restocks from the market once or twice a week; ten units
/// is roughly one busy break. Overridable through the CLI config.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 10;

/// Minimum identifier length accepted from the catalog form or a scanner.
pub const MIN_IDENTIFIER_LEN: usize = 3;

/// Maximum identifier length (fits comfortably in a Code128 label).
pub const MAX_IDENTIFIER_LEN: usize = 50;

/// Largest quantity accepted in one sale or restock.
///
/// ## Business Reason
/// Catches a mistyped quantity (a barcode scanned into the quantity field)
/// and keeps `quantity * price` far from the i64 limit.
pub const MAX_QUANTITY: i64 = 100_000;

/// Largest stock level a product may hold.
pub const MAX_STOCK: i64 = 10_000_000;

/// Largest cost or sell price, in minor units.
///
/// ## Business Reason
/// `MAX_PRICE_MINOR * MAX_STOCK` still fits in an i64, so stock valuation
/// of a single product is always exact.
pub const MAX_PRICE_MINOR: i64 = 100_000_000_000;
