//! # Validation Module
//!
//! Input validation utilities for Kantin POS.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: CLI argument parsing (clap)                                  │
//! │  ├── Types (integers, dates)                                           │
//! │  └── Immediate usage errors                                            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Engine (kantin-store)                                        │
//! │  └── THIS MODULE: Business rule validation                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Stores (kantin-store)                                        │
//! │  ├── Catalog: empty identifier / negative stock rejected               │
//! │  └── Ledger: non-positive quantity rejected, rows re-checked on load   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use kantin_core::validation::{validate_identifier, validate_quantity};
//!
//! validate_identifier("BRK001").unwrap();
//! validate_quantity(5).unwrap();
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{Product, TransactionRecord};
use crate::{
    MAX_IDENTIFIER_LEN, MAX_PRICE_MINOR, MAX_QUANTITY, MAX_STOCK, MIN_IDENTIFIER_LEN,
};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest accepted product name.
pub const MAX_NAME_LEN: usize = 200;

/// Longest accepted category.
pub const MAX_CATEGORY_LEN: usize = 50;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a product identifier (the barcode payload).
///
/// ## Rules
/// - Must not be empty
/// - Between 3 and 50 characters
/// - Only letters, digits, hyphens and underscores (no spaces; a Code128
///   scanner would split on them)
///
/// Identifiers are case-sensitive and are NOT trimmed: `" BRK001"` is rejected,
/// not silently rewritten.
///
/// ## Example
/// ```rust
/// use kantin_core::validation::validate_identifier;
///
/// assert!(validate_identifier("BRK001").is_ok());
/// assert!(validate_identifier("AB").is_err());
/// assert!(validate_identifier("BRK 001").is_err());
/// ```
pub fn validate_identifier(identifier: &str) -> ValidationResult<()> {
    if identifier.trim().is_empty() {
        return Err(ValidationError::required("identifier"));
    }

    let len = identifier.chars().count();
    if len < MIN_IDENTIFIER_LEN {
        return Err(ValidationError::TooShort {
            field: "identifier".to_string(),
            min: MIN_IDENTIFIER_LEN,
        });
    }

    if len > MAX_IDENTIFIER_LEN {
        return Err(ValidationError::TooLong {
            field: "identifier".to_string(),
            max: MAX_IDENTIFIER_LEN,
        });
    }

    if !identifier
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::invalid_format(
            "identifier",
            "must contain only letters, numbers, hyphens, and underscores",
        ));
    }

    Ok(())
}

/// Validates a product name.
///
/// ## Rules
/// - Must not be empty
/// - At most 200 characters
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    validate_text("name", name, MAX_NAME_LEN)
}

/// Validates a product category.
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
pub fn validate_category(category: &str) -> ValidationResult<()> {
    validate_text("category", category, MAX_CATEGORY_LEN)
}

fn validate_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::required(field));
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates a search query.
///
/// ## Returns
/// The trimmed, lowercased query ready for substring matching.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.chars().count() > 100 {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: 100,
        });
    }

    Ok(query.to_lowercase())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a sale or restock quantity.
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  kantin sell BRK001 3                                                   │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  validate_quantity(3) ← THIS FUNCTION                                  │
/// │       │                                                                 │
/// │       ├── qty <= 0? → Error: "quantity must be positive"               │
/// │       │                                                                 │
/// │       ├── qty > 100000? → Error: "quantity must be between 1 and ..."  │
/// │       │                                                                 │
/// │       └── OK → Engine looks up the product                             │
/// │                                                                         │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_QUANTITY {
        return Err(ValidationError::out_of_range("quantity", 1, MAX_QUANTITY));
    }

    Ok(())
}

/// Validates a stock level (zero allowed, at most [`MAX_STOCK`]).
pub fn validate_stock(stock: i64) -> ValidationResult<()> {
    if stock < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "stock".to_string(),
        });
    }

    if stock > MAX_STOCK {
        return Err(ValidationError::out_of_range("stock", 0, MAX_STOCK));
    }

    Ok(())
}

/// Validates a price (zero allowed for giveaways).
///
/// ## Example
/// ```rust
/// use kantin_core::money::Money;
/// use kantin_core::validation::validate_price;
///
/// assert!(validate_price("sellPrice", Money::from_minor(1500)).is_ok());
/// assert!(validate_price("sellPrice", Money::zero()).is_ok());
/// assert!(validate_price("sellPrice", Money::from_minor(-1)).is_err());
/// ```
pub fn validate_price(field: &str, price: Money) -> ValidationResult<()> {
    if price.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }

    if price.minor() > MAX_PRICE_MINOR {
        return Err(ValidationError::out_of_range(field, 0, MAX_PRICE_MINOR));
    }

    Ok(())
}

// =============================================================================
// Entity Validators
// =============================================================================

/// Validates every field of a product before it is saved.
pub fn validate_product(product: &Product) -> ValidationResult<()> {
    validate_identifier(&product.identifier)?;
    validate_product_name(&product.name)?;
    validate_category(&product.category)?;
    validate_stock(product.stock)?;
    validate_price("costPrice", product.cost_price)?;
    validate_price("sellPrice", product.sell_price)?;
    Ok(())
}

/// Validates a ledger row, both before append and when reading the file back.
///
/// ## Rules
/// - Transaction id and product identifier present
/// - Quantity positive and within [`MAX_QUANTITY`]
/// - Prices not negative and within [`MAX_PRICE_MINOR`]
/// - Stored profit equals the profit implied by quantity and prices
pub fn validate_record(record: &TransactionRecord) -> ValidationResult<()> {
    if record.transaction_id.trim().is_empty() {
        return Err(ValidationError::required("transactionId"));
    }

    if record.product_identifier.trim().is_empty() {
        return Err(ValidationError::required("productIdentifier"));
    }

    validate_quantity(record.quantity)?;
    validate_price("unitCost", record.unit_cost)?;
    validate_price("unitPrice", record.unit_price)?;

    let expected = record.expected_profit().ok_or_else(|| ValidationError::Inconsistent {
        field: "profit".to_string(),
        reason: "quantity times price does not fit".to_string(),
    })?;
    if record.profit != expected {
        return Err(ValidationError::Inconsistent {
            field: "profit".to_string(),
            reason: format!("stored {} but quantity and prices give {}", record.profit, expected),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
