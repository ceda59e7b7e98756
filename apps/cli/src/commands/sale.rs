//! # Sale Commands
//!
//! The counter workflow: scan, sell, restock.
//!
//! ## Sale Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Sale Flow                                            │
//! │                                                                         │
//! │  Scanner types "BRK001\r"                                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ManualEntryResolver ──► NotRecognized? ──► "not a product code"       │
//! │       │                                                                 │
//! │       ▼ Identifier("BRK001")                                           │
//! │  engine.record_sale("BRK001", 3)                                       │
//! │       │                                                                 │
//! │       ├── InsufficientStock ──► exit 4, nothing written                │
//! │       ├── ProductNotFound   ──► exit 3, nothing written                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Receipt printed                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt::Write as _;

use kantin_core::{CodeResolver, ManualEntryResolver, Receipt, Resolution};
use kantin_store::ActivityKind;
use tracing::debug;

use super::Context;
use crate::error::{CliError, CliResult};

/// Shows the product a scanned token refers to.
pub async fn scan(ctx: &Context<'_>, token: &str) -> CliResult<String> {
    let identifier = resolve_token(&ManualEntryResolver::new(), token)?;
    let product = ctx.storage.engine().get_product(&identifier).await?;
    if !product.active {
        return Err(CliError::not_found("Product", &identifier));
    }
    ctx.render(&product, |p| {
        format!(
            "{}  {}  {}  (stock {})",
            p.identifier,
            p.name,
            ctx.money(p.sell_price),
            p.stock
        )
    })
}

/// Sells `quantity` units of the product `token` resolves to.
pub async fn sell(ctx: &Context<'_>, token: &str, quantity: i64) -> CliResult<String> {
    let identifier = resolve_token(&ManualEntryResolver::new(), token)?;
    let receipt = ctx
        .storage
        .engine()
        .record_sale(&identifier, quantity)
        .await?;
    debug!(
        transaction_id = %receipt.transaction_id,
        operator = ctx.session.username(),
        "Sale recorded"
    );
    ctx.render(&receipt, |r| receipt_text(ctx, r))
}

/// Adds delivered stock.
pub async fn restock(ctx: &Context<'_>, identifier: &str, quantity: i64) -> CliResult<String> {
    let ack = ctx
        .storage
        .engine()
        .restock(identifier.trim(), quantity)
        .await?;
    debug!(
        transaction_id = %ack.transaction_id,
        operator = ctx.session.username(),
        "Restock recorded"
    );
    ctx.record_activity(
        ActivityKind::Restock,
        format!("{} +{}, stock {}", ack.identifier, ack.added, ack.new_stock),
    )
    .await;
    ctx.render(&ack, |a| {
        format!("Restocked {} +{} (now {})", a.identifier, a.added, a.new_stock)
    })
}

/// Raw scanner or keyboard input to an identifier.
pub fn resolve_token(resolver: &dyn CodeResolver, token: &str) -> CliResult<String> {
    match resolver.resolve(token) {
        Resolution::Identifier(id) => Ok(id),
        Resolution::NotRecognized => Err(CliError::validation(format!(
            "'{}' is not a product code",
            token.trim()
        ))),
    }
}

fn receipt_text(ctx: &Context<'_>, r: &Receipt) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", ctx.config.shop.name);
    let _ = writeln!(out, "{}", r.timestamp.format("%Y-%m-%d %H:%M:%S UTC"));
    let _ = writeln!(out, "{}", "-".repeat(40));
    let _ = writeln!(
        out,
        "{} x{} @ {}",
        r.product_name,
        r.quantity,
        ctx.money(r.unit_price)
    );
    let _ = writeln!(out, "TOTAL   {:>32}", ctx.money(r.total));
    let _ = writeln!(out, "{}", "-".repeat(40));
    let _ = writeln!(out, "Stock left: {}", r.remaining_stock);
    let _ = write!(out, "Ref: {}", r.transaction_id);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_token() {
        let resolver = ManualEntryResolver::new();
        assert_eq!(resolve_token(&resolver, "BRK001\r\n").unwrap(), "BRK001");
        assert!(resolve_token(&resolver, "a b").is_err());
    }
}
