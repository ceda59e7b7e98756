//! # Product Commands
//!
//! Catalog maintenance from the back office.
//!
//! ```text
//! kantin product add BRK001 "Roti Bakar" Makanan 10 1000 1500
//! kantin product edit BRK001 --price 2000
//! kantin product retire BRK001
//! kantin product list [--all] [--category Minuman]
//! kantin product search teh
//! ```

use std::fmt::Write as _;

use kantin_core::{Product, ProductEdit};
use kantin_store::ActivityKind;
use tracing::info;

use super::Context;
use crate::cli::ProductCommand;
use crate::error::{CliError, CliResult};

pub async fn run(ctx: &Context<'_>, command: ProductCommand) -> CliResult<String> {
    let engine = ctx.storage.engine();

    match command {
        ProductCommand::Add {
            identifier,
            name,
            category,
            stock,
            cost,
            price,
        } => {
            let product = engine
                .register_product(Product::new(identifier, name, category, stock, cost, price))
                .await?;
            info!(
                identifier = %product.identifier,
                operator = ctx.session.username(),
                "Product registered"
            );
            ctx.record_activity(
                ActivityKind::ProductAdded,
                format!("{} {} (stock {})", product.identifier, product.name, product.stock),
            )
            .await;
            ctx.render(&product, |p| format!("Registered {}\n{}", p.identifier, product_line(ctx, p)))
        }

        ProductCommand::Edit {
            identifier,
            name,
            category,
            cost,
            price,
        } => {
            let edit = ProductEdit {
                name,
                category,
                cost_price: cost,
                sell_price: price,
            };
            if edit.is_empty() {
                return Err(CliError::validation(
                    "Nothing to change: give --name, --category, --cost or --price",
                ));
            }
            let changed = edit_summary(&edit);
            let product = engine.edit_product(&identifier, edit).await?;
            ctx.record_activity(
                ActivityKind::ProductEdited,
                format!("{} {}", product.identifier, changed),
            )
            .await;
            ctx.render(&product, |p| format!("Updated {}\n{}", p.identifier, product_line(ctx, p)))
        }

        ProductCommand::Retire { identifier } => {
            let product = engine.retire_product(&identifier).await?;
            info!(
                identifier = %product.identifier,
                operator = ctx.session.username(),
                "Product retired"
            );
            ctx.record_activity(
                ActivityKind::ProductRetired,
                format!("{} {}", product.identifier, product.name),
            )
            .await;
            ctx.render(&product, |p| format!("Retired {} ({})", p.identifier, p.name))
        }

        ProductCommand::Show { identifier } => {
            let product = engine.get_product(&identifier).await?;
            ctx.render(&product, |p| product_detail(ctx, p))
        }

        ProductCommand::List { all, category } => {
            let mut products = engine.list_products(!all).await?;
            if let Some(category) = category {
                products.retain(|p| p.category.eq_ignore_ascii_case(category.trim()));
            }
            ctx.render(&products, |ps| product_table(ctx, ps))
        }

        ProductCommand::Search { query } => {
            let products = engine.search_products(&query).await?;
            ctx.render(&products, |ps| product_table(ctx, ps))
        }
    }
}

// =============================================================================
// Text Rendering
// =============================================================================

/// Which fields an edit touches, e.g. `name, price`.
fn edit_summary(edit: &ProductEdit) -> String {
    let fields = [
        ("name", edit.name.is_some()),
        ("category", edit.category.is_some()),
        ("cost", edit.cost_price.is_some()),
        ("price", edit.sell_price.is_some()),
    ];
    fields
        .iter()
        .filter(|(_, set)| *set)
        .map(|(field, _)| *field)
        .collect::<Vec<_>>()
        .join(", ")
}

pub(crate) fn product_line(ctx: &Context<'_>, p: &Product) -> String {
    format!(
        "{:<12} {:<28} {:<12} {:>6} {:>14} {:>14}{}",
        p.identifier,
        p.name,
        p.category,
        p.stock,
        ctx.money(p.cost_price),
        ctx.money(p.sell_price),
        if p.active { "" } else { "  (retired)" }
    )
}

fn product_table(ctx: &Context<'_>, products: &[Product]) -> String {
    if products.is_empty() {
        return "No products found".to_string();
    }

    let mut out = format!(
        "{:<12} {:<28} {:<12} {:>6} {:>14} {:>14}\n",
        "CODE", "NAME", "CATEGORY", "STOCK", "COST", "PRICE"
    );
    for p in products {
        out.push_str(&product_line(ctx, p));
        out.push('\n');
    }
    let _ = write!(out, "{} product(s)", products.len());
    out
}

fn product_detail(ctx: &Context<'_>, p: &Product) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Code:      {}", p.identifier);
    let _ = writeln!(out, "Name:      {}", p.name);
    let _ = writeln!(out, "Category:  {}", p.category);
    let _ = writeln!(out, "Stock:     {}", p.stock);
    let _ = writeln!(out, "Cost:      {}", ctx.money(p.cost_price));
    let _ = writeln!(out, "Price:     {}", ctx.money(p.sell_price));
    let _ = writeln!(out, "Margin:    {}", ctx.money(p.unit_margin()));
    let status = if !p.active {
        "retired"
    } else if p.is_low_stock(ctx.config.shop.low_stock_threshold) {
        "active, low stock"
    } else {
        "active"
    };
    let _ = write!(out, "Status:    {}", status);
    out
}
