//! # Command Line Arguments
//!
//! ```text
//! kantin [--config PATH] [--user U] [--password P] [--json] [-v] <COMMAND>
//!
//!   product add|edit|retire|show|list|search
//!   scan <token>
//!   sell <token> <qty>
//!   restock <id> <qty>
//!   report [--from D] [--to D] [--top N]
//!   low-stock [--threshold N]
//!   export transactions|products|daily [--format csv|xlsx] [--from D] [--to D]
//!   info
//!   backup create|list|restore <id>|prune [--days N]
//!   labels generate <id>|regenerate [--missing]
//!   activity [--limit N]
//! ```

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use kantin_core::{DateRange, Money};
use kantin_store::activity::DEFAULT_RECENT_ACTIVITY;
use kantin_store::backup::DEFAULT_RETENTION_DAYS;
use kantin_store::ExportFormat;

use crate::error::{CliError, CliResult};

/// Days covered by `report` when no dates are given.
pub const DEFAULT_REPORT_DAYS: u64 = 7;

/// Rows in the top sellers table.
pub const DEFAULT_TOP_SELLERS: usize = 5;

#[derive(Debug, Parser)]
#[command(name = "kantin", version, about = "School canteen point of sale")]
pub struct Cli {
    /// Config file (default: platform config dir/kantin.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Operator username
    #[arg(long, short = 'u', global = true, env = "KANTIN_USERNAME")]
    pub user: Option<String>,

    /// Operator password
    #[arg(
        long,
        short = 'p',
        global = true,
        env = "KANTIN_PASSWORD",
        hide_env_values = true
    )]
    pub password: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Debug logging on stderr
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage the product catalog
    #[command(subcommand)]
    Product(ProductCommand),

    /// Resolve a scanned or typed code and show the product
    Scan { token: String },

    /// Sell units of a product
    Sell {
        /// Scanned or typed product code
        token: String,
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },

    /// Add delivered units to stock
    Restock {
        identifier: String,
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },

    /// Sales summary, daily totals and top sellers
    Report {
        #[command(flatten)]
        range: RangeArgs,

        /// Number of top sellers to show
        #[arg(long, default_value_t = DEFAULT_TOP_SELLERS)]
        top: usize,
    },

    /// Products running low
    LowStock {
        /// Override the configured threshold
        #[arg(long)]
        threshold: Option<i64>,
    },

    /// Write a CSV or Excel file for spreadsheets
    Export {
        #[arg(value_enum)]
        what: ExportKind,

        #[arg(long, value_enum, default_value_t = FileFormat::Csv)]
        format: FileFormat,

        #[command(flatten)]
        range: RangeArgs,
    },

    /// Stock value and store file overview
    Info,

    /// Point-in-time copies of both store files
    #[command(subcommand)]
    Backup(BackupCommand),

    /// Barcode label SVGs
    #[command(subcommand)]
    Labels(LabelsCommand),

    /// Recent catalog and backup actions
    Activity {
        #[arg(long, default_value_t = DEFAULT_RECENT_ACTIVITY)]
        limit: usize,
    },
}

#[derive(Debug, Subcommand)]
pub enum ProductCommand {
    /// Register a new product
    Add {
        identifier: String,
        name: String,
        category: String,
        #[arg(allow_negative_numbers = true)]
        stock: i64,
        /// Cost price in minor units (whole Rupiah)
        #[arg(value_parser = parse_money, allow_negative_numbers = true)]
        cost: Money,
        /// Sell price in minor units (whole Rupiah)
        #[arg(value_parser = parse_money, allow_negative_numbers = true)]
        price: Money,
    },

    /// Change name, category or prices (stock changes go through sell/restock)
    Edit {
        identifier: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long, value_parser = parse_money, allow_negative_numbers = true)]
        cost: Option<Money>,
        #[arg(long, value_parser = parse_money, allow_negative_numbers = true)]
        price: Option<Money>,
    },

    /// Stop selling a product (history is kept)
    Retire { identifier: String },

    /// Show one product, retired or not
    Show { identifier: String },

    /// List products
    List {
        /// Include retired products
        #[arg(long)]
        all: bool,
        #[arg(long)]
        category: Option<String>,
    },

    /// Find products by code, name or category
    Search { query: String },
}

#[derive(Debug, Subcommand)]
pub enum BackupCommand {
    /// Copy both store files now
    Create,

    /// Backups, newest first
    List,

    /// Replace the stores with a backup (current state is backed up first)
    Restore { id: String },

    /// Delete old backups
    Prune {
        #[arg(long, default_value_t = DEFAULT_RETENTION_DAYS)]
        days: u32,
    },
}

#[derive(Debug, Subcommand)]
pub enum LabelsCommand {
    /// Write the label for one product
    Generate { identifier: String },

    /// Write labels for every active product
    Regenerate {
        /// Only products without a label file yet
        #[arg(long)]
        missing: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FileFormat {
    Csv,
    Xlsx,
}

impl From<FileFormat> for ExportFormat {
    fn from(format: FileFormat) -> Self {
        match format {
            FileFormat::Csv => ExportFormat::Csv,
            FileFormat::Xlsx => ExportFormat::Xlsx,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportKind {
    Transactions,
    Products,
    Daily,
}

/// `--from` / `--to`, both inclusive whole days (UTC).
#[derive(Debug, Clone, Default, Args)]
pub struct RangeArgs {
    /// First day, YYYY-MM-DD
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// Last day, YYYY-MM-DD
    #[arg(long)]
    pub to: Option<NaiveDate>,
}

impl RangeArgs {
    /// Resolves the flags against `today`.
    ///
    /// With neither flag, `default_days` ending today, or everything when
    /// `default_days` is `None`.
    pub fn resolve(&self, today: NaiveDate, default_days: Option<u64>) -> CliResult<DateRange> {
        match (self.from, self.to) {
            (None, None) => Ok(match default_days {
                Some(days) => DateRange::last_days(today, days),
                None => DateRange::all(),
            }),
            (Some(from), to) => {
                let to = to.unwrap_or(today);
                if from > to {
                    return Err(CliError::validation(format!(
                        "--from {} is after --to {}",
                        from, to
                    )));
                }
                Ok(DateRange::days(from, to))
            }
            (None, Some(to)) => Ok(DateRange {
                start: None,
                end: DateRange::days(to, to).end,
            }),
        }
    }
}

fn parse_money(s: &str) -> Result<Money, String> {
    s.trim()
        .parse::<i64>()
        .map(Money::from_minor)
        .map_err(|_| format!("'{}' is not a whole amount in minor units", s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("kantin").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_sell_with_globals() {
        let cli = parse(&["--user", "admin", "--json", "sell", "BRK001", "3"]);
        assert!(cli.json);
        assert_eq!(cli.user.as_deref(), Some("admin"));
        match cli.command {
            Command::Sell { token, quantity } => {
                assert_eq!(token, "BRK001");
                assert_eq!(quantity, 3);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_negative_quantity_reaches_validation() {
        let cli = parse(&["sell", "BRK001", "-2"]);
        assert!(matches!(cli.command, Command::Sell { quantity: -2, .. }));
    }

    #[test]
    fn test_product_add_parses_money() {
        let cli = parse(&["product", "add", "BRK001", "Roti Bakar", "Makanan", "10", "1000", "1500"]);
        match cli.command {
            Command::Product(ProductCommand::Add { cost, price, .. }) => {
                assert_eq!(cost, Money::from_minor(1000));
                assert_eq!(price, Money::from_minor(1500));
            }
            other => panic!("unexpected {other:?}"),
        }

        assert!(Cli::try_parse_from([
            "kantin", "product", "add", "X01", "n", "c", "1", "1.5", "2"
        ])
        .is_err());
    }

    #[test]
    fn test_backup_prune_default_days() {
        let cli = parse(&["backup", "prune"]);
        assert!(matches!(cli.command, Command::Backup(BackupCommand::Prune { days: 7 })));
    }

    #[test]
    fn test_export_format_and_labels() {
        let cli = parse(&["export", "daily", "--format", "xlsx"]);
        assert!(matches!(
            cli.command,
            Command::Export { what: ExportKind::Daily, format: FileFormat::Xlsx, .. }
        ));
        assert!(matches!(
            parse(&["export", "products"]).command,
            Command::Export { format: FileFormat::Csv, .. }
        ));

        let cli = parse(&["labels", "regenerate", "--missing"]);
        assert!(matches!(
            cli.command,
            Command::Labels(LabelsCommand::Regenerate { missing: true })
        ));
        assert!(matches!(parse(&["activity"]).command, Command::Activity { limit: 10 }));
    }

    #[test]
    fn test_range_resolution() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();

        let last_week = RangeArgs::default().resolve(today, Some(7)).unwrap();
        assert_eq!(last_week, DateRange::days(NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(), today));

        assert_eq!(RangeArgs::default().resolve(today, None).unwrap(), DateRange::all());

        let from = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let open_end = RangeArgs { from: Some(from), to: None }.resolve(today, Some(7)).unwrap();
        assert_eq!(open_end, DateRange::days(from, today));

        let backwards = RangeArgs {
            from: Some(today),
            to: Some(from),
        };
        assert!(backwards.resolve(today, None).is_err());
    }
}
