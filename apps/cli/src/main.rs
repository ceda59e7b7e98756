//! # Kantin POS Command Line
//!
//! ```text
//! $ kantin --user admin --password admin123 sell BRK001 3
//! Kantin Sekolah
//! 2024-03-01 08:15:02 UTC
//! ----------------------------------------
//! Roti Bakar x3 @ Rp 1.500
//! TOTAL                         Rp 4.500
//! ----------------------------------------
//! Stock left: 7
//! ```
//!
//! The setup lives in lib.rs so it can be tested.

use std::process::ExitCode;

use clap::Parser;
use kantin_cli::cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    kantin_cli::run(Cli::parse()).await
}
