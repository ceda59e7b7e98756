//! # Kantin CLI Library
//!
//! Everything behind the `kantin` binary. `main.rs` only parses arguments
//! and calls [`run`].
//!
//! ## Module Organization
//! ```text
//! kantin_cli/
//! ├── lib.rs          ◄─── You are here (startup, tracing, exit codes)
//! ├── cli.rs          ◄─── clap argument definitions
//! ├── labels.rs       ◄─── Code128 label SVGs, written on catalog saves
//! ├── state/
//! │   ├── mod.rs      ◄─── State type exports
//! │   ├── config.rs   ◄─── kantin.toml + KANTIN_* overrides
//! │   └── session.rs  ◄─── Operator login
//! ├── commands/
//! │   ├── mod.rs      ◄─── Context + dispatch
//! │   ├── product.rs  ◄─── Catalog maintenance
//! │   ├── sale.rs     ◄─── scan / sell / restock
//! │   ├── report.rs   ◄─── Reports, exports, info
//! │   ├── backup.rs   ◄─── Backup and restore
//! │   ├── labels.rs   ◄─── Label batches
//! │   └── activity.rs ◄─── Activity log listing
//! └── error.rs        ◄─── CliError and exit codes
//! ```

pub mod cli;
pub mod commands;
pub mod error;
pub mod labels;
pub mod state;

use std::process::ExitCode;

use kantin_store::Storage;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cli::Cli;
use commands::Context;
use error::{CliError, CliResult};
use state::{AppConfig, Session};

/// Runs one command and maps the outcome to a process exit code.
///
/// ## Startup Sequence
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                       Command Startup                                   │
/// │                                                                         │
/// │  1. Initialize Logging ───────────────────────────────────────────────► │
/// │     • stderr, RUST_LOG or "warn,kantin=info" (-v: debug)                │
/// │                                                                         │
/// │  2. Load Configuration ───────────────────────────────────────────────► │
/// │     • defaults → kantin.toml → KANTIN_* env                             │
/// │                                                                         │
/// │  3. Log In ───────────────────────────────────────────────────────────► │
/// │     • --user / --password against [auth]                                │
/// │                                                                         │
/// │  4. Open Stores ──────────────────────────────────────────────────────► │
/// │     • refuses to start on a corrupt catalog or ledger                   │
/// │                                                                         │
/// │  5. Run Command, print result on stdout ──────────────────────────────► │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub async fn run(cli: Cli) -> ExitCode {
    init_tracing(cli.verbose);
    let json = cli.json;

    match execute(cli).await {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(err) => {
            print_error(&err, json);
            ExitCode::from(err.exit_code())
        }
    }
}

/// Steps 2 to 5 of [`run`], returning the rendered output.
pub async fn execute(cli: Cli) -> CliResult<String> {
    let config = AppConfig::load(cli.config.as_deref())?;
    let session = Session::login(&config.auth, cli.user.as_deref(), cli.password.as_deref())?;

    let storage = Storage::open(config.store_config()).await?;
    let labels = labels::spawn_label_listener(
        storage.engine().subscribe(),
        labels::LabelPrinter::new(config.label_dir()),
    );

    let ctx = Context {
        storage: &storage,
        config: &config,
        session: &session,
        json: cli.json,
    };
    let output = commands::execute(&ctx, cli.command).await;

    // Closing the stores closes the event channel and ends the listener
    drop(storage);
    match labels.await {
        Ok(written) if !written.is_empty() => {
            info!(count = written.len(), codes = ?written, "Labels ready to print");
        }
        Ok(_) => {}
        Err(e) => tracing::warn!(error = %e, "Label listener stopped unexpectedly"),
    }

    output
}

/// Initializes the tracing subscriber on stderr.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=kantin_store=trace` - Trace for the store crate only
/// - Default: warnings, plus INFO for kantin crates
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("warn,kantin=info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_error(err: &CliError, json: bool) {
    if json {
        match serde_json::to_string_pretty(err) {
            Ok(body) => println!("{}", body),
            Err(_) => eprintln!("error: {}", err),
        }
    } else {
        eprintln!("error: {}", err);
    }
}
