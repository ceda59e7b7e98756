//! # State Module
//!
//! What a command needs besides its arguments.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────────────────────┐  │
//! │  │  AppConfig   │  │   Session    │  │   Storage (kantin-store)     │  │
//! │  │              │  │              │  │                              │  │
//! │  │  data dirs   │  │  who logged  │  │  engine, reporter, backups,  │  │
//! │  │  shop name   │  │  in, when    │  │  exporter                    │  │
//! │  │  currency    │  │              │  │                              │  │
//! │  └──────────────┘  └──────────────┘  └──────────────────────────────┘  │
//! │                                                                         │
//! │  All three are read-only after startup; the stores do their own        │
//! │  locking.                                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod session;

pub use config::{
    AppConfig, AuthConfig, ConfigError, ConfigResult, ShopSettings, StorageSettings, CONFIG_FILE,
};
pub use session::{Session, SessionError};
