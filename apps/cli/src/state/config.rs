//! # Application Configuration
//!
//! Loaded once at startup, read-only afterwards.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Defaults (this file)                                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  2. Config file ──── --config <path>                                   │
//! │       │              else {config_dir}/kantin.toml                     │
//! │       ▼                                                                 │
//! │  3. Environment ──── KANTIN_DATA_DIR, KANTIN_SHOP_NAME, ...            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  validate() ──► AppConfig                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [storage]
//! data_dir = "data"
//! backup_dir = "data/backup"
//! export_dir = "data/exports"
//! label_dir = "data/labels"
//!
//! [shop]
//! name = "Kantin Sekolah"
//! low_stock_threshold = 10
//!
//! [currency]
//! symbol = "Rp"
//! decimals = 0
//! thousands_separator = "."
//! decimal_separator = ","
//!
//! [auth]
//! username = "admin"
//! password = "admin123"
//! ```

use std::path::{Path, PathBuf};

use kantin_core::{CurrencyFormat, DEFAULT_LOW_STOCK_THRESHOLD};
use kantin_store::StoreConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Config file name inside the platform config directory.
pub const CONFIG_FILE: &str = "kantin.toml";

/// More minor-unit digits than any real currency uses.
const MAX_CURRENCY_DECIMALS: u8 = 4;

// =============================================================================
// Errors
// =============================================================================

/// Configuration could not be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Sections
// =============================================================================

/// Where the store files live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub data_dir: PathBuf,

    /// Default: `{data_dir}/backup`
    pub backup_dir: Option<PathBuf>,

    /// Default: `{data_dir}/exports`
    pub export_dir: Option<PathBuf>,

    /// Barcode label SVGs. Default: `{data_dir}/labels`
    pub label_dir: Option<PathBuf>,
}

impl Default for StorageSettings {
    fn default() -> Self {
        StorageSettings {
            data_dir: PathBuf::from("data"),
            backup_dir: None,
            export_dir: None,
            label_dir: None,
        }
    }
}

/// Shop details shown on receipts and reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShopSettings {
    pub name: String,

    /// Products with fewer units than this are listed by `low-stock`.
    pub low_stock_threshold: i64,
}

impl Default for ShopSettings {
    fn default() -> Self {
        ShopSettings {
            name: "Kantin Sekolah".to_string(),
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
        }
    }
}

/// The single operator credential.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub username: String,
    pub password: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        AuthConfig {
            username: "admin".to_string(),
            password: "admin123".to_string(),
        }
    }
}

// Keep the password out of debug logs
impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

// =============================================================================
// AppConfig
// =============================================================================

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub storage: StorageSettings,
    pub shop: ShopSettings,
    pub currency: CurrencyFormat,
    pub auth: AuthConfig,
}

impl AppConfig {
    /// Loads configuration: defaults, then file, then environment.
    ///
    /// An explicit `config_path` that does not exist is an error; a
    /// missing default file just means defaults.
    pub fn load(config_path: Option<&Path>) -> ConfigResult<Self> {
        let mut config = match config_path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                Some(path) => {
                    debug!(path = %path.display(), "Config file not found, using defaults");
                    Self::default()
                }
                None => Self::default(),
            },
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parses one TOML file. Missing sections take their defaults.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        info!(path = %path.display(), "Loading config file");
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Applies `KANTIN_*` overrides read through `lookup`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("KANTIN_DATA_DIR") {
            debug!(data_dir = %dir, "Overriding data directory from environment");
            self.storage.data_dir = PathBuf::from(dir);
        }

        if let Some(dir) = lookup("KANTIN_BACKUP_DIR") {
            self.storage.backup_dir = Some(PathBuf::from(dir));
        }

        if let Some(dir) = lookup("KANTIN_EXPORT_DIR") {
            self.storage.export_dir = Some(PathBuf::from(dir));
        }

        if let Some(dir) = lookup("KANTIN_LABEL_DIR") {
            self.storage.label_dir = Some(PathBuf::from(dir));
        }

        if let Some(name) = lookup("KANTIN_SHOP_NAME") {
            self.shop.name = name;
        }

        if let Some(threshold) = lookup("KANTIN_LOW_STOCK_THRESHOLD") {
            match threshold.parse::<i64>() {
                Ok(t) => self.shop.low_stock_threshold = t,
                Err(_) => warn!(value = %threshold, "Ignoring non-numeric KANTIN_LOW_STOCK_THRESHOLD"),
            }
        }

        if let Some(username) = lookup("KANTIN_AUTH_USERNAME") {
            self.auth.username = username;
        }

        if let Some(password) = lookup("KANTIN_AUTH_PASSWORD") {
            self.auth.password = password;
        }
    }

    /// Rejects settings the application cannot run with.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.storage.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("storage.data_dir must not be empty".into()));
        }
        if self.auth.username.trim().is_empty() {
            return Err(ConfigError::Invalid("auth.username must not be empty".into()));
        }
        if self.auth.password.is_empty() {
            return Err(ConfigError::Invalid("auth.password must not be empty".into()));
        }
        if self.currency.decimals > MAX_CURRENCY_DECIMALS {
            return Err(ConfigError::Invalid(format!(
                "currency.decimals must be at most {}, got {}",
                MAX_CURRENCY_DECIMALS, self.currency.decimals
            )));
        }
        if self.shop.low_stock_threshold < 0 {
            return Err(ConfigError::Invalid(
                "shop.low_stock_threshold must not be negative".into(),
            ));
        }
        Ok(())
    }

    /// Store layout with the optional directories resolved.
    pub fn store_config(&self) -> StoreConfig {
        let mut config = StoreConfig::new(&self.storage.data_dir);
        if let Some(dir) = &self.storage.backup_dir {
            config = config.backup_dir(dir);
        }
        if let Some(dir) = &self.storage.export_dir {
            config = config.export_dir(dir);
        }
        config
    }

    /// Where `labels` writes barcode SVGs.
    pub fn label_dir(&self) -> PathBuf {
        self.storage
            .label_dir
            .clone()
            .unwrap_or_else(|| self.storage.data_dir.join("labels"))
    }

    /// `{platform config dir}/kantin.toml`
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("id", "kantin", "pos")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }
}
