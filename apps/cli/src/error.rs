//! # CLI Error Type
//!
//! Unified error type for command handlers.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Kantin POS                             │
//! │                                                                         │
//! │  kantin sell BRK001 8                                                  │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Command Handler                                                 │  │
//! │  │  Result<(), CliError>                                            │  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Engine Error? ─── EngineError::InsufficientStock ──┐           │  │
//! │  │         │                                           │           │  │
//! │  │         ▼                                           ▼           │  │
//! │  │  Config Error? ─── ConfigError::Invalid ───────── CliError ────►│  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Success ──────────────────────────────────────────────────────►│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  stderr: error[INSUFFICIENT_STOCK]: Insufficient stock for BRK001 ...   │
//! │  exit code: 4                                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! With `--json` the error is printed as an object instead:
//! ```json
//! { "code": "INSUFFICIENT_STOCK", "message": "Insufficient stock for BRK001: ..." }
//! ```

use serde::Serialize;

use kantin_core::{CoreError, ValidationError};
use kantin_store::{EngineError, StoreError};

use crate::state::{ConfigError, SessionError};

/// Error returned from command handlers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CliError {
    /// Machine-readable error code for scripts
    pub code: ErrorCode,

    /// Human-readable error message for the operator
    pub message: String,
}

/// Error codes, one per process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Product or backup does not exist
    NotFound,

    /// Input validation failed
    ValidationError,

    /// Not enough stock for the sale
    InsufficientStock,

    /// Write failed; nothing was changed
    StorageError,

    /// A store file is damaged; restore from backup
    Corruption,

    /// Login failed
    Unauthorized,

    /// Config file unreadable or invalid
    Config,

    /// Stock and ledger disagree after a failed rollback
    Internal,
}

impl ErrorCode {
    /// Process exit status for this error.
    pub fn exit_code(self) -> u8 {
        match self {
            ErrorCode::ValidationError => 2,
            ErrorCode::NotFound => 3,
            ErrorCode::InsufficientStock => 4,
            ErrorCode::Unauthorized => 5,
            ErrorCode::Config => 6,
            ErrorCode::StorageError => 10,
            ErrorCode::Corruption => 11,
            ErrorCode::Internal => 12,
        }
    }
}

impl CliError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        CliError {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        CliError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        CliError::new(ErrorCode::ValidationError, message)
    }

    pub fn exit_code(&self) -> u8 {
        self.code.exit_code()
    }
}

pub type CliResult<T> = Result<T, CliError>;

/// Converts engine errors to CLI errors.
impl From<EngineError> for CliError {
    fn from(err: EngineError) -> Self {
        let message = err.to_string();
        let code = match err {
            EngineError::InvalidQuantity { .. } | EngineError::Validation(_) => {
                ErrorCode::ValidationError
            }
            EngineError::ProductNotFound(id) => return CliError::not_found("Product", &id),
            EngineError::DuplicateProduct(_) => ErrorCode::ValidationError,
            EngineError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
            EngineError::LedgerWriteFailed { .. } | EngineError::Storage(_) => {
                ErrorCode::StorageError
            }
            EngineError::StorageCorruption { .. } => ErrorCode::Corruption,
            EngineError::CompensationFailed { .. } => {
                tracing::error!(error = %message, "Stock needs manual correction");
                ErrorCode::Internal
            }
        };
        CliError::new(code, message)
    }
}

/// Converts store errors (reports, exports, backups) to CLI errors.
impl From<StoreError> for CliError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => CliError::not_found(&entity, &id),
            StoreError::Duplicate { .. } | StoreError::Validation(_) => {
                CliError::validation(err.to_string())
            }
            StoreError::InsufficientStock { .. } => {
                CliError::new(ErrorCode::InsufficientStock, err.to_string())
            }
            StoreError::StorageCorruption { .. } => {
                CliError::new(ErrorCode::Corruption, err.to_string())
            }
            StoreError::WriteFailed { .. } | StoreError::Io(_) => {
                CliError::new(ErrorCode::StorageError, err.to_string())
            }
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        EngineError::from(err).into()
    }
}

impl From<ValidationError> for CliError {
    fn from(err: ValidationError) -> Self {
        CliError::validation(err.to_string())
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        CliError::new(ErrorCode::Config, err.to_string())
    }
}

impl From<SessionError> for CliError {
    fn from(err: SessionError) -> Self {
        CliError::new(ErrorCode::Unauthorized, err.to_string())
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}
