//! # Store Error Types
//!
//! Error types for catalog and ledger file operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  std::io::Error / csv::Error                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  StoreError (this module) ← Adds file path and categorization          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  EngineError (engine.rs) ← One variant per sale outcome                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  CliError (in app) ← Code + message + exit status                      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::path::{Path, PathBuf};

use kantin_core::ValidationError;
use thiserror::Error;

/// Storage operation errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Entity not found in the store.
    ///
    /// ## When This Occurs
    /// - Identifier not in the catalog
    /// - Backup id has no matching directory
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Key already present.
    ///
    /// ## When This Occurs
    /// - Appending a ledger record whose transaction id was already written
    #[error("Duplicate {entity}: '{id}' already exists")]
    Duplicate { entity: String, id: String },

    /// Input rejected before anything was written.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Stock adjustment would take stock below zero.
    #[error("Insufficient stock for {identifier}: available {available}, requested {requested}")]
    InsufficientStock {
        identifier: String,
        available: i64,
        requested: i64,
    },

    /// Write did not complete. The prior on-disk state is intact.
    ///
    /// ## When This Occurs
    /// - Disk full
    /// - File permissions changed under us
    /// - fsync reported an error
    #[error("Write to {} failed: {reason}", path.display())]
    WriteFailed { path: PathBuf, reason: String },

    /// A persisted file cannot be parsed.
    ///
    /// The store refuses to operate until the file is restored from backup.
    #[error("{store} store is corrupt ({}): {reason}", path.display())]
    StorageCorruption {
        store: String,
        path: PathBuf,
        reason: String,
    },

    /// Filesystem error outside of a write (open, read, list).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        StoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a Duplicate error.
    pub fn duplicate(entity: impl Into<String>, id: impl Into<String>) -> Self {
        StoreError::Duplicate {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a StorageCorruption error.
    pub fn corruption(store: impl Into<String>, path: &Path, reason: impl Into<String>) -> Self {
        StoreError::StorageCorruption {
            store: store.into(),
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    /// Creates a WriteFailed error from an I/O error.
    pub fn write_failed(path: &Path, err: impl std::fmt::Display) -> Self {
        StoreError::WriteFailed {
            path: path.to_path_buf(),
            reason: err.to_string(),
        }
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
