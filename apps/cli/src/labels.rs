//! # Barcode Labels
//!
//! Code128 shelf labels, one SVG per product, named after the identifier.
//!
//! ```text
//! data/labels/
//! ├── BRK001.svg
//! └── MNM001.svg
//! ```
//!
//! ## When Labels Are Written
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  product add / edit                                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  CatalogEvent::ProductSaved ──► broadcast ──► spawn_label_listener      │
//! │                                                    │                    │
//! │                                                    ▼                    │
//! │                                      LabelPrinter::generate(id)         │
//! │                                                                         │
//! │  labels generate <id>           one label, on demand                    │
//! │  labels regenerate [--missing]  every active product (or only those     │
//! │                                 without a file yet)                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A label that cannot be written never fails the catalog change that asked
//! for it. The listener logs the failure and moves on; the batch command
//! lists it under `failed`.

use std::path::{Path, PathBuf};

use barcoders::generators::svg::SVG;
use barcoders::sym::code128::Code128;
use kantin_core::{CatalogEvent, Product};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Bar height in SVG user units.
pub const LABEL_HEIGHT: u32 = 80;

/// Code128 start character for set B (printable ASCII).
const CHARSET_B: char = 'Ɓ';

#[derive(Debug, Error)]
pub enum LabelError {
    #[error("Cannot encode {identifier} as Code128: {reason}")]
    Encode { identifier: String, reason: String },

    #[error("Cannot write label {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One label the batch could not produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedLabel {
    pub identifier: String,
    pub reason: String,
}

/// Result of [`LabelPrinter::generate_batch`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOutcome {
    pub total: usize,
    pub generated: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<FailedLabel>,
}

/// Writes label SVGs into one directory.
#[derive(Debug, Clone)]
pub struct LabelPrinter {
    dir: PathBuf,
}

impl LabelPrinter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        LabelPrinter { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `{dir}/{identifier}.svg`
    pub fn path_for(&self, identifier: &str) -> PathBuf {
        self.dir.join(format!("{identifier}.svg"))
    }

    /// Writes (or overwrites) the label for `identifier`.
    pub async fn generate(&self, identifier: &str) -> Result<PathBuf, LabelError> {
        let svg = render_svg(identifier)?;
        let path = self.path_for(identifier);

        let written: std::io::Result<()> = async {
            tokio::fs::create_dir_all(&self.dir).await?;
            tokio::fs::write(&path, svg).await
        }
        .await;
        written.map_err(|source| LabelError::Write {
            path: path.clone(),
            source,
        })?;

        debug!(identifier, path = %path.display(), "Label written");
        Ok(path)
    }

    /// Labels for every active product in `products`.
    ///
    /// With `missing_only`, products that already have a file are skipped.
    /// One bad identifier does not stop the rest.
    pub async fn generate_batch(&self, products: &[Product], missing_only: bool) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();

        for product in products.iter().filter(|p| p.active) {
            outcome.total += 1;
            let id = &product.identifier;

            if missing_only && self.path_for(id).exists() {
                outcome.skipped.push(id.clone());
                continue;
            }

            match self.generate(id).await {
                Ok(_) => outcome.generated.push(id.clone()),
                Err(e) => {
                    warn!(identifier = %id, error = %e, "Label not generated");
                    outcome.failed.push(FailedLabel {
                        identifier: id.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            total = outcome.total,
            generated = outcome.generated.len(),
            failed = outcome.failed.len(),
            "Label batch finished"
        );
        outcome
    }
}

/// Encodes `identifier` as a Code128 (set B) SVG document.
pub fn render_svg(identifier: &str) -> Result<String, LabelError> {
    let encode_error = |reason: String| LabelError::Encode {
        identifier: identifier.to_string(),
        reason,
    };

    let barcode = Code128::new(format!("{CHARSET_B}{identifier}"))
        .map_err(|e| encode_error(format!("{e:?}")))?;
    let encoded: Vec<u8> = barcode.encode();

    SVG::new(LABEL_HEIGHT)
        .generate(&encoded[..])
        .map_err(|e| encode_error(format!("{e:?}")))
}

/// Spawns the listener that writes a label for every saved product.
///
/// The handle yields the identifiers whose label was written. The listener
/// ends when the stores are dropped (channel closed), after draining
/// whatever was already sent.
pub fn spawn_label_listener(
    mut events: broadcast::Receiver<CatalogEvent>,
    printer: LabelPrinter,
) -> JoinHandle<Vec<String>> {
    tokio::spawn(async move {
        let mut written = Vec::new();
        loop {
            match events.recv().await {
                Ok(CatalogEvent::ProductSaved { identifier, name }) => {
                    match printer.generate(&identifier).await {
                        Ok(path) => {
                            info!(identifier = %identifier, name = %name, path = %path.display(), "Label written");
                            if !written.contains(&identifier) {
                                written.push(identifier);
                            }
                        }
                        Err(e) => warn!(identifier = %identifier, error = %e, "Label not written"),
                    }
                }
                Ok(CatalogEvent::ProductRetired { identifier }) => {
                    debug!(identifier = %identifier, "Retired, label left in place");
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Label listener fell behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
        written
    })
}
