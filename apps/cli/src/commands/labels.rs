//! # Label Commands
//!
//! ```text
//! kantin labels generate BRK001          data/labels/BRK001.svg
//! kantin labels regenerate               every active product
//! kantin labels regenerate --missing     only products without a file
//! ```

use std::fmt::Write as _;

use kantin_store::ActivityKind;

use super::Context;
use crate::cli::LabelsCommand;
use crate::error::{CliError, CliResult, ErrorCode};
use crate::labels::{BatchOutcome, LabelError};

pub async fn run(ctx: &Context<'_>, command: LabelsCommand) -> CliResult<String> {
    let printer = ctx.labels();

    match command {
        LabelsCommand::Generate { identifier } => {
            let product = ctx.storage.engine().get_product(identifier.trim()).await?;
            if !product.active {
                return Err(CliError::not_found("Product", &product.identifier));
            }
            let path = printer.generate(&product.identifier).await?;
            ctx.record_activity(ActivityKind::LabelsGenerated, product.identifier.clone())
                .await;

            let path = path.display().to_string();
            ctx.render(&path, |p| format!("Label for {} written to {}", product.identifier, p))
        }

        LabelsCommand::Regenerate { missing } => {
            let products = ctx.storage.engine().list_products(true).await?;
            let outcome = printer.generate_batch(&products, missing).await;
            if !outcome.generated.is_empty() {
                ctx.record_activity(
                    ActivityKind::LabelsGenerated,
                    format!("{} of {} label(s)", outcome.generated.len(), outcome.total),
                )
                .await;
            }
            ctx.render(&outcome, batch_text)
        }
    }
}

fn batch_text(outcome: &BatchOutcome) -> String {
    let mut out = format!(
        "Generated {} of {} label(s)",
        outcome.generated.len(),
        outcome.total
    );
    if !outcome.skipped.is_empty() {
        let _ = write!(out, ", {} already present", outcome.skipped.len());
    }
    for failed in &outcome.failed {
        let _ = write!(out, "\n  failed {}: {}", failed.identifier, failed.reason);
    }
    out
}

impl From<LabelError> for CliError {
    fn from(err: LabelError) -> Self {
        let code = match err {
            LabelError::Encode { .. } => ErrorCode::ValidationError,
            LabelError::Write { .. } => ErrorCode::StorageError,
        };
        CliError::new(code, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::FailedLabel;

    #[test]
    fn test_batch_text() {
        let outcome = BatchOutcome {
            total: 3,
            generated: vec!["BRK001".into()],
            skipped: vec!["MNM001".into()],
            failed: vec![FailedLabel {
                identifier: "KUE01".into(),
                reason: "bad".into(),
            }],
        };
        assert_eq!(
            batch_text(&outcome),
            "Generated 1 of 3 label(s), 1 already present\n  failed KUE01: bad"
        );
    }
}
