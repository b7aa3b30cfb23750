use std::path::Path;
use std::sync::Arc;

use anyhow::{Result, bail};
use dispatch_config::Config;
use dispatch_core::OrderId;
use dispatch_storage::Storage;
use dispatch_submit::{SubmitError, Submitter};
use tokio::sync::mpsc;
use tracing::debug;

use super::{
    blob_store, load_catalog, load_draft, print_report, skip_uploaded, spawn_progress_printer,
};

pub async fn handle(
    path: &Path,
    order: Option<String>,
    storage: &Storage,
    config: &Config,
) -> Result<()> {
    let mut draft = load_draft(path)?;
    let existing = order.map(OrderId::new);
    debug!(
        draft = %path.display(),
        items = draft.items().len(),
        update = existing.is_some(),
        "loaded draft"
    );

    if let Some(id) = &existing {
        if let Some(stored) = storage.find_order(id).await? {
            let skipped = skip_uploaded(&mut draft, &stored);
            if skipped > 0 {
                println!("Skipping {skipped} image(s) already stored");
            }
        }
    }

    let (tx, rx) = mpsc::unbounded_channel();
    let printer = spawn_progress_printer(rx);

    let mut submitter = Submitter::new(Arc::new(storage.clone()), Arc::new(blob_store(config)?))
        .with_events(tx);
    if let Some(catalog) = load_catalog(config)? {
        submitter = submitter.with_catalog(catalog);
    }

    let cancel = submitter.cancel_flag();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("Cancelling after the current upload...");
            cancel.cancel();
        }
    });

    let result = submitter.submit(&mut draft, existing.as_ref()).await;
    drop(submitter);
    ctrl_c.abort();
    printer.await?;

    match result {
        Ok(report) => {
            print_report(&report);
            Ok(())
        }
        Err(SubmitError::Validation(violations)) => {
            println!("Draft has {} violation(s):", violations.len());
            for violation in &violations {
                println!("  {}: {}", violation.field(), violation);
            }
            bail!("draft {} is not valid", path.display())
        }
        Err(err) => Err(err.into()),
    }
}
