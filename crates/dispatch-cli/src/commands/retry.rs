use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use dispatch_config::Config;
use dispatch_core::OrderId;
use dispatch_storage::Storage;
use dispatch_submit::Submitter;
use tokio::sync::mpsc;
use tracing::info;

use super::{blob_store, load_draft, print_report, skip_uploaded, spawn_progress_printer};

pub async fn handle(order: String, path: &Path, storage: &Storage, config: &Config) -> Result<()> {
    let id = OrderId::new(order);
    let stored = storage.order(&id).await?;

    let mut draft = load_draft(path)?;
    let skipped = skip_uploaded(&mut draft, &stored);
    let pending = draft.pending_uploads().len();
    info!(order_id = %id, skipped, pending, "retrying uploads");
    println!("Order {id}: {skipped} image(s) already stored, {pending} to upload");

    let (tx, rx) = mpsc::unbounded_channel();
    let printer = spawn_progress_printer(rx);
    let mut submitter = Submitter::new(Arc::new(storage.clone()), Arc::new(blob_store(config)?))
        .with_events(tx);

    let result = submitter.retry_uploads(&id, &mut draft).await;
    drop(submitter);
    printer.await?;

    print_report(&result?);
    Ok(())
}
