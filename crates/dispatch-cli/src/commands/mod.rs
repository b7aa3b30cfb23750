pub mod orders;
pub mod retry;
pub mod submit;
pub mod validate;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dispatch_config::Config;
use dispatch_core::{Catalog, ImageRef, OrderDraft, PersistedOrder};
use dispatch_storage::BlobStore;
use dispatch_storage::db::data_dir;
use dispatch_submit::{ImageStatus, SubmissionReport, SubmitEvent, SubmitOutcome};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

use crate::draft_file::DraftFile;

/// Load a draft file; image paths are relative to the file's directory
pub fn load_draft(path: &Path) -> Result<OrderDraft> {
    let base_dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    DraftFile::load(path)?.into_draft(base_dir)
}

pub fn load_catalog(config: &Config) -> Result<Option<Catalog>> {
    let Some(path) = &config.catalog.path else {
        return Ok(None);
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read catalog {}", path.display()))?;
    let catalog = toml::from_str(&content)
        .with_context(|| format!("Invalid catalog {}", path.display()))?;
    Ok(Some(catalog))
}

pub fn blob_store(config: &Config) -> Result<BlobStore> {
    let root = config
        .storage
        .blob_root
        .clone()
        .unwrap_or_else(|| data_dir().join("blobs"));
    Ok(BlobStore::new(root)?
        .with_chunk_size(config.upload.chunk_size)
        .with_max_bytes(config.upload.max_image_bytes))
}

/// Treat pending images whose content the stored order already references
/// as uploaded. Returns how many were skipped.
pub fn skip_uploaded(draft: &mut OrderDraft, stored: &PersistedOrder) -> usize {
    let mut matches: Vec<(usize, PathBuf, String)> = Vec::new();
    for (index, stored_item) in stored.payload.items.iter().enumerate() {
        for image in draft.items().images_at(index) {
            let ImageRef::Pending(pending) = image else {
                continue;
            };
            let Ok(content) = std::fs::read(pending.path()) else {
                continue;
            };
            let url = BlobStore::url_for_content(&content);
            if stored_item.images.contains(&url) {
                matches.push((index, pending.path().to_path_buf(), url));
            }
        }
    }

    let mut skipped = 0;
    for (index, path, url) in matches {
        let Some(id) = draft.items().id_at(index) else {
            continue;
        };
        if draft.mark_uploaded(id, &path, &url) {
            skipped += 1;
        }
    }
    skipped
}

/// Print upload events as they arrive
pub fn spawn_progress_printer(mut rx: UnboundedReceiver<SubmitEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if let SubmitEvent::Image {
                item_index,
                file_name,
                status,
                ..
            } = event
            {
                match status {
                    ImageStatus::Success => println!("  ✓ item {item_index}: {file_name}"),
                    ImageStatus::Error => println!("  ✗ item {item_index}: {file_name}"),
                    ImageStatus::Pending | ImageStatus::Uploading => {}
                }
            }
        }
    })
}

pub fn print_report(report: &SubmissionReport) {
    match report.outcome {
        SubmitOutcome::Success => println!("✓ Order {} submitted", report.order_id),
        SubmitOutcome::SucceededWithWarnings => {
            println!("! Order {} submitted with warnings", report.order_id)
        }
    }
    println!("  Images uploaded: {}", report.uploaded_count());

    if !report.failures.is_empty() {
        println!("  Images failed: {}", report.failed_count());
        for failure in &report.failures {
            println!(
                "    item {} {}: {}",
                failure.item_index, failure.file_name, failure.reason
            );
        }
    }
    if report.cancelled {
        println!("  Cancelled, {} image(s) not attempted", report.skipped);
    }
    if let Some(err) = &report.url_sync_error {
        println!("  Uploaded URLs were not saved: {err}");
    }
    if report.has_warnings() {
        println!(
            "  Run `dispatch retry {} <draft>` to upload the rest",
            report.order_id
        );
    }
}
