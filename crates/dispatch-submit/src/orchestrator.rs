//! Two-phase submission: persist the order, then upload its images

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use dispatch_core::{Catalog, ImageTransport, OrderDraft, OrderId, OrderStore};
use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::progress::{PERSIST_SHARE, overall_progress};
use crate::{
    CancelFlag, ImageStatus, Result, SubmitError, SubmitEvent, SubmitState, UploadFailure,
    UploadQueue, UploadResult, UploadTask, UploadedRecord,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitOutcome {
    Success,
    /// The order is stored but some images were not
    SucceededWithWarnings,
}

/// What happened to a submission that got past persistence
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionReport {
    pub order_id: OrderId,
    pub outcome: SubmitOutcome,
    pub uploaded: Vec<UploadedRecord>,
    pub failures: Vec<UploadFailure>,
    /// Images left in the queue after cancellation
    pub skipped: usize,
    pub cancelled: bool,
    /// Set when the uploaded URLs could not be written back to the order
    pub url_sync_error: Option<String>,
}

impl SubmissionReport {
    pub fn uploaded_count(&self) -> usize {
        self.uploaded.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failures.len()
    }

    pub fn has_warnings(&self) -> bool {
        self.outcome == SubmitOutcome::SucceededWithWarnings
    }
}

pub struct Submitter {
    store: Arc<dyn OrderStore>,
    transport: Arc<dyn ImageTransport>,
    catalog: Option<Catalog>,
    cancel: CancelFlag,
    events: Option<UnboundedSender<SubmitEvent>>,
    state: SubmitState,
}

impl Submitter {
    pub fn new(store: Arc<dyn OrderStore>, transport: Arc<dyn ImageTransport>) -> Self {
        Self {
            store,
            transport,
            catalog: None,
            cancel: CancelFlag::new(),
            events: None,
            state: SubmitState::Idle,
        }
    }

    pub fn with_events(mut self, events: UnboundedSender<SubmitEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Also check type and logistics company ids against `catalog`
    pub fn with_catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn state(&self) -> SubmitState {
        self.state
    }

    /// Validate, persist and upload.
    ///
    /// With `existing` set the stored order is overwritten, provided it is
    /// still editable. Errors mean no order was created or updated.
    pub async fn submit(
        &mut self,
        draft: &mut OrderDraft,
        existing: Option<&OrderId>,
    ) -> Result<SubmissionReport> {
        self.set_state(SubmitState::Validating);
        let violations = match &self.catalog {
            Some(catalog) => draft.validate_with_catalog(catalog),
            None => draft.validate(),
        };
        if !violations.is_empty() {
            debug!(count = violations.len(), "draft rejected by validation");
            self.set_state(SubmitState::Failed);
            return Err(SubmitError::Validation(violations));
        }

        self.set_state(SubmitState::Persisting);
        let order_id = match self.persist(draft, existing).await {
            Ok(id) => id,
            Err(err) => {
                warn!("submission failed: {err}");
                self.set_state(SubmitState::Failed);
                return Err(err);
            }
        };
        info!(order_id = %order_id, "order persisted");
        self.emit(SubmitEvent::Progress {
            percent: PERSIST_SHARE,
        });

        Ok(self.upload_all(order_id, draft).await)
    }

    /// Upload whatever is still pending for an order that already exists.
    ///
    /// The order must still be editable since the uploaded URLs are written
    /// back into its payload.
    pub async fn retry_uploads(
        &mut self,
        order_id: &OrderId,
        draft: &mut OrderDraft,
    ) -> Result<SubmissionReport> {
        let stored = self
            .store
            .get_order(order_id)
            .await
            .map_err(SubmitError::PersistenceFailed)?
            .ok_or_else(|| SubmitError::OrderNotFound(order_id.clone()))?;
        if !stored.status.is_editable() {
            return Err(SubmitError::NotEditable {
                id: order_id.clone(),
                status: stored.status,
            });
        }
        info!(order_id = %order_id, "retrying pending uploads");
        Ok(self.upload_all(order_id.clone(), draft).await)
    }

    async fn persist(&self, draft: &OrderDraft, existing: Option<&OrderId>) -> Result<OrderId> {
        let payload = draft.to_payload();
        let Some(id) = existing else {
            return self
                .store
                .create_order(&payload)
                .await
                .map_err(SubmitError::PersistenceFailed);
        };

        let stored = self
            .store
            .get_order(id)
            .await
            .map_err(SubmitError::PersistenceFailed)?
            .ok_or_else(|| SubmitError::OrderNotFound(id.clone()))?;
        if !stored.status.is_editable() {
            return Err(SubmitError::NotEditable {
                id: id.clone(),
                status: stored.status,
            });
        }
        self.store
            .update_order(id, &payload)
            .await
            .map_err(SubmitError::PersistenceFailed)?;
        Ok(id.clone())
    }

    async fn upload_all(&mut self, order_id: OrderId, draft: &mut OrderDraft) -> SubmissionReport {
        let mut queue = UploadQueue::new(draft.pending_uploads().into_iter().map(UploadTask::from));
        let total = queue.total();
        debug!(order_id = %order_id, total, "starting uploads");

        for task in queue.pending() {
            self.emit(SubmitEvent::Image {
                item_index: task.item_index,
                image_index: task.image_index,
                file_name: task.file_name(),
                status: ImageStatus::Pending,
                progress: 0,
            });
        }
        self.set_state(SubmitState::Uploading { done: 0, total });
        let mut cancelled = false;

        while let Some(task) = queue.next_task() {
            if self.cancel.is_cancelled() {
                info!(order_id = %order_id, "upload queue cancelled");
                cancelled = true;
                queue.record(UploadResult::Skipped { task });
                queue.skip_remaining();
                break;
            }

            let done = queue.done();
            let result = self.upload_one(&order_id, task, done, total).await;
            if let UploadResult::Uploaded { task, url } = &result {
                draft.mark_uploaded(task.item_id, task.image.path(), url);
            }
            queue.record(result);

            let done = queue.done();
            self.set_state(SubmitState::Uploading { done, total });
            self.emit(SubmitEvent::Progress {
                percent: overall_progress(done, total, 0),
            });
        }

        let report = self.finish(order_id, draft, queue.into_results(), cancelled).await;
        self.set_state(match report.outcome {
            SubmitOutcome::Success => SubmitState::Done,
            SubmitOutcome::SucceededWithWarnings => SubmitState::DoneWithWarnings,
        });
        self.emit(SubmitEvent::Progress { percent: 100.0 });
        report
    }

    async fn upload_one(
        &self,
        order_id: &OrderId,
        task: UploadTask,
        done: usize,
        total: usize,
    ) -> UploadResult {
        let file_name = task.file_name();
        let (item_index, image_index) = (task.item_index, task.image_index);
        self.emit(SubmitEvent::Image {
            item_index,
            image_index,
            file_name: file_name.clone(),
            status: ImageStatus::Uploading,
            progress: 0,
        });

        let last = AtomicU8::new(0);
        let events = self.events.clone();
        let on_progress = |pct: u8| {
            let pct = pct.min(100);
            if last.fetch_max(pct, Ordering::Relaxed) >= pct {
                return;
            }
            if let Some(tx) = &events {
                let _ = tx.send(SubmitEvent::Image {
                    item_index,
                    image_index,
                    file_name: file_name.clone(),
                    status: ImageStatus::Uploading,
                    progress: pct,
                });
                let _ = tx.send(SubmitEvent::Progress {
                    percent: overall_progress(done, total, pct),
                });
            }
        };

        let outcome = self
            .transport
            .upload_item_image(order_id, item_index, &task.image, &on_progress)
            .await;

        match outcome {
            Ok(uploaded) => {
                debug!(item_index, image_index, url = %uploaded.url, "image uploaded");
                self.emit(SubmitEvent::Image {
                    item_index,
                    image_index,
                    file_name,
                    status: ImageStatus::Success,
                    progress: 100,
                });
                UploadResult::Uploaded {
                    task,
                    url: uploaded.url,
                }
            }
            Err(err) => {
                warn!(item_index, image_index, file = %file_name, "image upload failed: {err:#}");
                self.emit(SubmitEvent::Image {
                    item_index,
                    image_index,
                    file_name,
                    status: ImageStatus::Error,
                    progress: last.load(Ordering::Relaxed),
                });
                UploadResult::Failed {
                    task,
                    reason: format!("{err:#}"),
                }
            }
        }
    }

    async fn finish(
        &self,
        order_id: OrderId,
        draft: &OrderDraft,
        results: Vec<UploadResult>,
        cancelled: bool,
    ) -> SubmissionReport {
        let mut uploaded = Vec::new();
        let mut failures = Vec::new();
        let mut skipped = 0;
        for result in results {
            match result {
                UploadResult::Uploaded { task, url } => uploaded.push(UploadedRecord {
                    item_index: task.item_index,
                    image_index: task.image_index,
                    file_name: task.file_name(),
                    url,
                }),
                UploadResult::Failed { task, reason } => failures.push(UploadFailure {
                    item_index: task.item_index,
                    image_index: task.image_index,
                    file_name: task.file_name(),
                    reason,
                }),
                UploadResult::Skipped { .. } => skipped += 1,
            }
        }

        let mut url_sync_error = None;
        if !uploaded.is_empty() {
            if let Err(err) = self.store.update_order(&order_id, &draft.to_payload()).await {
                warn!(order_id = %order_id, "failed to record uploaded image urls: {err:#}");
                url_sync_error = Some(format!("{err:#}"));
            }
        }

        let outcome = if failures.is_empty() && skipped == 0 && url_sync_error.is_none() {
            SubmitOutcome::Success
        } else {
            SubmitOutcome::SucceededWithWarnings
        };
        info!(
            order_id = %order_id,
            uploaded = uploaded.len(),
            failed = failures.len(),
            skipped,
            "submission finished"
        );

        SubmissionReport {
            order_id,
            outcome,
            uploaded,
            failures,
            skipped,
            cancelled,
            url_sync_error,
        }
    }

    fn set_state(&mut self, state: SubmitState) {
        self.state = state;
        self.emit(SubmitEvent::State { state });
    }

    fn emit(&self, event: SubmitEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }
}
