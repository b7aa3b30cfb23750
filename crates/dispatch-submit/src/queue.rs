//! Upload queue processed by a single worker
//!
//! Each task ends in exactly one tagged result; a failure is recorded and
//! the queue moves on.

use std::collections::VecDeque;

use dispatch_core::{ItemId, PendingImage, PendingUpload};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTask {
    pub item_id: ItemId,
    pub item_index: usize,
    pub image_index: usize,
    pub image: PendingImage,
}

impl UploadTask {
    pub fn file_name(&self) -> String {
        self.image.file_name()
    }
}

impl From<PendingUpload> for UploadTask {
    fn from(upload: PendingUpload) -> Self {
        Self {
            item_id: upload.item_id,
            item_index: upload.item_index,
            image_index: upload.image_index,
            image: upload.image,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadedRecord {
    pub item_index: usize,
    pub image_index: usize,
    pub file_name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadFailure {
    pub item_index: usize,
    pub image_index: usize,
    pub file_name: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadResult {
    Uploaded { task: UploadTask, url: String },
    Failed { task: UploadTask, reason: String },
    Skipped { task: UploadTask },
}

/// FIFO of pending uploads plus the results recorded so far
#[derive(Debug, Default)]
pub struct UploadQueue {
    tasks: VecDeque<UploadTask>,
    results: Vec<UploadResult>,
    total: usize,
}

impl UploadQueue {
    pub fn new(tasks: impl IntoIterator<Item = UploadTask>) -> Self {
        let tasks: VecDeque<UploadTask> = tasks.into_iter().collect();
        Self {
            total: tasks.len(),
            tasks,
            results: Vec::new(),
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Tasks that reached a result
    pub fn done(&self) -> usize {
        self.results.len()
    }

    /// Tasks not yet taken, in upload order
    pub fn pending(&self) -> impl Iterator<Item = &UploadTask> {
        self.tasks.iter()
    }

    pub fn next_task(&mut self) -> Option<UploadTask> {
        self.tasks.pop_front()
    }

    pub fn record(&mut self, result: UploadResult) {
        self.results.push(result);
    }

    /// Mark everything still queued as skipped
    pub fn skip_remaining(&mut self) {
        while let Some(task) = self.tasks.pop_front() {
            self.results.push(UploadResult::Skipped { task });
        }
    }

    pub fn into_results(self) -> Vec<UploadResult> {
        self.results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dispatch_core::{LineItem, LineItemRegistry};
    use rust_decimal::Decimal;

    fn task(image_index: usize) -> UploadTask {
        let mut registry = LineItemRegistry::new();
        let item_id = registry
            .insert(LineItem::new("a", "a", "t", Decimal::ONE, 1))
            .unwrap();
        UploadTask {
            item_id,
            item_index: 0,
            image_index,
            image: PendingImage::new(format!("/tmp/{image_index}.jpg")),
        }
    }

    #[test]
    fn test_fifo_and_skip() {
        let mut queue = UploadQueue::new(vec![task(0), task(1), task(2)]);
        assert_eq!(queue.total(), 3);

        let first = queue.next_task().unwrap();
        assert_eq!(first.image_index, 0);
        queue.record(UploadResult::Uploaded {
            task: first,
            url: "u".into(),
        });
        queue.skip_remaining();

        assert_eq!(queue.done(), 3);
        let results = queue.into_results();
        assert!(matches!(results[2], UploadResult::Skipped { ref task } if task.image_index == 2));
    }
}
