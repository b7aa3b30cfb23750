//! Per-item image references

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// An image attached to a line item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImageRef {
    /// Already persisted
    Existing { url: String },
    /// Queued for upload on submit
    Pending(PendingImage),
}

impl ImageRef {
    pub fn existing(url: impl Into<String>) -> Self {
        Self::Existing { url: url.into() }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Existing { url } => Some(url),
            Self::Pending(_) => None,
        }
    }

    /// What a preview pane shows for this image
    pub fn preview_source(&self) -> String {
        match self {
            Self::Existing { url } => url.clone(),
            Self::Pending(pending) => pending.preview_source(),
        }
    }
}

/// A local file waiting to be uploaded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingImage {
    pub path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
}

impl PendingImage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            preview: None,
        }
    }

    pub fn with_preview(mut self, preview: impl Into<String>) -> Self {
        self.preview = Some(preview.into());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    fn preview_source(&self) -> String {
        self.preview
            .clone()
            .unwrap_or_else(|| format!("file://{}", self.path.display()))
    }
}
