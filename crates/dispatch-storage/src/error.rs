//! Error types for dispatch-storage

use dispatch_core::OrderId;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    #[error("Invalid row for order {id}: {reason}")]
    InvalidRow { id: String, reason: String },

    #[error("Blob not found: {0}")]
    BlobNotFound(String),

    #[error("Image {path} is {size} bytes, limit is {limit}")]
    ImageTooLarge { path: String, size: u64, limit: u64 },
}
