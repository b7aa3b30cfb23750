//! Contracts for the collaborators a submission talks to

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{OrderId, OrderPayload, PendingImage, PersistedOrder};

/// Result of a successful image upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedImage {
    pub url: String,
}

/// Durable order storage
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persist a new order and return its id
    async fn create_order(&self, payload: &OrderPayload) -> anyhow::Result<OrderId>;

    /// Overwrite an existing order's payload
    async fn update_order(&self, id: &OrderId, payload: &OrderPayload) -> anyhow::Result<()>;

    /// Fetch an order, `None` when it does not exist
    async fn get_order(&self, id: &OrderId) -> anyhow::Result<Option<PersistedOrder>>;
}

/// Transport for item photos
#[async_trait]
pub trait ImageTransport: Send + Sync {
    /// Upload one image of the item at `item_index`.
    ///
    /// Implementations report `on_progress` from 0 to 100 without going
    /// backwards and resolve exactly once.
    async fn upload_item_image(
        &self,
        order_id: &OrderId,
        item_index: usize,
        image: &PendingImage,
        on_progress: &(dyn Fn(u8) + Send + Sync),
    ) -> anyhow::Result<UploadedImage>;
}
