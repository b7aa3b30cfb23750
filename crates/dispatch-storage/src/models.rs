use dispatch_core::{OrderId, OrderPayload, OrderStatus, PersistedOrder};
use sqlx::FromRow;
use time::OffsetDateTime;

use crate::{Result, StorageError};

/// A row from the `orders` table
#[derive(Debug, Clone, FromRow)]
pub struct OrderRow {
    pub id: String,
    pub status: String,
    pub payload: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl OrderRow {
    pub fn into_order(self) -> Result<PersistedOrder> {
        let invalid = |reason: String| StorageError::InvalidRow {
            id: self.id.clone(),
            reason,
        };
        let status: OrderStatus = self.status.parse().map_err(invalid)?;
        let payload: OrderPayload = serde_json::from_str(&self.payload)?;
        let created_at = timestamp(self.created_at).map_err(invalid)?;
        let updated_at = timestamp(self.updated_at).map_err(invalid)?;
        Ok(PersistedOrder {
            id: OrderId::new(self.id),
            status,
            payload,
            created_at,
            updated_at,
        })
    }
}

fn timestamp(secs: i64) -> std::result::Result<OffsetDateTime, String> {
    OffsetDateTime::from_unix_timestamp(secs).map_err(|e| e.to_string())
}
