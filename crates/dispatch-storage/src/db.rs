//! Database operations

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use dispatch_core::{OrderId, OrderPayload, OrderStatus, OrderStore, PersistedOrder};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use time::OffsetDateTime;
use tracing::{debug, info};

use crate::models::OrderRow;
use crate::{Result, StorageError};

const MIGRATIONS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS orders (
        id TEXT PRIMARY KEY NOT NULL,
        status TEXT NOT NULL,
        payload TEXT NOT NULL,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_orders_created_at ON orders (created_at)",
];

const SELECT_ORDER: &str = "SELECT id, status, payload, created_at, updated_at FROM orders";

/// Main storage interface
#[derive(Clone)]
pub struct Storage {
    pool: SqlitePool,
}

impl Storage {
    /// Open (or create) the database, defaulting to the platform data dir
    pub async fn new(db_path: Option<PathBuf>) -> Result<Self> {
        let path = db_path.unwrap_or_else(Self::default_db_path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        let storage = Self { pool };
        storage.migrate().await?;
        debug!(path = %path.display(), "opened order database");
        Ok(storage)
    }

    pub fn default_db_path() -> PathBuf {
        data_dir().join("dispatch.db")
    }

    async fn migrate(&self) -> Result<()> {
        for statement in MIGRATIONS {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Store a new order in `Pending` status
    pub async fn insert_order(&self, payload: &OrderPayload) -> Result<PersistedOrder> {
        let id = OrderId::new(uuid::Uuid::new_v4().to_string());
        let now = now();
        sqlx::query(
            "INSERT INTO orders (id, status, payload, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id.as_str())
        .bind(OrderStatus::Pending.as_str())
        .bind(serde_json::to_string(payload)?)
        .bind(now.unix_timestamp())
        .bind(now.unix_timestamp())
        .execute(&self.pool)
        .await?;

        info!(order_id = %id, items = payload.items.len(), "created order");
        Ok(PersistedOrder {
            id,
            status: OrderStatus::Pending,
            payload: payload.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn find_order(&self, id: &OrderId) -> Result<Option<PersistedOrder>> {
        let row: Option<OrderRow> = sqlx::query_as(&format!("{SELECT_ORDER} WHERE id = ?"))
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.map(OrderRow::into_order).transpose()
    }

    pub async fn order(&self, id: &OrderId) -> Result<PersistedOrder> {
        self.find_order(id)
            .await?
            .ok_or_else(|| StorageError::OrderNotFound(id.clone()))
    }

    /// Newest first
    pub async fn list_orders(&self) -> Result<Vec<PersistedOrder>> {
        let rows: Vec<OrderRow> =
            sqlx::query_as(&format!("{SELECT_ORDER} ORDER BY created_at DESC, id"))
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter().map(OrderRow::into_order).collect()
    }

    /// Overwrite the payload of an existing order
    pub async fn replace_payload(&self, id: &OrderId, payload: &OrderPayload) -> Result<()> {
        let result = sqlx::query("UPDATE orders SET payload = ?, updated_at = ? WHERE id = ?")
            .bind(serde_json::to_string(payload)?)
            .bind(now().unix_timestamp())
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::OrderNotFound(id.clone()));
        }
        debug!(order_id = %id, "updated order payload");
        Ok(())
    }

    pub async fn set_status(&self, id: &OrderId, status: OrderStatus) -> Result<()> {
        let result = sqlx::query("UPDATE orders SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(now().unix_timestamp())
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::OrderNotFound(id.clone()));
        }
        info!(order_id = %id, %status, "changed order status");
        Ok(())
    }

    pub async fn delete_order(&self, id: &OrderId) -> Result<()> {
        let result = sqlx::query("DELETE FROM orders WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::OrderNotFound(id.clone()));
        }
        Ok(())
    }
}

#[async_trait]
impl OrderStore for Storage {
    async fn create_order(&self, payload: &OrderPayload) -> anyhow::Result<OrderId> {
        Ok(self.insert_order(payload).await?.id)
    }

    async fn update_order(&self, id: &OrderId, payload: &OrderPayload) -> anyhow::Result<()> {
        Ok(self.replace_payload(id, payload).await?)
    }

    async fn get_order(&self, id: &OrderId) -> anyhow::Result<Option<PersistedOrder>> {
        Ok(self.find_order(id).await?)
    }
}

/// Platform data directory shared by the database and the blob store
pub fn data_dir() -> PathBuf {
    if let Some(dirs) = directories::ProjectDirs::from("com", "dispatch", "dispatch") {
        dirs.data_dir().to_path_buf()
    } else {
        Path::new("~/.dispatch").to_path_buf()
    }
}

// Whole seconds, matching what the table stores
fn now() -> OffsetDateTime {
    let now = OffsetDateTime::now_utc();
    now.replace_nanosecond(0).unwrap_or(now)
}
