//! Error types for dispatch-submit

use dispatch_core::{OrderId, OrderStatus, Violation};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SubmitError>;

/// Reasons a submission produced no persisted order.
///
/// Image upload failures are not errors; they are reported in the
/// submission report because the order is already stored by then.
#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("Order has {} violation(s)", .0.len())]
    Validation(Vec<Violation>),

    #[error("Failed to persist order: {0:#}")]
    PersistenceFailed(anyhow::Error),

    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    #[error("Order {id} in status {status} cannot be edited")]
    NotEditable { id: OrderId, status: OrderStatus },
}

impl SubmitError {
    /// Whether the whole submission may simply be attempted again
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::PersistenceFailed(_))
    }

    pub fn violations(&self) -> &[Violation] {
        match self {
            Self::Validation(violations) => violations,
            _ => &[],
        }
    }
}
