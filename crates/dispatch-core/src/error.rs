use thiserror::Error;

use crate::order::OrderStatus;

/// Errors raised synchronously by draft mutations.
///
/// A call that returns one of these has left the draft untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Allocation exceeded: {requested} units allocated but the item quantity is {declared}")]
    AllocationExceeded { declared: u32, requested: u64 },

    #[error("Quantity mismatch: packets hold {allocated} of {declared} units")]
    QuantityMismatch { declared: u32, allocated: u64 },

    #[error("Line item not found at index {0}")]
    ItemNotFound(usize),

    #[error("Packet not found at index {0}")]
    PacketNotFound(usize),

    #[error("Image not found at index {0}")]
    ImageNotFound(usize),

    #[error("Line item {0} has no packet configuration")]
    NoPacketConfiguration(usize),

    #[error("Cannot remove the last packet")]
    LastPacket,

    #[error("Loose mode holds exactly one packet")]
    LoosePoolIsSingular,

    #[error("Unknown color: {0}")]
    UnknownColor(String),

    #[error("Unknown size: {0}")]
    UnknownSize(String),

    #[error("Quantity must be greater than zero")]
    InvalidQuantity,

    #[error("Order in status {0} cannot be edited")]
    NotEditable(OrderStatus),
}

pub type Result<T> = std::result::Result<T, CoreError>;
