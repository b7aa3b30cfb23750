//! Persisted order model

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{CompositionEntry, Discount, PacketMode};

time::serde::format_description!(pub iso_date, Date, "[year]-[month]-[day]");

/// Identifier assigned by the order store
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl OrderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Approved,
    Dispatched,
    Received,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Dispatched => "dispatched",
            Self::Received => "received",
            Self::Cancelled => "cancelled",
        }
    }

    /// Only orders nobody has acted on yet may be changed
    pub fn is_editable(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "dispatched" => Ok(Self::Dispatched),
            "received" => Ok(Self::Received),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("unknown order status: {other}")),
        }
    }
}

/// Packet configuration as stored: sparse compositions per packet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketPayload {
    pub mode: PacketMode,
    pub packets: Vec<Vec<CompositionEntry>>,
}

/// Stored form of a line item. Carries no local files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemPayload {
    pub name: String,
    pub code: String,
    pub type_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    pub unit_cost: Decimal,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub sizes: Vec<String>,
    pub quantity: u32,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packets: Option<PacketPayload>,
}

/// What the order store receives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPayload {
    #[serde(with = "iso_date")]
    pub date: Date,
    pub logistics_company_id: Option<String>,
    pub items: Vec<ItemPayload>,
    pub box_count: u32,
    pub discount: Discount,
    pub grand_total: Decimal,
    pub discount_amount: Decimal,
    pub final_amount: Decimal,
}

/// An order as returned by the order store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedOrder {
    pub id: OrderId,
    pub status: OrderStatus,
    pub payload: OrderPayload,
    #[serde(with = "time::serde::timestamp")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::timestamp")]
    pub updated_at: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parsing() {
        assert_eq!("Pending".parse::<OrderStatus>(), Ok(OrderStatus::Pending));
        assert_eq!(
            "dispatched".parse::<OrderStatus>(),
            Ok(OrderStatus::Dispatched)
        );
        assert!("lost".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_only_pending_is_editable() {
        assert!(OrderStatus::Pending.is_editable());
        assert!(!OrderStatus::Approved.is_editable());
        assert!(!OrderStatus::Cancelled.is_editable());
    }

    #[test]
    fn test_payload_date_format() {
        let payload = OrderPayload {
            date: Date::from_calendar_date(2026, time::Month::March, 4).unwrap(),
            logistics_company_id: None,
            items: Vec::new(),
            box_count: 0,
            discount: Discount::default(),
            grand_total: Decimal::ZERO,
            discount_amount: Decimal::ZERO,
            final_amount: Decimal::ZERO,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["date"], "2026-03-04");
    }
}
