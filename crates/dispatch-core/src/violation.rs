//! Submission-time validation findings

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

/// One problem that blocks submission.
///
/// Validation collects every violation in one pass instead of stopping at
/// the first.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    #[error("Order has no line items")]
    NoLineItems,

    #[error("Logistics company is required")]
    LogisticsCompanyRequired,

    #[error("Unknown logistics company: {id}")]
    UnknownLogisticsCompany { id: String },

    #[error("Item {item_index} ({name}): unknown product type {type_id}")]
    UnknownProductType {
        item_index: usize,
        name: String,
        type_id: String,
    },

    #[error("Number of boxes is required ({field})")]
    BoxCountRequired { field: String },

    #[error("Item {item_index} ({name}): packets hold {allocated} of {declared} units, {}", mismatch_text(.declared, .allocated))]
    QuantityMismatch {
        item_index: usize,
        name: String,
        declared: u32,
        allocated: u64,
    },

    #[error("Discount percentage {value} is outside 0-100")]
    DiscountOutOfRange { value: Decimal },

    #[error("Discount {amount} exceeds the order total; maximum is {ceiling}")]
    DiscountExceedsTotal { amount: Decimal, ceiling: Decimal },
}

impl Violation {
    /// Path of the draft field the user has to fix
    pub fn field(&self) -> String {
        match self {
            Self::NoLineItems => "items".to_string(),
            Self::LogisticsCompanyRequired | Self::UnknownLogisticsCompany { .. } => {
                "logistics_company_id".to_string()
            }
            Self::UnknownProductType { item_index, .. } => format!("items[{item_index}].type_id"),
            Self::BoxCountRequired { field } => field.clone(),
            Self::QuantityMismatch { item_index, .. } => format!("items[{item_index}].packets"),
            Self::DiscountOutOfRange { .. } | Self::DiscountExceedsTotal { .. } => {
                "discount".to_string()
            }
        }
    }

    /// Units still to allocate; negative when packets hold too many
    pub fn deficit(&self) -> Option<i64> {
        match self {
            Self::QuantityMismatch {
                declared,
                allocated,
                ..
            } => Some(i64::from(*declared) - *allocated as i64),
            _ => None,
        }
    }
}

fn mismatch_text(declared: &u32, allocated: &u64) -> String {
    let (declared, allocated) = (u64::from(*declared), *allocated);
    if allocated < declared {
        format!("deficit of {}", declared - allocated)
    } else {
        format!("surplus of {}", allocated - declared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mismatch_message_reports_deficit() {
        let violation = Violation::QuantityMismatch {
            item_index: 0,
            name: "Polo".to_string(),
            declared: 10,
            allocated: 7,
        };
        assert!(violation.to_string().contains("deficit of 3"));
        assert_eq!(violation.deficit(), Some(3));
        assert_eq!(violation.field(), "items[0].packets");
    }

    #[test]
    fn test_discount_message_reports_ceiling() {
        let violation = Violation::DiscountExceedsTotal {
            amount: Decimal::from(1200),
            ceiling: Decimal::from(1000),
        };
        assert!(violation.to_string().contains("maximum is 1000"));
    }

    #[test]
    fn test_every_violation_serializes_with_kind() {
        let violations = vec![
            Violation::NoLineItems,
            Violation::LogisticsCompanyRequired,
            Violation::UnknownLogisticsCompany {
                id: "lc-9".to_string(),
            },
            Violation::UnknownProductType {
                item_index: 0,
                name: "Polo".to_string(),
                type_id: "t-1".to_string(),
            },
            Violation::BoxCountRequired {
                field: "number_of_boxes".to_string(),
            },
            Violation::QuantityMismatch {
                item_index: 1,
                name: "Tee".to_string(),
                declared: 5,
                allocated: 6,
            },
            Violation::DiscountOutOfRange {
                value: Decimal::from(120),
            },
            Violation::DiscountExceedsTotal {
                amount: Decimal::from(1200),
                ceiling: Decimal::from(1000),
            },
        ];

        for violation in &violations {
            let value = serde_json::to_value(violation).unwrap();
            assert!(value["kind"].is_string(), "{violation:?} has no kind");
        }

        let value = serde_json::to_value(&violations[2]).unwrap();
        assert_eq!(value["kind"], "unknown_logistics_company");
        assert_eq!(value["id"], "lc-9");
        assert!(serde_json::to_string_pretty(&violations).is_ok());
    }
}
