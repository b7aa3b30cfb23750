//! Pricing and discount calculation
//!
//! Everything here is derived on demand from the current items and the
//! discount input; nothing is cached, so a quantity or price edit is
//! reflected by the next call.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::{LineItem, Violation};

/// Round a monetary amount to cents, halves away from zero
pub fn round2(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

pub fn line_subtotal(item: &LineItem) -> Decimal {
    round2(item.unit_cost * Decimal::from(item.quantity))
}

pub fn grand_total<'a>(items: impl IntoIterator<Item = &'a LineItem>) -> Decimal {
    items.into_iter().map(line_subtotal).sum()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    Percent,
    #[default]
    Amount,
}

/// Discount as the user entered it.
///
/// Both the kind and the raw value are persisted so an edited order comes
/// back exactly as it was entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Discount {
    pub kind: DiscountKind,
    pub value: Decimal,
}

impl Discount {
    pub fn percent(value: Decimal) -> Self {
        Self {
            kind: DiscountKind::Percent,
            value,
        }
    }

    pub fn amount(value: Decimal) -> Self {
        Self {
            kind: DiscountKind::Amount,
            value,
        }
    }

    /// Unclamped discount amount for `grand_total`
    pub fn raw_amount(&self, grand_total: Decimal) -> Decimal {
        match self.kind {
            DiscountKind::Percent => round2(grand_total * self.value / Decimal::ONE_HUNDRED),
            DiscountKind::Amount => round2(self.value),
        }
    }

    /// Discount amount clamped to `0..=grand_total`
    pub fn computed_amount(&self, grand_total: Decimal) -> Decimal {
        self.raw_amount(grand_total)
            .max(Decimal::ZERO)
            .min(grand_total.max(Decimal::ZERO))
    }

    /// Check the discount against the order total
    pub fn validate(&self, grand_total: Decimal) -> Option<Violation> {
        if self.value.is_sign_negative() && !self.value.is_zero() {
            return Some(Violation::DiscountOutOfRange { value: self.value });
        }
        if self.kind == DiscountKind::Percent && self.value > Decimal::ONE_HUNDRED {
            return Some(Violation::DiscountOutOfRange { value: self.value });
        }
        let amount = self.raw_amount(grand_total);
        if amount > grand_total {
            return Some(Violation::DiscountExceedsTotal {
                amount,
                ceiling: grand_total,
            });
        }
        None
    }
}

/// Order-level money figures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingSummary {
    pub grand_total: Decimal,
    pub discount_amount: Decimal,
    pub final_amount: Decimal,
}

impl PricingSummary {
    pub fn compute<'a>(items: impl IntoIterator<Item = &'a LineItem>, discount: &Discount) -> Self {
        let grand_total = grand_total(items);
        let discount_amount = discount.computed_amount(grand_total);
        Self {
            grand_total,
            discount_amount,
            final_amount: grand_total - discount_amount,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(unit_cost: Decimal, quantity: u32) -> LineItem {
        LineItem::new("Polo", "P-1", "shirts", unit_cost, quantity)
    }

    #[test]
    fn test_line_subtotal_rounds_half_up() {
        // 0.125 * 3 = 0.375 -> 0.38
        let line = item(Decimal::new(125, 3), 3);
        assert_eq!(line_subtotal(&line), Decimal::new(38, 2));
    }

    #[test]
    fn test_grand_total_sums_lines() {
        let items = vec![item(Decimal::new(1050, 2), 2), item(Decimal::from(3), 5)];
        assert_eq!(grand_total(&items), Decimal::from(36));
    }

    #[test]
    fn test_percent_over_hundred_is_out_of_range() {
        let discount = Discount::percent(Decimal::from(150));
        assert_eq!(
            discount.validate(Decimal::from(1000)),
            Some(Violation::DiscountOutOfRange {
                value: Decimal::from(150)
            })
        );
    }

    #[test]
    fn test_half_percent_discount() {
        let discount = Discount::percent(Decimal::from(50));
        assert_eq!(discount.validate(Decimal::from(1000)), None);
        assert_eq!(discount.computed_amount(Decimal::from(1000)), Decimal::from(500));
    }

    #[test]
    fn test_amount_above_total_reports_ceiling() {
        let discount = Discount::amount(Decimal::from(1200));
        assert_eq!(
            discount.validate(Decimal::from(1000)),
            Some(Violation::DiscountExceedsTotal {
                amount: Decimal::from(1200),
                ceiling: Decimal::from(1000),
            })
        );
        assert_eq!(discount.computed_amount(Decimal::from(1000)), Decimal::from(1000));
    }

    #[test]
    fn test_negative_discount_is_out_of_range() {
        let discount = Discount::amount(Decimal::from(-5));
        assert!(matches!(
            discount.validate(Decimal::from(100)),
            Some(Violation::DiscountOutOfRange { .. })
        ));
        assert_eq!(discount.computed_amount(Decimal::from(100)), Decimal::ZERO);
    }

    #[test]
    fn test_summary_follows_quantity_changes() {
        let mut items = vec![item(Decimal::from(10), 10)];
        let discount = Discount::percent(Decimal::from(10));
        let before = PricingSummary::compute(&items, &discount);
        assert_eq!(before.final_amount, Decimal::from(90));

        items[0].quantity = 20;
        let after = PricingSummary::compute(&items, &discount);
        assert_eq!(after.grand_total, Decimal::from(200));
        assert_eq!(after.discount_amount, Decimal::from(20));
        assert_eq!(after.final_amount, Decimal::from(180));
    }
}
