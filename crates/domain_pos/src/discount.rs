//! Discount primitives
//!
//! Discounts arrive either as a percentage of the line subtotal or as a raw
//! amount. Both are clamped, never rejected, by these helpers; policy checks
//! such as cashier caps live in checkout.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use core_kernel::round_amount;

/// Default clamps applied when no explicit cap is given
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountLimits {
    /// Upper bound for percentage discounts
    pub max_percent: Decimal,
    /// Upper bound for amount discounts (`None`: unbounded)
    pub max_amount: Option<Decimal>,
}

impl Default for DiscountLimits {
    fn default() -> Self {
        Self {
            max_percent: dec!(100),
            max_amount: None,
        }
    }
}

impl DiscountLimits {
    pub fn cap_for(&self, as_percent: bool) -> Option<Decimal> {
        if as_percent {
            Some(self.max_percent)
        } else {
            self.max_amount
        }
    }

    /// Clamps `value` to `[0, cap]` using these limits
    pub fn sanitize(&self, value: Decimal, as_percent: bool) -> Decimal {
        clamp(value, self.cap_for(as_percent))
    }
}

fn clamp(value: Decimal, cap: Option<Decimal>) -> Decimal {
    let value = value.max(Decimal::ZERO);
    match cap {
        Some(cap) => value.min(cap.max(Decimal::ZERO)),
        None => value,
    }
}

/// Clamps a discount to `[0, cap]`
///
/// Negative values become zero. Without an explicit cap, percentages are
/// capped at 100 and amounts are unbounded.
pub fn sanitize_discount(value: Decimal, as_percent: bool, cap: Option<Decimal>) -> Decimal {
    let cap = cap.or_else(|| DiscountLimits::default().cap_for(as_percent));
    clamp(value, cap)
}

/// Amounts of one priced line before tax
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineAmounts {
    /// `qty × price`
    pub subtotal: Decimal,
    /// Discount amount, clamped to `[0, subtotal]` and rounded to cents
    pub discount: Decimal,
    /// `subtotal − discount`, rounded to cents
    pub total: Decimal,
}

/// Prices a line: subtotal, effective discount amount and discounted total
pub fn line_total(qty: Decimal, price: Decimal, discount: Decimal, as_percent: bool) -> LineAmounts {
    let subtotal = qty * price;
    let raw = if as_percent {
        subtotal * discount / dec!(100)
    } else {
        discount
    };
    let discount = round_amount(raw.max(Decimal::ZERO).min(subtotal.max(Decimal::ZERO)), 2);

    LineAmounts {
        subtotal,
        discount,
        total: round_amount(subtotal - discount, 2),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_clamps_percentages() {
        assert_eq!(sanitize_discount(dec!(150), true, None), dec!(100));
        assert_eq!(sanitize_discount(dec!(-5), true, None), dec!(0));
        assert_eq!(sanitize_discount(dec!(30), true, Some(dec!(20))), dec!(20));
    }

    #[test]
    fn test_sanitize_amounts_unbounded_by_default() {
        assert_eq!(sanitize_discount(dec!(5000), false, None), dec!(5000));
        let limits = DiscountLimits { max_percent: dec!(50), max_amount: Some(dec!(25)) };
        assert_eq!(limits.sanitize(dec!(40), false), dec!(25));
        assert_eq!(limits.sanitize(dec!(60), true), dec!(50));
    }

    #[test]
    fn test_line_total_percent() {
        let line = line_total(dec!(2), dec!(10), dec!(10), true);
        assert_eq!(line.subtotal, dec!(20));
        assert_eq!(line.discount, dec!(2));
        assert_eq!(line.total, dec!(18));
    }

    #[test]
    fn test_line_total_discount_never_exceeds_subtotal() {
        let line = line_total(dec!(1), dec!(10), dec!(25), false);
        assert_eq!(line.discount, dec!(10));
        assert_eq!(line.total, dec!(0));
    }

    #[test]
    fn test_line_total_rounds_half_away_from_zero() {
        // 3 × 3.35 = 10.05; 5% = 0.5025 → 0.50; total 9.55
        let line = line_total(dec!(3), dec!(3.35), dec!(5), true);
        assert_eq!(line.discount, dec!(0.50));
        assert_eq!(line.total, dec!(9.55));
        // 0.125 rounds up, not to even
        assert_eq!(line_total(dec!(1), dec!(0.125), dec!(0), false).total, dec!(0.13));
    }
}
