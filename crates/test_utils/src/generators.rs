//! Property-Based Test Generators
//!
//! Provides proptest strategies for generating random test data
//! that maintains domain invariants.

use core_kernel::{AccountId, Currency};
use domain_ledger::{JournalLine, RetailChartOfAccounts};
use domain_pos::{CheckoutItem, PaymentInput, PaymentMethod};
use proptest::prelude::*;
use rust_decimal::Decimal;

use crate::fixtures::IdFixtures;

/// Strategy for generating valid Currency values
pub fn currency_strategy() -> impl Strategy<Value = Currency> {
    prop_oneof![
        Just(Currency::USD),
        Just(Currency::EUR),
        Just(Currency::GBP),
        Just(Currency::AED),
        Just(Currency::SAR),
        Just(Currency::EGP),
        Just(Currency::KWD),
        Just(Currency::JPY),
    ]
}

/// Strategy for positive two-decimal amounts (0.01 to 10,000.00)
pub fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy for generating valid Decimal values for percentages (0% to 100%)
pub fn percentage_strategy() -> impl Strategy<Value = Decimal> {
    (0u32..10000u32).prop_map(|n| Decimal::new(n as i64, 2))
}

/// Strategy for cart quantities, whole or to three decimals (weighed goods)
pub fn quantity_strategy() -> impl Strategy<Value = Decimal> {
    prop_oneof![
        (1i64..20i64).prop_map(Decimal::from),
        (1i64..20_000i64).prop_map(|n| Decimal::new(n, 3)),
    ]
}

/// Strategy for an account of the standard chart
pub fn account_strategy() -> impl Strategy<Value = AccountId> {
    prop_oneof![
        Just(RetailChartOfAccounts::CASH),
        Just(RetailChartOfAccounts::ACCOUNTS_RECEIVABLE),
        Just(RetailChartOfAccounts::INVENTORY),
        Just(RetailChartOfAccounts::ACCOUNTS_PAYABLE),
        Just(RetailChartOfAccounts::TAX_PAYABLE),
        Just(RetailChartOfAccounts::RETAINED_EARNINGS),
        Just(RetailChartOfAccounts::SALES_REVENUE),
        Just(RetailChartOfAccounts::SALARIES_EXPENSE),
    ]
}

/// Strategy for balanced journal lines
///
/// Each generated amount is booked once as a debit and once as a credit,
/// on independently chosen accounts.
pub fn balanced_lines_strategy() -> impl Strategy<Value = Vec<JournalLine>> {
    proptest::collection::vec(
        (account_strategy(), account_strategy(), amount_strategy()),
        1..6,
    )
    .prop_map(|postings| {
        postings
            .into_iter()
            .flat_map(|(debit, credit, amount)| {
                [JournalLine::debit(debit, amount), JournalLine::credit(credit, amount)]
            })
            .collect()
    })
}

/// Strategy for journal lines whose totals differ by at least 0.01
pub fn unbalanced_lines_strategy() -> impl Strategy<Value = Vec<JournalLine>> {
    (balanced_lines_strategy(), account_strategy(), amount_strategy()).prop_map(
        |(mut lines, account, skew)| {
            lines.push(JournalLine::debit(account, skew));
            lines
        },
    )
}

/// Strategy for a cart line over the fixture catalog, without overrides
pub fn checkout_item_strategy() -> impl Strategy<Value = CheckoutItem> {
    (
        prop_oneof![
            Just(IdFixtures::WIDGET),
            Just(IdFixtures::GADGET),
            Just(IdFixtures::GIFT_CARD),
        ],
        quantity_strategy(),
        prop::option::of((0u32..=2000u32).prop_map(|n| Decimal::new(n as i64, 2))),
    )
        .prop_map(|(product_id, qty, percent)| {
            let item = CheckoutItem::new(product_id, qty);
            match percent {
                Some(percent) => item.with_percent_discount(percent),
                None => item,
            }
        })
}

pub fn cart_strategy() -> impl Strategy<Value = Vec<CheckoutItem>> {
    proptest::collection::vec(checkout_item_strategy(), 1..8)
}

/// Strategy for a tendered payment in the sale currency
pub fn payment_strategy() -> impl Strategy<Value = PaymentInput> {
    (
        prop_oneof![
            Just(PaymentMethod::Cash),
            Just(PaymentMethod::Card),
            Just(PaymentMethod::Wallet),
        ],
        amount_strategy(),
    )
        .prop_map(|(method, amount)| PaymentInput::new(method, amount))
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_ledger::totals;

    proptest! {
        #[test]
        fn balanced_lines_have_equal_totals(lines in balanced_lines_strategy()) {
            let (debits, credits) = totals(&lines);
            prop_assert_eq!(debits, credits);
        }

        #[test]
        fn unbalanced_lines_differ_by_at_least_a_cent(lines in unbalanced_lines_strategy()) {
            let (debits, credits) = totals(&lines);
            prop_assert!((debits - credits).abs() >= Decimal::new(1, 2));
        }

        #[test]
        fn quantities_are_positive(qty in quantity_strategy()) {
            prop_assert!(qty > Decimal::ZERO);
        }
    }
}
