//! Custom Test Assertions
//!
//! Provides specialized assertion helpers for ledger and sale invariants
//! that give more meaningful error messages than standard assertions.

use core_kernel::{round_amount, AccountId, Money};
use domain_ledger::{EntryStatus, JournalEntry, Ledger, TrialBalance};
use domain_pos::{NewSale, SaleStatus};
use rust_decimal::Decimal;

/// Asserts that two Money values are approximately equal within a tolerance
///
/// # Panics
///
/// Panics if the currencies don't match or the amounts differ by more than tolerance
pub fn assert_money_approx_eq(actual: &Money, expected: &Money, tolerance: Decimal) {
    assert_eq!(
        actual.currency(),
        expected.currency(),
        "Currency mismatch: actual={}, expected={}",
        actual.currency(),
        expected.currency()
    );

    let diff = (actual.amount() - expected.amount()).abs();
    assert!(
        diff <= tolerance,
        "Money amounts differ by more than tolerance: actual={}, expected={}, diff={}, tolerance={}",
        actual.amount(),
        expected.amount(),
        diff,
        tolerance
    );
}

/// Asserts that an entry's debits equal its credits exactly
pub fn assert_entry_balanced(entry: &JournalEntry) {
    let (debits, credits) = entry.totals();
    assert_eq!(
        debits, credits,
        "Entry {} is unbalanced: debits={}, credits={}",
        entry.reference_number, debits, credits
    );
}

/// Asserts that `reversal` is the posted mirror image of `original`
pub fn assert_reversal_of(reversal: &JournalEntry, original: &JournalEntry) {
    assert_eq!(reversal.reverses, Some(original.id), "reversal does not link its original");
    assert_eq!(reversal.status, EntryStatus::Posted, "reversal is not posted");
    assert_eq!(
        reversal.lines.len(),
        original.lines.len(),
        "reversal of {} has a different line count",
        original.reference_number
    );
    for (rev, orig) in reversal.lines.iter().zip(&original.lines) {
        assert_eq!(rev.account_id, orig.account_id);
        assert_eq!(rev.debit, orig.credit, "debit/credit not swapped on {}", rev.account_id);
        assert_eq!(rev.credit, orig.debit, "debit/credit not swapped on {}", rev.account_id);
    }
}

/// Asserts an account's ledger balance
pub fn assert_balance(ledger: &Ledger, account_id: AccountId, expected: Decimal) {
    let actual = ledger
        .get_balance(&account_id)
        .unwrap_or_else(|| panic!("account {account_id} not in ledger"));
    assert_eq!(
        actual.amount(),
        expected,
        "Balance of {} is {}, expected {}",
        account_id,
        actual.amount(),
        expected
    );
}

/// Asserts that every account balance is zero
pub fn assert_all_balances_zero(ledger: &Ledger) {
    let trial_balance = ledger.trial_balance();
    assert!(
        trial_balance.entries.is_empty(),
        "Expected all balances zero, found {:?}",
        trial_balance
            .entries
            .iter()
            .map(|e| (&e.account_code, e.debit.amount(), e.credit.amount()))
            .collect::<Vec<_>>()
    );
}

pub fn assert_trial_balance_balanced(trial_balance: &TrialBalance) {
    assert!(
        trial_balance.is_balanced,
        "Trial balance is off: debits={}, credits={}",
        trial_balance.total_debits.amount(),
        trial_balance.total_credits.amount()
    );
}

/// Asserts the header arithmetic of a priced sale
///
/// - grand total is `sub − discount + exclusive tax`, rounded to cents
/// - line totals add up to the grand total
/// - `paid + due` covers the grand total and the status agrees with it
pub fn assert_sale_totals_consistent(sale: &NewSale) {
    let expected_grand = round_amount(sale.sub_total - sale.discount_total + sale.tax_total, 2);
    assert_eq!(sale.grand_total, expected_grand, "grand total arithmetic");

    let lines: Decimal = sale.items.iter().map(|i| i.line_total).sum();
    assert!(
        (lines - sale.grand_total).abs() <= Decimal::new(1, 2) * Decimal::from(sale.items.len()),
        "line totals {} drift from grand total {}",
        lines,
        sale.grand_total
    );

    assert!(sale.paid_total + sale.due_total >= sale.grand_total);
    match sale.status {
        SaleStatus::Completed => assert_eq!(sale.due_total, Decimal::ZERO),
        SaleStatus::Partial => assert!(sale.due_total > Decimal::ZERO),
    }
}
