//! Comprehensive tests for domain_ledger

use chrono::{NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::{
    AccountId, ActorContext, BranchId, Currency, FiscalPeriod, FiscalPeriodId, PayrollRunId,
    PurchaseId, RentalInvoiceId, SaleId, UserId,
};

use domain_ledger::{
    Account, AccountMappings, AccountType, EntryStatus, JournalLine, JournalSource, Ledger,
    LedgerError, ManualEntryDraft, MappingKey, PayrollDocument, PurchaseDocument,
    RentalInvoiceDocument, RetailChartOfAccounts as Chart, SaleDocument, SourceDocument,
    SourceModule,
};

const BRANCH: BranchId = BranchId::new(1);

fn ctx() -> ActorContext {
    ActorContext::new(UserId::new(7), BRANCH).at(Utc.with_ymd_and_hms(2025, 3, 5, 9, 30, 0).unwrap())
}

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 5).unwrap()
}

fn setup_ledger() -> Ledger {
    let mut ledger = Ledger::new(Currency::USD);
    for account in Chart::create_standard_accounts() {
        ledger.add_account(account).unwrap();
    }
    ledger.set_mappings(AccountMappings::standard(BRANCH));
    ledger
}

fn balance(ledger: &Ledger, id: AccountId) -> Decimal {
    ledger.get_balance(&id).unwrap().amount()
}

fn sale(id: i64, sub: Decimal, discount: Decimal, tax: Decimal, paid: bool) -> SaleDocument {
    SaleDocument {
        id: SaleId::new(id),
        branch_id: BRANCH,
        date: date(),
        currency: Currency::USD,
        sub_total: sub,
        discount_total: discount,
        tax_total: tax,
        inclusive_tax: Decimal::ZERO,
        grand_total: sub - discount + tax,
        is_paid: paid,
        journal_entry_id: None,
    }
}

fn manual(lines: Vec<JournalLine>) -> ManualEntryDraft {
    ManualEntryDraft {
        currency: Currency::USD,
        entry_date: None,
        description: "Adjustment".to_string(),
        lines,
    }
}

// ============================================================================
// Account Tests
// ============================================================================

mod account_tests {
    use super::*;

    #[test]
    fn test_account_type_is_debit_normal() {
        assert!(AccountType::Asset.is_debit_normal());
        assert!(AccountType::Expense.is_debit_normal());
        assert!(!AccountType::Liability.is_debit_normal());
        assert!(!AccountType::Equity.is_debit_normal());
        assert!(!AccountType::Revenue.is_debit_normal());
    }

    #[test]
    fn test_account_new() {
        let account = Account::new(AccountId::new(10), "1010", "Petty Cash", AccountType::Asset)
            .with_parent(Chart::CASH);

        assert_eq!(account.code, "1010");
        assert_eq!(account.parent_id, Some(Chart::CASH));
        assert!(account.is_active);
    }

    #[test]
    fn test_duplicate_account_rejected() {
        let mut ledger = setup_ledger();
        let result = ledger.add_account(Account::new(Chart::CASH, "1000", "Cash", AccountType::Asset));
        assert_eq!(result, Err(LedgerError::AccountAlreadyExists(Chart::CASH)));
    }

    #[test]
    fn test_map_account_requires_existing_account() {
        let mut ledger = setup_ledger();
        let result = ledger.map_account(BRANCH, SourceModule::Sales, MappingKey::Cash, AccountId::new(999));
        assert_eq!(result, Err(LedgerError::AccountNotFound(AccountId::new(999))));
    }
}

// ============================================================================
// Generation Tests
// ============================================================================

mod generation_tests {
    use super::*;

    #[test]
    fn test_sale_with_tax_and_discount() {
        let mut ledger = setup_ledger();
        let mut doc = sale(42, dec!(100), dec!(10), dec!(13.50), true);

        let entry = ledger.generate_entry(&mut doc, &ctx()).unwrap();

        assert_eq!(entry.status, EntryStatus::Posted);
        assert!(entry.is_auto_generated);
        assert!(entry.is_reversible);
        assert_eq!(entry.source, Some(SourceDocument::Sale(SaleId::new(42))));
        assert_eq!(entry.lines.len(), 4);
        assert_eq!(entry.totals(), (dec!(113.50), dec!(113.50)));
        assert_eq!(entry.approved_by, Some(UserId::new(7)));

        assert_eq!(balance(&ledger, Chart::CASH), dec!(103.50));
        assert_eq!(balance(&ledger, Chart::SALES_REVENUE), dec!(100));
        assert_eq!(balance(&ledger, Chart::TAX_PAYABLE), dec!(13.50));
    }

    #[test]
    fn test_inclusive_tax_moves_from_revenue_to_tax_payable() {
        let mut ledger = setup_ledger();
        let mut doc = sale(8, dec!(115), dec!(0), dec!(0), true);
        doc.inclusive_tax = dec!(15);

        let entry = ledger.generate_entry(&mut doc, &ctx()).unwrap();

        assert_eq!(entry.lines.len(), 3);
        assert_eq!(entry.totals(), (dec!(115), dec!(115)));
        assert_eq!(balance(&ledger, Chart::CASH), dec!(115));
        assert_eq!(balance(&ledger, Chart::SALES_REVENUE), dec!(100));
        assert_eq!(balance(&ledger, Chart::TAX_PAYABLE), dec!(15));
    }

    #[test]
    fn test_partial_sale_goes_to_receivables() {
        let mut ledger = setup_ledger();
        let mut doc = sale(1, dec!(100), dec!(0), dec!(0), false);

        ledger.generate_entry(&mut doc, &ctx()).unwrap();

        assert_eq!(balance(&ledger, Chart::ACCOUNTS_RECEIVABLE), dec!(100));
        assert_eq!(balance(&ledger, Chart::CASH), dec!(0));
    }

    #[test]
    fn test_purchase_on_credit() {
        let mut ledger = setup_ledger();
        let mut doc = PurchaseDocument {
            id: PurchaseId::new(5),
            branch_id: BRANCH,
            date: date(),
            currency: Currency::USD,
            sub_total: dec!(500),
            discount_total: dec!(50),
            tax_total: dec!(67.50),
            grand_total: dec!(517.50),
            is_paid: false,
            journal_entry_id: None,
        };

        let entry = ledger.generate_entry(&mut doc, &ctx()).unwrap();

        assert_eq!(entry.reference_number, "PURCH-20250305-000005");
        assert_eq!(balance(&ledger, Chart::INVENTORY), dec!(450));
        assert_eq!(balance(&ledger, Chart::TAX_RECOVERABLE), dec!(67.50));
        assert_eq!(balance(&ledger, Chart::ACCOUNTS_PAYABLE), dec!(517.50));
    }

    #[test]
    fn test_payroll_with_deductions() {
        let mut ledger = setup_ledger();
        let mut doc = PayrollDocument {
            id: PayrollRunId::new(3),
            branch_id: BRANCH,
            date: date(),
            currency: Currency::USD,
            gross: dec!(10000),
            deductions: dec!(1200),
            net: dec!(8800),
            is_paid: true,
            journal_entry_id: None,
        };

        let entry = ledger.generate_entry(&mut doc, &ctx()).unwrap();

        assert_eq!(entry.lines.len(), 3);
        assert_eq!(balance(&ledger, Chart::SALARIES_EXPENSE), dec!(10000));
        assert_eq!(balance(&ledger, Chart::PAYROLL_DEDUCTIONS_PAYABLE), dec!(1200));
        assert_eq!(balance(&ledger, Chart::CASH), dec!(-8800));
    }

    #[test]
    fn test_payroll_that_does_not_add_up_is_unbalanced() {
        let mut ledger = setup_ledger();
        let mut doc = PayrollDocument {
            id: PayrollRunId::new(4),
            branch_id: BRANCH,
            date: date(),
            currency: Currency::USD,
            gross: dec!(1000),
            deductions: dec!(100),
            net: dec!(850),
            is_paid: false,
            journal_entry_id: None,
        };

        let result = ledger.generate_entry(&mut doc, &ctx());
        assert!(matches!(result, Err(LedgerError::Unbalanced { .. })));
        assert_eq!(ledger.entries().count(), 0);
        assert!(doc.journal_entry_id.is_none());
    }

    #[test]
    fn test_rental_invoice() {
        let mut ledger = setup_ledger();
        let mut doc = RentalInvoiceDocument {
            id: RentalInvoiceId::new(8),
            branch_id: BRANCH,
            date: date(),
            currency: Currency::USD,
            sub_total: dec!(200),
            discount_total: dec!(20),
            tax_total: dec!(27),
            total: dec!(207),
            is_paid: false,
            journal_entry_id: None,
        };

        let entry = ledger.generate_entry(&mut doc, &ctx()).unwrap();

        assert_eq!(entry.reference_number, "RENT-20250305-000008");
        assert_eq!(balance(&ledger, Chart::ACCOUNTS_RECEIVABLE), dec!(207));
        assert_eq!(balance(&ledger, Chart::RENTAL_REVENUE), dec!(200));
    }

    #[test]
    fn test_second_generation_is_rejected() {
        let mut ledger = setup_ledger();
        let mut doc = sale(42, dec!(20), dec!(0), dec!(0), true);
        let first = ledger.generate_entry(&mut doc, &ctx()).unwrap();

        let again = ledger.generate_entry(&mut doc, &ctx());
        assert!(matches!(
            again,
            Err(LedgerError::AlreadyGenerated { entry_id: Some(id), .. }) if id == first.id
        ));

        // A fresh copy of the document without the link is caught by the store
        let mut copy = sale(42, dec!(20), dec!(0), dec!(0), true);
        assert!(matches!(
            ledger.generate_entry(&mut copy, &ctx()),
            Err(LedgerError::AlreadyGenerated { .. })
        ));
        assert_eq!(ledger.entries().count(), 1);
        assert_eq!(balance(&ledger, Chart::CASH), dec!(20));
    }

    #[test]
    fn test_missing_mapping_creates_nothing() {
        let mut ledger = setup_ledger();
        let mappings = AccountMappings::new()
            .with(BRANCH, SourceModule::Sales, MappingKey::Cash, Chart::CASH)
            .with(BRANCH, SourceModule::Sales, MappingKey::SalesRevenue, Chart::SALES_REVENUE);
        ledger.set_mappings(mappings);
        let mut doc = sale(42, dec!(100), dec!(0), dec!(15), true);

        let result = ledger.generate_entry(&mut doc, &ctx());

        assert_eq!(
            result.unwrap_err(),
            LedgerError::MissingMapping {
                branch_id: BRANCH,
                module: SourceModule::Sales,
                key: MappingKey::TaxPayable,
            }
        );
        assert_eq!(ledger.entries().count(), 0);
        assert_eq!(balance(&ledger, Chart::CASH), dec!(0));
        assert!(doc.journal_entry_id().is_none());
    }

    #[test]
    fn test_fiscal_period_is_tagged_when_found() {
        let mut ledger = setup_ledger();
        ledger.add_fiscal_period(
            FiscalPeriod::new(
                FiscalPeriodId::new(1),
                BRANCH,
                2025,
                3,
                NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
                NaiveDate::from_ymd_opt(2025, 3, 31).unwrap(),
            )
            .unwrap(),
        );

        let entry = ledger.generate_entry(&mut sale(1, dec!(10), dec!(0), dec!(0), true), &ctx()).unwrap();
        assert_eq!((entry.fiscal_year, entry.fiscal_period), (Some(2025), Some(3)));

        let mut other_branch = sale(2, dec!(10), dec!(0), dec!(0), true);
        other_branch.branch_id = BranchId::new(2);
        ledger.set_mappings(AccountMappings::standard(BranchId::new(2)));
        let entry = ledger.generate_entry(&mut other_branch, &ctx()).unwrap();
        assert_eq!((entry.fiscal_year, entry.fiscal_period), (None, None));
    }
}

// ============================================================================
// Posting Tests
// ============================================================================

mod posting_tests {
    use super::*;

    #[test]
    fn test_manual_entry_is_a_draft_until_posted() {
        let mut ledger = setup_ledger();
        let draft = manual(vec![
            JournalLine::debit(Chart::CASH, dec!(500)),
            JournalLine::credit(Chart::RETAINED_EARNINGS, dec!(500)),
        ]);

        let entry = ledger.create_manual_entry(draft, &ctx()).unwrap();
        assert_eq!(entry.status, EntryStatus::Draft);
        assert!(!entry.is_auto_generated);
        assert!(entry.reference_number.starts_with("JV-20250305-"));
        assert_eq!(balance(&ledger, Chart::CASH), dec!(0));

        let posted = ledger.post_entry(entry.id, &ctx()).unwrap();
        assert_eq!(posted.status, EntryStatus::Posted);
        assert_eq!(posted.approved_by, Some(UserId::new(7)));
        assert_eq!(balance(&ledger, Chart::CASH), dec!(500));
        assert_eq!(balance(&ledger, Chart::RETAINED_EARNINGS), dec!(500));
    }

    #[test]
    fn test_unbalanced_draft_cannot_be_posted() {
        let mut ledger = setup_ledger();
        let entry = ledger
            .create_manual_entry(
                manual(vec![
                    JournalLine::debit(Chart::CASH, dec!(100)),
                    JournalLine::credit(Chart::SALES_REVENUE, dec!(99.98)),
                ]),
                &ctx(),
            )
            .unwrap();

        let result = ledger.post_entry(entry.id, &ctx());
        assert_eq!(
            result.unwrap_err(),
            LedgerError::Unbalanced { debits: dec!(100), credits: dec!(99.98) }
        );
        assert_eq!(ledger.get_entry(&entry.id).unwrap().status, EntryStatus::Draft);
        assert_eq!(balance(&ledger, Chart::CASH), dec!(0));
    }

    #[test]
    fn test_post_twice_is_rejected() {
        let mut ledger = setup_ledger();
        let entry = ledger
            .create_manual_entry(
                manual(vec![
                    JournalLine::debit(Chart::CASH, dec!(1)),
                    JournalLine::credit(Chart::SALES_REVENUE, dec!(1)),
                ]),
                &ctx(),
            )
            .unwrap();
        ledger.post_entry(entry.id, &ctx()).unwrap();

        assert_eq!(ledger.post_entry(entry.id, &ctx()), Err(LedgerError::AlreadyPosted(entry.id)));
        assert_eq!(balance(&ledger, Chart::CASH), dec!(1));
    }

    #[test]
    fn test_cancelled_draft_cannot_be_posted() {
        let mut ledger = setup_ledger();
        let entry = ledger
            .create_manual_entry(manual(vec![JournalLine::debit(Chart::CASH, dec!(1))]), &ctx())
            .unwrap();

        let cancelled = ledger.cancel_entry(entry.id, &ctx()).unwrap();
        assert_eq!(cancelled.status, EntryStatus::Cancelled);

        assert!(matches!(
            ledger.post_entry(entry.id, &ctx()),
            Err(LedgerError::NotDraft { status: EntryStatus::Cancelled, .. })
        ));
        assert!(matches!(ledger.cancel_entry(entry.id, &ctx()), Err(LedgerError::NotDraft { .. })));
    }

    #[test]
    fn test_empty_manual_entry_rejected() {
        let mut ledger = setup_ledger();
        assert_eq!(ledger.create_manual_entry(manual(vec![]), &ctx()), Err(LedgerError::EmptyEntry));
    }

    #[test]
    fn test_unknown_entry() {
        let mut ledger = setup_ledger();
        let id = core_kernel::JournalEntryId::new(404);
        assert_eq!(ledger.post_entry(id, &ctx()), Err(LedgerError::EntryNotFound(id)));
    }
}

// ============================================================================
// Reversal Tests
// ============================================================================

mod reversal_tests {
    use super::*;

    #[test]
    fn test_reversal_swaps_lines_and_restores_balances() {
        let mut ledger = setup_ledger();
        let mut doc = sale(42, dec!(100), dec!(10), dec!(13.50), true);
        let original = ledger.generate_entry(&mut doc, &ctx()).unwrap();

        let reversal = ledger.reverse_entry(original.id, "Customer return", &ctx()).unwrap();

        assert_eq!(reversal.reference_number, format!("REV-20250305-{:06}", original.id.value()));
        assert_eq!(reversal.status, EntryStatus::Posted);
        assert!(!reversal.is_reversible);
        assert_eq!(reversal.reverses, Some(original.id));
        assert_eq!(reversal.source, original.source);
        for (orig, rev) in original.lines.iter().zip(&reversal.lines) {
            assert_eq!(orig.account_id, rev.account_id);
            assert_eq!(orig.debit, rev.credit);
            assert_eq!(orig.credit, rev.debit);
            assert!(rev.description.as_deref().unwrap().starts_with("Reversal:"));
        }

        for account in Chart::create_standard_accounts() {
            assert_eq!(balance(&ledger, account.id), dec!(0), "account {}", account.code);
        }
        assert_eq!(ledger.get_entry(&original.id).unwrap().reversed_by, Some(reversal.id));
        assert_eq!(ledger.entries_for_source(SourceDocument::Sale(SaleId::new(42))).len(), 2);
    }

    #[test]
    fn test_double_reversal_rejected() {
        let mut ledger = setup_ledger();
        let original = ledger
            .generate_entry(&mut sale(1, dec!(50), dec!(0), dec!(0), true), &ctx())
            .unwrap();
        let reversal = ledger.reverse_entry(original.id, "error", &ctx()).unwrap();

        assert_eq!(
            ledger.reverse_entry(original.id, "again", &ctx()),
            Err(LedgerError::AlreadyReversed { entry_id: original.id, reversed_by: reversal.id })
        );
        assert_eq!(ledger.entries().count(), 2);
    }

    #[test]
    fn test_reversal_itself_is_not_reversible() {
        let mut ledger = setup_ledger();
        let original = ledger
            .generate_entry(&mut sale(1, dec!(50), dec!(0), dec!(0), true), &ctx())
            .unwrap();
        let reversal = ledger.reverse_entry(original.id, "error", &ctx()).unwrap();

        assert_eq!(
            ledger.reverse_entry(reversal.id, "undo", &ctx()),
            Err(LedgerError::NotReversible(reversal.id))
        );
    }

    #[test]
    fn test_draft_cannot_be_reversed() {
        let mut ledger = setup_ledger();
        let entry = ledger
            .create_manual_entry(manual(vec![JournalLine::debit(Chart::CASH, dec!(1))]), &ctx())
            .unwrap();
        assert_eq!(ledger.reverse_entry(entry.id, "x", &ctx()), Err(LedgerError::NotPosted(entry.id)));
    }

    #[test]
    fn test_reversal_references_unique_across_source_kinds() {
        let mut ledger = setup_ledger();
        let sale_entry = ledger
            .generate_entry(&mut sale(1, dec!(50), dec!(0), dec!(0), true), &ctx())
            .unwrap();
        let mut purchase = PurchaseDocument {
            id: PurchaseId::new(1),
            branch_id: BRANCH,
            date: date(),
            currency: Currency::USD,
            sub_total: dec!(20),
            discount_total: dec!(0),
            tax_total: dec!(0),
            grand_total: dec!(20),
            is_paid: true,
            journal_entry_id: None,
        };
        let purchase_entry = ledger.generate_entry(&mut purchase, &ctx()).unwrap();

        let sale_reversal = ledger.reverse_entry(sale_entry.id, "void", &ctx()).unwrap();
        let purchase_reversal = ledger.reverse_entry(purchase_entry.id, "void", &ctx()).unwrap();

        assert_ne!(sale_reversal.reference_number, purchase_reversal.reference_number);
        assert_eq!(
            sale_reversal.reference_number,
            format!("REV-20250305-{:06}", sale_entry.id.value())
        );
    }

    #[test]
    fn test_manual_reversal_reference_uses_entry_id() {
        let mut ledger = setup_ledger();
        let entry = ledger
            .create_manual_entry(
                manual(vec![
                    JournalLine::debit(Chart::CASH, dec!(5)),
                    JournalLine::credit(Chart::RETAINED_EARNINGS, dec!(5)),
                ]),
                &ctx(),
            )
            .unwrap();
        ledger.post_entry(entry.id, &ctx()).unwrap();

        let reversal = ledger.reverse_entry(entry.id, "duplicate", &ctx()).unwrap();
        assert_eq!(reversal.reference_number, format!("REV-20250305-{:06}", entry.id.value()));
    }
}

// ============================================================================
// Property Tests
// ============================================================================

mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn amount() -> impl Strategy<Value = Decimal> {
        (1i64..1_000_000).prop_map(|cents| Decimal::new(cents, 2))
    }

    proptest! {
        #[test]
        fn post_succeeds_iff_balanced(debits in prop::collection::vec(amount(), 1..5), credits in prop::collection::vec(amount(), 1..5)) {
            let mut ledger = setup_ledger();
            let mut lines: Vec<JournalLine> = debits.iter().map(|a| JournalLine::debit(Chart::CASH, *a)).collect();
            lines.extend(credits.iter().map(|a| JournalLine::credit(Chart::SALES_REVENUE, *a)));
            let balanced = debits.iter().sum::<Decimal>() == credits.iter().sum::<Decimal>();

            let entry = ledger.create_manual_entry(manual(lines), &ctx()).unwrap();
            let result = ledger.post_entry(entry.id, &ctx());

            if balanced {
                prop_assert!(result.is_ok());
            } else {
                let is_unbalanced = matches!(result, Err(LedgerError::Unbalanced { .. }));
                prop_assert!(is_unbalanced);
                prop_assert_eq!(balance(&ledger, Chart::CASH), Decimal::ZERO);
            }
        }

        #[test]
        fn reversal_restores_prior_balances(
            sub in amount(),
            discount_pct in 0u32..50,
            tax_pct in 0u32..20,
            paid in any::<bool>(),
        ) {
            let mut ledger = setup_ledger();
            let mut first = sale(1, dec!(300), dec!(0), dec!(0), true);
            ledger.generate_entry(&mut first, &ctx()).unwrap();
            let before: Vec<Decimal> = Chart::create_standard_accounts().iter().map(|a| balance(&ledger, a.id)).collect();

            let discount = (sub * Decimal::from(discount_pct) / dec!(100)).round_dp(2);
            let tax = ((sub - discount) * Decimal::from(tax_pct) / dec!(100)).round_dp(2);
            let mut doc = sale(2, sub, discount, tax, paid);
            let entry = ledger.generate_entry(&mut doc, &ctx()).unwrap();
            prop_assert!(entry.validate_balance());
            ledger.reverse_entry(entry.id, "property", &ctx()).unwrap();

            let after: Vec<Decimal> = Chart::create_standard_accounts().iter().map(|a| balance(&ledger, a.id)).collect();
            prop_assert_eq!(before, after);
            prop_assert!(ledger.trial_balance().is_balanced);
        }
    }
}
