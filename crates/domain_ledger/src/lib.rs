//! Ledger Domain - Double-Entry Journal Engine
//!
//! This crate turns retail source documents (sales, purchases, payroll runs,
//! rental invoices) into balanced journal entries and enforces the posting
//! lifecycle of those entries.
//!
//! # Double-Entry Accounting Principles
//!
//! Every journal entry carries balanced debits and credits:
//! - Debits increase asset/expense accounts
//! - Credits increase liability/equity/revenue accounts
//! - The sum of all debits must equal the sum of all credits (within 0.01)
//!
//! # Generation
//!
//! A source document yields posting rules over semantic account keys
//! (`cash`, `sales_revenue`, `tax_payable`, ...). The branch's account
//! mappings resolve them to accounts; any missing mapping aborts generation
//! before anything is created.
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_ledger::{Ledger, SaleDocument};
//!
//! let mut ledger = Ledger::new(Currency::USD);
//! let entry = ledger.generate_entry(&mut sale_document, &ctx)?;
//! let reversal = ledger.reverse_entry(entry.id, "Customer return", &ctx)?;
//! ```

pub mod account;
pub mod error;
pub mod journal;
pub mod ledger;
pub mod mapping;
pub mod rules;
pub mod source;

pub use account::{Account, AccountType, RetailChartOfAccounts};
pub use error::LedgerError;
pub use journal::{
    account_deltas, build_generated_entry, build_manual_entry, build_reversal, check_cancellable,
    check_postable, check_reversible, totals, validate_balance, EntryStatus, JournalEntry,
    JournalLine, ManualEntryDraft, NewJournalEntry, BALANCE_TOLERANCE,
};
pub use ledger::{Ledger, TrialBalance, TrialBalanceEntry};
pub use mapping::{AccountMappingLookup, AccountMappings, FiscalCalendar, FiscalCalendarTable, MappingKey};
pub use rules::{reference_number, PostingRule, RuleSet, Side, MANUAL_PREFIX, REVERSAL_PREFIX};
pub use source::{
    JournalSource, PayrollDocument, PurchaseDocument, RentalInvoiceDocument, SaleDocument,
    SourceDocument, SourceModule,
};
