//! In-memory double-entry ledger
//!
//! This module provides a single-owner ledger that enforces the same rules
//! as the database-backed repository. It is used by tests, by tools that
//! replay documents, and as the reference behaviour for the repository.

use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::{info, warn};

use core_kernel::{AccountId, ActorContext, BranchId, Currency, FiscalPeriod, JournalEntryId, Money, MoneyError};

use crate::account::{Account, AccountType};
use crate::error::LedgerError;
use crate::journal::{
    account_deltas, build_generated_entry, build_manual_entry, build_reversal, check_cancellable,
    check_postable, JournalEntry, JournalLine, ManualEntryDraft, NewJournalEntry,
};
use crate::mapping::{AccountMappings, FiscalCalendarTable, MappingKey};
use crate::source::{JournalSource, SourceDocument, SourceModule};

/// The main ledger for tracking financial transactions
///
/// # Invariants
///
/// - Posted entries balance within the tolerance
/// - Account balances change only through posting (including the posting
///   performed by generation and reversal)
/// - Historical entries are never modified, only reversed; the reversal
///   link is the one field written after posting
/// - Every operation is all-or-nothing: it is computed in full before any
///   state is touched
#[derive(Debug)]
pub struct Ledger {
    /// Chart of accounts
    accounts: HashMap<AccountId, Account>,
    /// Running account balances
    balances: HashMap<AccountId, Money>,
    /// Journal entries by id
    entries: BTreeMap<JournalEntryId, JournalEntry>,
    /// Generated entry per source document
    generated: HashMap<SourceDocument, JournalEntryId>,
    mappings: AccountMappings,
    calendar: FiscalCalendarTable,
    /// Ledger currency
    currency: Currency,
    next_entry_id: i64,
}

impl Ledger {
    /// Creates an empty ledger in the specified currency
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let ledger = Ledger::new(Currency::USD);
    /// ```
    pub fn new(currency: Currency) -> Self {
        Self {
            accounts: HashMap::new(),
            balances: HashMap::new(),
            entries: BTreeMap::new(),
            generated: HashMap::new(),
            mappings: AccountMappings::new(),
            calendar: FiscalCalendarTable::new(),
            currency,
            next_entry_id: 1,
        }
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Adds an account to the chart of accounts
    ///
    /// # Errors
    ///
    /// Returns error if account already exists
    pub fn add_account(&mut self, account: Account) -> Result<(), LedgerError> {
        if self.accounts.contains_key(&account.id) {
            return Err(LedgerError::AccountAlreadyExists(account.id));
        }

        let account_id = account.id;
        self.accounts.insert(account_id, account);
        self.balances.insert(account_id, Money::zero(self.currency));

        Ok(())
    }

    /// Maps a semantic key to an existing account for a branch and module
    pub fn map_account(
        &mut self,
        branch_id: BranchId,
        module: SourceModule,
        key: MappingKey,
        account_id: AccountId,
    ) -> Result<(), LedgerError> {
        if !self.accounts.contains_key(&account_id) {
            return Err(LedgerError::AccountNotFound(account_id));
        }
        self.mappings.insert(branch_id, module, key, account_id);
        Ok(())
    }

    /// Replaces all account mappings
    pub fn set_mappings(&mut self, mappings: AccountMappings) {
        self.mappings = mappings;
    }

    pub fn add_fiscal_period(&mut self, period: FiscalPeriod) {
        self.calendar.add(period);
    }

    /// Gets an account by ID
    pub fn get_account(&self, id: &AccountId) -> Option<&Account> {
        self.accounts.get(id)
    }

    /// Gets the current balance of an account, or None if it doesn't exist
    pub fn get_balance(&self, id: &AccountId) -> Option<Money> {
        self.balances.get(id).copied()
    }

    pub fn get_entry(&self, id: &JournalEntryId) -> Option<&JournalEntry> {
        self.entries.get(id)
    }

    /// All entries in id order
    pub fn entries(&self) -> impl Iterator<Item = &JournalEntry> {
        self.entries.values()
    }

    /// Entries linked to a source document (the generated one and its reversal)
    pub fn entries_for_source(&self, document: SourceDocument) -> Vec<&JournalEntry> {
        self.entries
            .values()
            .filter(|e| e.source == Some(document))
            .collect()
    }

    /// Generates, posts and links the journal entry for a source document
    ///
    /// # Errors
    ///
    /// - `AlreadyGenerated` if the document already links an entry or the
    ///   ledger already holds one for it
    /// - `MissingMapping` if any rule cannot be resolved; nothing is created
    /// - `Unbalanced` if the document's figures do not balance
    /// - `AccountNotFound` if a mapping points at an unknown account
    pub fn generate_entry<S: JournalSource + ?Sized>(
        &mut self,
        source: &mut S,
        ctx: &ActorContext,
    ) -> Result<JournalEntry, LedgerError> {
        let document = source.document();
        if let Some(existing) = self.generated.get(&document) {
            return Err(LedgerError::AlreadyGenerated {
                document,
                entry_id: Some(*existing),
            });
        }

        let new_entry = build_generated_entry(&*source, &self.mappings, &self.calendar, ctx)
            .inspect_err(|e| warn!(%document, error = %e, "journal generation rejected"))?;
        let updates = self.balance_updates(new_entry.currency, &new_entry.lines)?;

        let entry = self.insert(new_entry);
        self.commit_balances(updates);
        self.generated.insert(document, entry.id);
        source.link_journal_entry(entry.id);

        info!(
            entry_id = %entry.id,
            reference = %entry.reference_number,
            %document,
            "journal entry generated"
        );
        Ok(entry)
    }

    /// Records a draft manual entry; balance is checked when it is posted
    pub fn create_manual_entry(
        &mut self,
        draft: ManualEntryDraft,
        ctx: &ActorContext,
    ) -> Result<JournalEntry, LedgerError> {
        for line in &draft.lines {
            if !self.accounts.contains_key(&line.account_id) {
                return Err(LedgerError::AccountNotFound(line.account_id));
            }
        }
        let new_entry = build_manual_entry(draft, &self.calendar, ctx)?;
        Ok(self.insert(new_entry))
    }

    /// Posts a draft entry and applies its balance changes
    ///
    /// # Errors
    ///
    /// - `EntryNotFound` for an unknown id
    /// - `AlreadyPosted` if the entry is posted
    /// - `NotDraft` if the entry is cancelled
    /// - `Unbalanced` if debits and credits differ by 0.01 or more
    pub fn post_entry(&mut self, id: JournalEntryId, ctx: &ActorContext) -> Result<JournalEntry, LedgerError> {
        let entry = self.entries.get(&id).ok_or(LedgerError::EntryNotFound(id))?;
        check_postable(entry)?;
        let updates = self.balance_updates(entry.currency, &entry.lines)?;

        self.commit_balances(updates);
        let entry = self.entries.get_mut(&id).ok_or(LedgerError::EntryNotFound(id))?;
        entry.mark_posted(ctx);

        info!(entry_id = %id, reference = %entry.reference_number, "journal entry posted");
        Ok(entry.clone())
    }

    /// Creates a reversal entry for a posted entry
    ///
    /// The reversal is posted immediately, which returns every touched
    /// account to its balance before the original was posted.
    ///
    /// # Errors
    ///
    /// - `NotPosted`, `NotReversible`, `AlreadyReversed` per the entry's state
    pub fn reverse_entry(
        &mut self,
        id: JournalEntryId,
        reason: &str,
        ctx: &ActorContext,
    ) -> Result<JournalEntry, LedgerError> {
        let original = self.entries.get(&id).ok_or(LedgerError::EntryNotFound(id))?;
        let new_entry = build_reversal(original, reason, &self.calendar, ctx)?;
        let updates = self.balance_updates(new_entry.currency, &new_entry.lines)?;

        let reversal = self.insert(new_entry);
        self.commit_balances(updates);
        if let Some(original) = self.entries.get_mut(&id) {
            original.reversed_by = Some(reversal.id);
        }

        info!(entry_id = %id, reversal_id = %reversal.id, reason, "journal entry reversed");
        Ok(reversal)
    }

    /// Cancels a draft entry; no balance effect
    pub fn cancel_entry(&mut self, id: JournalEntryId, _ctx: &ActorContext) -> Result<JournalEntry, LedgerError> {
        let entry = self.entries.get_mut(&id).ok_or(LedgerError::EntryNotFound(id))?;
        check_cancellable(entry)?;
        entry.mark_cancelled();
        Ok(entry.clone())
    }

    fn insert(&mut self, new_entry: NewJournalEntry) -> JournalEntry {
        let id = JournalEntryId::new(self.next_entry_id);
        self.next_entry_id += 1;
        let entry = new_entry.into_entry(id);
        self.entries.insert(id, entry.clone());
        entry
    }

    /// Computes the new balance of every touched account without applying it
    fn balance_updates(
        &self,
        currency: Currency,
        lines: &[JournalLine],
    ) -> Result<Vec<(AccountId, Money)>, LedgerError> {
        if currency != self.currency {
            return Err(MoneyError::CurrencyMismatch(currency.to_string(), self.currency.to_string()).into());
        }

        let deltas = account_deltas(lines, |id| self.accounts.get(&id).map(|a| a.account_type))?;
        deltas
            .into_iter()
            .map(|(account_id, delta)| {
                let balance = self
                    .balances
                    .get(&account_id)
                    .ok_or(LedgerError::AccountNotFound(account_id))?;
                Ok((account_id, balance.checked_add_decimal(delta)?))
            })
            .collect()
    }

    fn commit_balances(&mut self, updates: Vec<(AccountId, Money)>) {
        for (account_id, balance) in updates {
            self.balances.insert(account_id, balance);
        }
    }

    /// Generates a trial balance report over every account with a balance
    pub fn trial_balance(&self) -> TrialBalance {
        let rows = self.balances.iter().filter_map(|(account_id, balance)| {
            self.accounts.get(account_id).map(|account| (account, *balance))
        });
        TrialBalance::from_balances(self.currency, rows)
    }
}

/// Trial balance report
#[derive(Debug, Clone, Serialize)]
pub struct TrialBalance {
    /// Individual account entries
    pub entries: Vec<TrialBalanceEntry>,
    /// Total debits
    pub total_debits: Money,
    /// Total credits
    pub total_credits: Money,
    /// Whether the trial balance is balanced
    pub is_balanced: bool,
}

impl TrialBalance {
    /// Builds the report from account balances
    ///
    /// Each account's balance is shown in the column of its normal balance,
    /// or in the opposite column when it has gone negative. Accounts with a
    /// zero balance are omitted; rows are ordered by account code.
    pub fn from_balances<'a, I>(currency: Currency, balances: I) -> Self
    where
        I: IntoIterator<Item = (&'a Account, Money)>,
    {
        let mut entries = Vec::new();
        let mut total_debits = Decimal::ZERO;
        let mut total_credits = Decimal::ZERO;

        for (account, balance) in balances {
            if balance.is_zero() {
                continue;
            }

            let on_debit_side = account.account_type.is_debit_normal() != balance.is_negative();
            let amount = balance.amount().abs();
            let (debit, credit) = if on_debit_side {
                (amount, Decimal::ZERO)
            } else {
                (Decimal::ZERO, amount)
            };

            total_debits += debit;
            total_credits += credit;
            entries.push(TrialBalanceEntry {
                account_id: account.id,
                account_code: account.code.clone(),
                account_name: account.name.clone(),
                account_type: account.account_type,
                debit: Money::new(debit, currency),
                credit: Money::new(credit, currency),
            });
        }

        entries.sort_by(|a, b| a.account_code.cmp(&b.account_code));

        TrialBalance {
            entries,
            total_debits: Money::new(total_debits, currency),
            total_credits: Money::new(total_credits, currency),
            is_balanced: total_debits == total_credits,
        }
    }
}

/// A single entry in the trial balance
#[derive(Debug, Clone, Serialize)]
pub struct TrialBalanceEntry {
    pub account_id: AccountId,
    pub account_code: String,
    pub account_name: String,
    pub account_type: AccountType,
    /// Debit balance
    pub debit: Money,
    /// Credit balance
    pub credit: Money,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use core_kernel::{SaleId, UserId};
    use rust_decimal_macros::dec;

    use crate::account::RetailChartOfAccounts;
    use crate::source::SaleDocument;

    fn setup_ledger() -> Ledger {
        let mut ledger = Ledger::new(Currency::USD);
        for account in RetailChartOfAccounts::create_standard_accounts() {
            ledger.add_account(account).unwrap();
        }
        ledger.set_mappings(AccountMappings::standard(BranchId::new(1)));
        ledger
    }

    fn ctx() -> ActorContext {
        ActorContext::new(UserId::new(1), BranchId::new(1))
            .at(Utc.with_ymd_and_hms(2025, 3, 5, 12, 0, 0).unwrap())
    }

    fn sale() -> SaleDocument {
        SaleDocument {
            id: SaleId::new(42),
            branch_id: BranchId::new(1),
            date: NaiveDate::from_ymd_opt(2025, 3, 5).unwrap(),
            currency: Currency::USD,
            sub_total: dec!(20),
            discount_total: dec!(2),
            tax_total: dec!(0),
            inclusive_tax: dec!(0),
            grand_total: dec!(18),
            is_paid: true,
            journal_entry_id: None,
        }
    }

    #[test]
    fn test_generated_sale_entry() {
        let mut ledger = setup_ledger();
        let mut sale = sale();

        let entry = ledger.generate_entry(&mut sale, &ctx()).unwrap();

        assert_eq!(entry.reference_number, "SALE-20250305-000042");
        assert!(entry.validate_balance());
        assert_eq!(sale.journal_entry_id, Some(entry.id));
        assert_eq!(ledger.get_balance(&RetailChartOfAccounts::CASH).unwrap().amount(), dec!(18));
        assert_eq!(ledger.get_balance(&RetailChartOfAccounts::SALES_REVENUE).unwrap().amount(), dec!(20));
        assert_eq!(ledger.get_balance(&RetailChartOfAccounts::SALES_DISCOUNT).unwrap().amount(), dec!(-2));
    }

    #[test]
    fn test_trial_balance_balances_after_generation() {
        let mut ledger = setup_ledger();
        ledger.generate_entry(&mut sale(), &ctx()).unwrap();

        let tb = ledger.trial_balance();
        assert!(tb.is_balanced);
        assert_eq!(tb.total_debits.amount(), dec!(20));
        assert_eq!(tb.entries.first().map(|e| e.account_code.as_str()), Some("1000"));
    }

    #[test]
    fn test_unknown_account_in_manual_entry() {
        let mut ledger = setup_ledger();
        let draft = ManualEntryDraft {
            currency: Currency::USD,
            entry_date: None,
            description: "typo".into(),
            lines: vec![JournalLine::debit(AccountId::new(77), dec!(1))],
        };
        assert_eq!(
            ledger.create_manual_entry(draft, &ctx()).unwrap_err(),
            LedgerError::AccountNotFound(AccountId::new(77))
        );
    }
}
