//! Journal entries, lines, and the pure rules that govern them
//!
//! Everything in this module is a pure function of its inputs. The
//! in-memory [`Ledger`](crate::Ledger) and the PostgreSQL repository both
//! load the state they need, call these functions, and then persist the
//! outcome in one step, so the two stores cannot drift apart on the rules.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use core_kernel::{
    round_amount, AccountId, ActorContext, BranchId, Currency, JournalEntryId, UserId, STORAGE_DP,
};

use crate::account::AccountType;
use crate::error::LedgerError;
use crate::mapping::{AccountMappingLookup, FiscalCalendar};
use crate::rules::{reference_number, Side, MANUAL_PREFIX, REVERSAL_PREFIX};
use crate::source::{JournalSource, SourceDocument};

/// Largest tolerated difference between total debits and total credits
pub const BALANCE_TOLERANCE: Decimal = dec!(0.01);

/// Lifecycle status of a journal entry
///
/// Transitions only move forward: draft → posted or draft → cancelled.
/// Reversal is recorded by link, not by status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Draft,
    Posted,
    Cancelled,
}

impl EntryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryStatus::Draft => "draft",
            EntryStatus::Posted => "posted",
            EntryStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(EntryStatus::Draft),
            "posted" => Ok(EntryStatus::Posted),
            "cancelled" => Ok(EntryStatus::Cancelled),
            other => Err(format!("unknown entry status: {other}")),
        }
    }
}

/// A single line of a journal entry
///
/// Normally exactly one of `debit` and `credit` is non-zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalLine {
    pub account_id: AccountId,
    pub debit: Decimal,
    pub credit: Decimal,
    pub description: Option<String>,
}

impl JournalLine {
    /// Creates a debit line
    pub fn debit(account_id: AccountId, amount: Decimal) -> Self {
        Self {
            account_id,
            debit: round_amount(amount, STORAGE_DP),
            credit: Decimal::ZERO,
            description: None,
        }
    }

    /// Creates a credit line
    pub fn credit(account_id: AccountId, amount: Decimal) -> Self {
        Self {
            account_id,
            debit: Decimal::ZERO,
            credit: round_amount(amount, STORAGE_DP),
            description: None,
        }
    }

    /// Adds a description to the line
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// The same line with debit and credit swapped
    pub fn swapped(&self) -> Self {
        Self {
            account_id: self.account_id,
            debit: self.credit,
            credit: self.debit,
            description: self.description.clone(),
        }
    }

    fn check(&self) -> Result<(), LedgerError> {
        if self.debit < Decimal::ZERO || self.credit < Decimal::ZERO {
            return Err(LedgerError::InvalidLine(format!(
                "negative amount on account {}",
                self.account_id
            )));
        }
        Ok(())
    }
}

/// Sums the debit and credit columns
pub fn totals(lines: &[JournalLine]) -> (Decimal, Decimal) {
    lines.iter().fold((Decimal::ZERO, Decimal::ZERO), |(dr, cr), line| {
        (dr + line.debit, cr + line.credit)
    })
}

/// True iff `|Σdebit − Σcredit| < 0.01`
pub fn validate_balance(lines: &[JournalLine]) -> bool {
    let (debits, credits) = totals(lines);
    (debits - credits).abs() < BALANCE_TOLERANCE
}

fn ensure_balanced(lines: &[JournalLine]) -> Result<(), LedgerError> {
    if validate_balance(lines) {
        Ok(())
    } else {
        let (debits, credits) = totals(lines);
        Err(LedgerError::Unbalanced { debits, credits })
    }
}

/// A journal entry with its lines
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: JournalEntryId,
    /// Unique `{PREFIX}-{YYYYMMDD}-{id}` reference
    pub reference_number: String,
    pub branch_id: BranchId,
    pub currency: Currency,
    pub entry_date: NaiveDate,
    pub fiscal_year: Option<i32>,
    pub fiscal_period: Option<u32>,
    pub status: EntryStatus,
    /// Absent for manual entries
    pub source: Option<SourceDocument>,
    pub description: String,
    pub is_auto_generated: bool,
    pub is_reversible: bool,
    /// Entry that reversed this one
    pub reversed_by: Option<JournalEntryId>,
    /// Entry this one reverses
    pub reverses: Option<JournalEntryId>,
    pub created_by: UserId,
    pub approved_by: Option<UserId>,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub lines: Vec<JournalLine>,
}

impl JournalEntry {
    pub fn totals(&self) -> (Decimal, Decimal) {
        totals(&self.lines)
    }

    pub fn validate_balance(&self) -> bool {
        validate_balance(&self.lines)
    }

    /// Marks the entry posted and approved by the acting user
    pub fn mark_posted(&mut self, ctx: &ActorContext) {
        self.status = EntryStatus::Posted;
        self.approved_by = Some(ctx.user_id);
        self.approved_at = Some(ctx.requested_at);
    }

    pub fn mark_cancelled(&mut self) {
        self.status = EntryStatus::Cancelled;
    }
}

/// A journal entry that has not been assigned an id yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewJournalEntry {
    /// `None` for manual entries: the reference derives from the allocated id
    pub reference_number: Option<String>,
    pub branch_id: BranchId,
    pub currency: Currency,
    pub entry_date: NaiveDate,
    pub fiscal_year: Option<i32>,
    pub fiscal_period: Option<u32>,
    pub status: EntryStatus,
    pub source: Option<SourceDocument>,
    pub description: String,
    pub is_auto_generated: bool,
    pub is_reversible: bool,
    pub reverses: Option<JournalEntryId>,
    pub created_by: UserId,
    pub approved_by: Option<UserId>,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub lines: Vec<JournalLine>,
}

impl NewJournalEntry {
    /// Completes the entry once the store has allocated its id
    pub fn into_entry(self, id: JournalEntryId) -> JournalEntry {
        let reference_number = self
            .reference_number
            .unwrap_or_else(|| reference_number(MANUAL_PREFIX, id.value(), self.entry_date));

        JournalEntry {
            id,
            reference_number,
            branch_id: self.branch_id,
            currency: self.currency,
            entry_date: self.entry_date,
            fiscal_year: self.fiscal_year,
            fiscal_period: self.fiscal_period,
            status: self.status,
            source: self.source,
            description: self.description,
            is_auto_generated: self.is_auto_generated,
            is_reversible: self.is_reversible,
            reversed_by: None,
            reverses: self.reverses,
            created_by: self.created_by,
            approved_by: self.approved_by,
            approved_at: self.approved_at,
            created_at: self.created_at,
            lines: self.lines,
        }
    }
}

/// Input of a manual journal voucher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualEntryDraft {
    pub currency: Currency,
    /// Defaults to the date of the request
    pub entry_date: Option<NaiveDate>,
    pub description: String,
    pub lines: Vec<JournalLine>,
}

fn fiscal_fields(
    calendar: &dyn FiscalCalendar,
    branch_id: BranchId,
    date: NaiveDate,
) -> (Option<i32>, Option<u32>) {
    match calendar.period_for(branch_id, date) {
        Some(period) => (Some(period.fiscal_year), Some(period.period)),
        None => {
            debug!(%branch_id, %date, "no fiscal period for date");
            (None, None)
        }
    }
}

/// Builds the posted entry for a source document
///
/// Every posting rule is resolved to an account before anything is built,
/// so a missing mapping fails the whole generation. The resulting entry is
/// posted, auto-generated and reversible; the caller applies its balance
/// changes and links the source in the same unit of work.
///
/// # Errors
///
/// - `AlreadyGenerated` if the source already links an entry
/// - `MissingMapping` if any rule's semantic key is unmapped
/// - `Unbalanced` if the source's figures do not balance
pub fn build_generated_entry<S: JournalSource + ?Sized>(
    source: &S,
    mappings: &dyn AccountMappingLookup,
    calendar: &dyn FiscalCalendar,
    ctx: &ActorContext,
) -> Result<NewJournalEntry, LedgerError> {
    let document = source.document();
    if let Some(entry_id) = source.journal_entry_id() {
        return Err(LedgerError::AlreadyGenerated {
            document,
            entry_id: Some(entry_id),
        });
    }

    let branch_id = source.branch_id();
    let module = document.module();

    let lines = source
        .posting_rules()
        .into_iter()
        .map(|rule| {
            let account_id = mappings
                .resolve(branch_id, module, rule.key)
                .ok_or(LedgerError::MissingMapping {
                    branch_id,
                    module,
                    key: rule.key,
                })?;
            Ok(match rule.side {
                Side::Debit => JournalLine::debit(account_id, rule.amount),
                Side::Credit => JournalLine::credit(account_id, rule.amount),
            })
        })
        .collect::<Result<Vec<_>, LedgerError>>()?;

    if lines.is_empty() {
        return Err(LedgerError::EmptyEntry);
    }
    ensure_balanced(&lines)?;

    let entry_date = source.document_date();
    let (fiscal_year, fiscal_period) = fiscal_fields(calendar, branch_id, entry_date);

    Ok(NewJournalEntry {
        reference_number: Some(reference_number(
            document.reference_prefix(),
            document.id_value(),
            ctx.requested_at.date_naive(),
        )),
        branch_id,
        currency: source.currency(),
        entry_date,
        fiscal_year,
        fiscal_period,
        status: EntryStatus::Posted,
        source: Some(document),
        description: source.description(),
        is_auto_generated: true,
        is_reversible: true,
        reverses: None,
        created_by: ctx.user_id,
        approved_by: Some(ctx.user_id),
        approved_at: Some(ctx.requested_at),
        created_at: ctx.requested_at,
        lines,
    })
}

/// Builds a draft manual entry; balance is only enforced when it is posted
pub fn build_manual_entry(
    draft: ManualEntryDraft,
    calendar: &dyn FiscalCalendar,
    ctx: &ActorContext,
) -> Result<NewJournalEntry, LedgerError> {
    if draft.lines.is_empty() {
        return Err(LedgerError::EmptyEntry);
    }
    for line in &draft.lines {
        line.check()?;
    }

    let entry_date = draft
        .entry_date
        .unwrap_or_else(|| ctx.requested_at.date_naive());
    let (fiscal_year, fiscal_period) = fiscal_fields(calendar, ctx.branch_id, entry_date);

    let lines = draft
        .lines
        .into_iter()
        .map(|line| JournalLine {
            debit: round_amount(line.debit, STORAGE_DP),
            credit: round_amount(line.credit, STORAGE_DP),
            ..line
        })
        .collect();

    Ok(NewJournalEntry {
        reference_number: None,
        branch_id: ctx.branch_id,
        currency: draft.currency,
        entry_date,
        fiscal_year,
        fiscal_period,
        status: EntryStatus::Draft,
        source: None,
        description: draft.description,
        is_auto_generated: false,
        is_reversible: true,
        reverses: None,
        created_by: ctx.user_id,
        approved_by: None,
        approved_at: None,
        created_at: ctx.requested_at,
        lines,
    })
}

/// Checks that a draft may be posted
pub fn check_postable(entry: &JournalEntry) -> Result<(), LedgerError> {
    match entry.status {
        EntryStatus::Posted => return Err(LedgerError::AlreadyPosted(entry.id)),
        EntryStatus::Cancelled => {
            return Err(LedgerError::NotDraft {
                entry_id: entry.id,
                status: entry.status,
            })
        }
        EntryStatus::Draft => {}
    }
    if entry.lines.is_empty() {
        return Err(LedgerError::EmptyEntry);
    }
    ensure_balanced(&entry.lines)
}

pub fn check_cancellable(entry: &JournalEntry) -> Result<(), LedgerError> {
    if entry.status != EntryStatus::Draft {
        return Err(LedgerError::NotDraft {
            entry_id: entry.id,
            status: entry.status,
        });
    }
    Ok(())
}

/// Checks that an entry may be reversed
pub fn check_reversible(entry: &JournalEntry) -> Result<(), LedgerError> {
    if entry.status != EntryStatus::Posted {
        return Err(LedgerError::NotPosted(entry.id));
    }
    if !entry.is_reversible {
        return Err(LedgerError::NotReversible(entry.id));
    }
    if let Some(reversed_by) = entry.reversed_by {
        return Err(LedgerError::AlreadyReversed {
            entry_id: entry.id,
            reversed_by,
        });
    }
    Ok(())
}

/// Builds the posted entry that reverses `original`
///
/// Lines are the original's with debit and credit swapped. The reversal is
/// itself not reversible. The caller applies its balance changes and sets
/// `original.reversed_by` in the same unit of work.
pub fn build_reversal(
    original: &JournalEntry,
    reason: &str,
    calendar: &dyn FiscalCalendar,
    ctx: &ActorContext,
) -> Result<NewJournalEntry, LedgerError> {
    check_reversible(original)?;

    let entry_date = ctx.requested_at.date_naive();
    let (fiscal_year, fiscal_period) = fiscal_fields(calendar, original.branch_id, entry_date);

    let lines = original
        .lines
        .iter()
        .map(|line| {
            let text = line.description.as_deref().unwrap_or(reason);
            line.swapped().with_description(format!("Reversal: {text}"))
        })
        .collect();

    Ok(NewJournalEntry {
        reference_number: Some(reference_number(REVERSAL_PREFIX, original.id.value(), entry_date)),
        branch_id: original.branch_id,
        currency: original.currency,
        entry_date,
        fiscal_year,
        fiscal_period,
        status: EntryStatus::Posted,
        source: original.source,
        description: format!("Reversal of {}: {}", original.reference_number, reason),
        is_auto_generated: original.is_auto_generated,
        is_reversible: false,
        reverses: Some(original.id),
        created_by: ctx.user_id,
        approved_by: Some(ctx.user_id),
        approved_at: Some(ctx.requested_at),
        created_at: ctx.requested_at,
        lines,
    })
}

/// Net balance change per account, ordered by account id
///
/// For every line `net = debit − credit` is added to asset and expense
/// accounts and subtracted from liability, equity and revenue accounts.
pub fn account_deltas<F>(lines: &[JournalLine], account_type: F) -> Result<BTreeMap<AccountId, Decimal>, LedgerError>
where
    F: Fn(AccountId) -> Option<AccountType>,
{
    let mut deltas = BTreeMap::new();
    for line in lines {
        let ty = account_type(line.account_id).ok_or(LedgerError::AccountNotFound(line.account_id))?;
        *deltas.entry(line.account_id).or_insert(Decimal::ZERO) += ty.balance_delta(line.debit, line.credit);
    }
    Ok(deltas)
}
