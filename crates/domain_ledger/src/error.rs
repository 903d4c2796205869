//! Ledger domain errors

use rust_decimal::Decimal;
use thiserror::Error;

use core_kernel::{AccountId, BranchId, JournalEntryId, MoneyError};

use crate::journal::EntryStatus;
use crate::mapping::MappingKey;
use crate::source::{SourceDocument, SourceModule};

/// Errors that can occur in the ledger domain
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The source document already has a journal entry
    #[error("Journal entry already generated for {document}")]
    AlreadyGenerated {
        document: SourceDocument,
        entry_id: Option<JournalEntryId>,
    },

    #[error("Journal entry {0} is already posted")]
    AlreadyPosted(JournalEntryId),

    /// Debits and credits differ by more than the tolerance
    #[error("Unbalanced journal entry: debits={debits}, credits={credits}")]
    Unbalanced {
        debits: Decimal,
        credits: Decimal,
    },

    #[error("Journal entry {0} is not posted")]
    NotPosted(JournalEntryId),

    #[error("Journal entry {0} is not reversible")]
    NotReversible(JournalEntryId),

    #[error("Journal entry {entry_id} was already reversed by {reversed_by}")]
    AlreadyReversed {
        entry_id: JournalEntryId,
        reversed_by: JournalEntryId,
    },

    #[error("Journal entry {entry_id} is {status}, expected draft")]
    NotDraft {
        entry_id: JournalEntryId,
        status: EntryStatus,
    },

    /// No account is mapped for the branch, module and semantic key
    #[error("No account mapped for {module}.{key} in branch {branch_id}")]
    MissingMapping {
        branch_id: BranchId,
        module: SourceModule,
        key: MappingKey,
    },

    #[error("Journal entry not found: {0}")]
    EntryNotFound(JournalEntryId),

    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    #[error("Account already exists: {0}")]
    AccountAlreadyExists(AccountId),

    #[error("Journal entry has no lines")]
    EmptyEntry,

    #[error("Invalid journal line: {0}")]
    InvalidLine(String),

    #[error("Money error: {0}")]
    Money(#[from] MoneyError),
}
