//! Source documents that produce journal entries
//!
//! A journal entry generated by the engine points back at exactly one
//! business document. The link is a closed tagged union rather than a
//! free-form `(type, id)` pair, so every kind carries its own id type.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{
    BranchId, Currency, JournalEntryId, PayrollRunId, PurchaseId, RentalInvoiceId, SaleId,
};

use crate::mapping::MappingKey;
use crate::rules::{PostingRule, RuleSet};

/// Accounting module a source kind belongs to; account mappings are keyed by it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceModule {
    Sales,
    Purchases,
    Payroll,
    Rentals,
}

impl SourceModule {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceModule::Sales => "sales",
            SourceModule::Purchases => "purchases",
            SourceModule::Payroll => "payroll",
            SourceModule::Rentals => "rentals",
        }
    }
}

impl fmt::Display for SourceModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceModule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sales" => Ok(SourceModule::Sales),
            "purchases" => Ok(SourceModule::Purchases),
            "payroll" => Ok(SourceModule::Payroll),
            "rentals" => Ok(SourceModule::Rentals),
            other => Err(format!("unknown module: {other}")),
        }
    }
}

/// The business document a journal entry was generated from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum SourceDocument {
    Sale(SaleId),
    Purchase(PurchaseId),
    Payroll(PayrollRunId),
    RentalInvoice(RentalInvoiceId),
}

impl SourceDocument {
    pub fn module(&self) -> SourceModule {
        match self {
            SourceDocument::Sale(_) => SourceModule::Sales,
            SourceDocument::Purchase(_) => SourceModule::Purchases,
            SourceDocument::Payroll(_) => SourceModule::Payroll,
            SourceDocument::RentalInvoice(_) => SourceModule::Rentals,
        }
    }

    /// Stored `source_type` discriminator
    pub fn source_type(&self) -> &'static str {
        match self {
            SourceDocument::Sale(_) => "sale",
            SourceDocument::Purchase(_) => "purchase",
            SourceDocument::Payroll(_) => "payroll",
            SourceDocument::RentalInvoice(_) => "rental_invoice",
        }
    }

    /// Row key of the referenced document
    pub fn id_value(&self) -> i64 {
        match self {
            SourceDocument::Sale(id) => id.value(),
            SourceDocument::Purchase(id) => id.value(),
            SourceDocument::Payroll(id) => id.value(),
            SourceDocument::RentalInvoice(id) => id.value(),
        }
    }

    /// Prefix used in the reference number of the generated entry
    pub fn reference_prefix(&self) -> &'static str {
        match self {
            SourceDocument::Sale(_) => "SALE",
            SourceDocument::Purchase(_) => "PURCH",
            SourceDocument::Payroll(_) => "PAYR",
            SourceDocument::RentalInvoice(_) => "RENT",
        }
    }

    /// Rebuilds the document link from its stored `(source_type, source_id)` pair
    pub fn from_parts(source_type: &str, id: i64) -> Option<Self> {
        match source_type {
            "sale" => Some(SourceDocument::Sale(SaleId::new(id))),
            "purchase" => Some(SourceDocument::Purchase(PurchaseId::new(id))),
            "payroll" => Some(SourceDocument::Payroll(PayrollRunId::new(id))),
            "rental_invoice" => Some(SourceDocument::RentalInvoice(RentalInvoiceId::new(id))),
            _ => None,
        }
    }
}

impl fmt::Display for SourceDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceDocument::Sale(id) => write!(f, "sale {id}"),
            SourceDocument::Purchase(id) => write!(f, "purchase {id}"),
            SourceDocument::Payroll(id) => write!(f, "payroll run {id}"),
            SourceDocument::RentalInvoice(id) => write!(f, "rental invoice {id}"),
        }
    }
}

/// A document the ledger engine can turn into a journal entry
pub trait JournalSource {
    fn document(&self) -> SourceDocument;
    fn branch_id(&self) -> BranchId;
    fn document_date(&self) -> NaiveDate;
    fn currency(&self) -> Currency;
    /// Entry already generated for this document, if any
    fn journal_entry_id(&self) -> Option<JournalEntryId>;
    fn link_journal_entry(&mut self, entry_id: JournalEntryId);
    /// Debit/credit rules derived from the document's figures
    fn posting_rules(&self) -> Vec<PostingRule>;
    fn description(&self) -> String;
}

/// Ledger-side figures of a completed sale
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleDocument {
    pub id: SaleId,
    pub branch_id: BranchId,
    pub date: NaiveDate,
    pub currency: Currency,
    pub sub_total: Decimal,
    pub discount_total: Decimal,
    /// Exclusive tax added on top of the lines
    pub tax_total: Decimal,
    /// Tax already contained in `sub_total` by inclusive-priced lines
    #[serde(default)]
    pub inclusive_tax: Decimal,
    pub grand_total: Decimal,
    /// Fully settled at the till; otherwise the total goes to receivables
    pub is_paid: bool,
    pub journal_entry_id: Option<JournalEntryId>,
}

/// Ledger-side figures of a received purchase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseDocument {
    pub id: PurchaseId,
    pub branch_id: BranchId,
    pub date: NaiveDate,
    pub currency: Currency,
    pub sub_total: Decimal,
    pub discount_total: Decimal,
    pub tax_total: Decimal,
    pub grand_total: Decimal,
    pub is_paid: bool,
    pub journal_entry_id: Option<JournalEntryId>,
}

/// Ledger-side figures of a payroll run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollDocument {
    pub id: PayrollRunId,
    pub branch_id: BranchId,
    pub date: NaiveDate,
    pub currency: Currency,
    pub gross: Decimal,
    pub deductions: Decimal,
    pub net: Decimal,
    pub is_paid: bool,
    pub journal_entry_id: Option<JournalEntryId>,
}

/// Ledger-side figures of an issued rental invoice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RentalInvoiceDocument {
    pub id: RentalInvoiceId,
    pub branch_id: BranchId,
    pub date: NaiveDate,
    pub currency: Currency,
    pub sub_total: Decimal,
    pub discount_total: Decimal,
    pub tax_total: Decimal,
    pub total: Decimal,
    pub is_paid: bool,
    pub journal_entry_id: Option<JournalEntryId>,
}

macro_rules! impl_source_common {
    ($variant:ident) => {
        fn document(&self) -> SourceDocument {
            SourceDocument::$variant(self.id)
        }

        fn branch_id(&self) -> BranchId {
            self.branch_id
        }

        fn document_date(&self) -> NaiveDate {
            self.date
        }

        fn currency(&self) -> Currency {
            self.currency
        }

        fn journal_entry_id(&self) -> Option<JournalEntryId> {
            self.journal_entry_id
        }

        fn link_journal_entry(&mut self, entry_id: JournalEntryId) {
            self.journal_entry_id = Some(entry_id);
        }
    };
}

impl JournalSource for SaleDocument {
    impl_source_common!(Sale);

    fn posting_rules(&self) -> Vec<PostingRule> {
        let settlement = if self.is_paid {
            MappingKey::Cash
        } else {
            MappingKey::AccountsReceivable
        };
        RuleSet::new()
            .debit(settlement, self.grand_total)
            .debit_if_positive(MappingKey::SalesDiscount, self.discount_total)
            .credit(MappingKey::SalesRevenue, self.sub_total - self.inclusive_tax)
            .credit_if_positive(MappingKey::TaxPayable, self.tax_total + self.inclusive_tax)
            .into_rules()
    }

    fn description(&self) -> String {
        format!("Sale {}", self.id)
    }
}

impl JournalSource for PurchaseDocument {
    impl_source_common!(Purchase);

    fn posting_rules(&self) -> Vec<PostingRule> {
        let settlement = if self.is_paid {
            MappingKey::Cash
        } else {
            MappingKey::AccountsPayable
        };
        RuleSet::new()
            .debit(MappingKey::Inventory, self.sub_total - self.discount_total)
            .debit_if_positive(MappingKey::TaxRecoverable, self.tax_total)
            .credit(settlement, self.grand_total)
            .into_rules()
    }

    fn description(&self) -> String {
        format!("Purchase {}", self.id)
    }
}

impl JournalSource for PayrollDocument {
    impl_source_common!(Payroll);

    fn posting_rules(&self) -> Vec<PostingRule> {
        let settlement = if self.is_paid {
            MappingKey::Cash
        } else {
            MappingKey::SalariesPayable
        };
        RuleSet::new()
            .debit(MappingKey::SalariesExpense, self.gross)
            .credit_if_positive(MappingKey::PayrollDeductionsPayable, self.deductions)
            .credit(settlement, self.net)
            .into_rules()
    }

    fn description(&self) -> String {
        format!("Payroll run {}", self.id)
    }
}

impl JournalSource for RentalInvoiceDocument {
    impl_source_common!(RentalInvoice);

    fn posting_rules(&self) -> Vec<PostingRule> {
        let settlement = if self.is_paid {
            MappingKey::Cash
        } else {
            MappingKey::AccountsReceivable
        };
        RuleSet::new()
            .debit(settlement, self.total)
            .debit_if_positive(MappingKey::SalesDiscount, self.discount_total)
            .credit(MappingKey::RentalRevenue, self.sub_total)
            .credit_if_positive(MappingKey::TaxPayable, self.tax_total)
            .into_rules()
    }

    fn description(&self) -> String {
        format!("Rental invoice {}", self.id)
    }
}
