//! Test Data Builders
//!
//! Provides builder patterns for constructing test data with sensible defaults.
//! These builders allow tests to specify only the relevant fields while using
//! defaults for everything else.

use chrono::NaiveDate;
use core_kernel::{
    AccountId, BranchId, Currency, CustomerId, PayrollRunId, ProductId, PurchaseId,
    RentalInvoiceId, SaleId, TaxId,
};
use domain_ledger::{
    JournalLine, ManualEntryDraft, PayrollDocument, PurchaseDocument, RentalInvoiceDocument,
    SaleDocument,
};
use domain_pos::{CheckoutItem, CheckoutRequest, PaymentInput, PaymentMethod, SaleChannel};
use rust_decimal::Decimal;

use crate::fixtures::{IdFixtures, TemporalFixtures};

/// Builder for sale documents
///
/// The grand total is derived: `sub_total − discount_total + tax_total`.
pub struct SaleDocumentBuilder {
    id: SaleId,
    branch_id: BranchId,
    date: NaiveDate,
    currency: Currency,
    sub_total: Decimal,
    discount_total: Decimal,
    tax_total: Decimal,
    inclusive_tax: Decimal,
    is_paid: bool,
}

impl Default for SaleDocumentBuilder {
    fn default() -> Self {
        Self::new(SaleId::new(1))
    }
}

impl SaleDocumentBuilder {
    pub fn new(id: SaleId) -> Self {
        Self {
            id,
            branch_id: IdFixtures::BRANCH,
            date: TemporalFixtures::trading_date(),
            currency: Currency::USD,
            sub_total: Decimal::ZERO,
            discount_total: Decimal::ZERO,
            tax_total: Decimal::ZERO,
            inclusive_tax: Decimal::ZERO,
            is_paid: true,
        }
    }

    pub fn with_branch(mut self, branch_id: BranchId) -> Self {
        self.branch_id = branch_id;
        self
    }

    pub fn on(mut self, date: NaiveDate) -> Self {
        self.date = date;
        self
    }

    pub fn with_currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    pub fn with_sub_total(mut self, amount: Decimal) -> Self {
        self.sub_total = amount;
        self
    }

    pub fn with_discount(mut self, amount: Decimal) -> Self {
        self.discount_total = amount;
        self
    }

    pub fn with_tax(mut self, amount: Decimal) -> Self {
        self.tax_total = amount;
        self
    }

    /// Tax already contained in the sub-total; does not change the grand total
    pub fn with_inclusive_tax(mut self, amount: Decimal) -> Self {
        self.inclusive_tax = amount;
        self
    }

    /// Leaves the sale partly unpaid, so the total goes to receivables
    pub fn unpaid(mut self) -> Self {
        self.is_paid = false;
        self
    }

    pub fn build(self) -> SaleDocument {
        SaleDocument {
            id: self.id,
            branch_id: self.branch_id,
            date: self.date,
            currency: self.currency,
            sub_total: self.sub_total,
            discount_total: self.discount_total,
            tax_total: self.tax_total,
            inclusive_tax: self.inclusive_tax,
            grand_total: self.sub_total - self.discount_total + self.tax_total,
            is_paid: self.is_paid,
            journal_entry_id: None,
        }
    }
}

/// Builds a purchase document on the standard branch and trading date
pub fn purchase_document(
    id: i64,
    sub_total: Decimal,
    discount_total: Decimal,
    tax_total: Decimal,
    is_paid: bool,
) -> PurchaseDocument {
    PurchaseDocument {
        id: PurchaseId::new(id),
        branch_id: IdFixtures::BRANCH,
        date: TemporalFixtures::trading_date(),
        currency: Currency::USD,
        sub_total,
        discount_total,
        tax_total,
        grand_total: sub_total - discount_total + tax_total,
        is_paid,
        journal_entry_id: None,
    }
}

/// Builds a payroll document whose net pay is `gross − deductions`
pub fn payroll_document(id: i64, gross: Decimal, deductions: Decimal, is_paid: bool) -> PayrollDocument {
    PayrollDocument {
        id: PayrollRunId::new(id),
        branch_id: IdFixtures::BRANCH,
        date: TemporalFixtures::trading_date(),
        currency: Currency::USD,
        gross,
        deductions,
        net: gross - deductions,
        is_paid,
        journal_entry_id: None,
    }
}

pub fn rental_invoice_document(
    id: i64,
    sub_total: Decimal,
    tax_total: Decimal,
    is_paid: bool,
) -> RentalInvoiceDocument {
    RentalInvoiceDocument {
        id: RentalInvoiceId::new(id),
        branch_id: IdFixtures::BRANCH,
        date: TemporalFixtures::trading_date(),
        currency: Currency::USD,
        sub_total,
        discount_total: Decimal::ZERO,
        tax_total,
        total: sub_total + tax_total,
        is_paid,
        journal_entry_id: None,
    }
}

/// Builder for checkout requests
#[derive(Default)]
pub struct CheckoutRequestBuilder {
    request: CheckoutRequest,
}

impl CheckoutRequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn item(mut self, product_id: ProductId, qty: Decimal) -> Self {
        self.request.items.push(CheckoutItem::new(product_id, qty));
        self
    }

    /// Adds a prebuilt line, e.g. with a discount or price override
    pub fn line(mut self, item: CheckoutItem) -> Self {
        self.request.items.push(item);
        self
    }

    pub fn item_with_tax(mut self, product_id: ProductId, qty: Decimal, tax_id: TaxId) -> Self {
        self.request
            .items
            .push(CheckoutItem::new(product_id, qty).with_tax(tax_id));
        self
    }

    pub fn pay(mut self, method: PaymentMethod, amount: Decimal) -> Self {
        self.request.payments.push(PaymentInput::new(method, amount));
        self
    }

    pub fn channel(mut self, channel: SaleChannel) -> Self {
        self.request.channel = channel;
        self
    }

    pub fn customer(mut self, customer_id: CustomerId) -> Self {
        self.request.customer_id = Some(customer_id);
        self
    }

    pub fn build(self) -> CheckoutRequest {
        self.request
    }
}

/// Builder for manual journal drafts
pub struct ManualEntryBuilder {
    currency: Currency,
    entry_date: Option<NaiveDate>,
    description: String,
    lines: Vec<JournalLine>,
}

impl Default for ManualEntryBuilder {
    fn default() -> Self {
        Self::new("Manual adjustment")
    }
}

impl ManualEntryBuilder {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            currency: Currency::USD,
            entry_date: Some(TemporalFixtures::trading_date()),
            description: description.into(),
            lines: Vec::new(),
        }
    }

    pub fn with_currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    pub fn on(mut self, date: NaiveDate) -> Self {
        self.entry_date = Some(date);
        self
    }

    pub fn debit(mut self, account_id: AccountId, amount: Decimal) -> Self {
        self.lines.push(JournalLine::debit(account_id, amount));
        self
    }

    pub fn credit(mut self, account_id: AccountId, amount: Decimal) -> Self {
        self.lines.push(JournalLine::credit(account_id, amount));
        self
    }

    pub fn lines(mut self, lines: impl IntoIterator<Item = JournalLine>) -> Self {
        self.lines.extend(lines);
        self
    }

    pub fn build(self) -> ManualEntryDraft {
        ManualEntryDraft {
            currency: self.currency,
            entry_date: self.entry_date,
            description: self.description,
            lines: self.lines,
        }
    }
}
