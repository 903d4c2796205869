//! Ledger-side views of persisted business documents
//!
//! The point-of-sale and ledger domains do not know about each other; this
//! module is where a completed sale becomes a journal source.

use core_kernel::Timezone;
use domain_ledger::SaleDocument;
use domain_pos::Sale;

/// The ledger figures of a sale, dated on the branch-local calendar day
///
/// This is the only projection of a sale into the ledger: generation in
/// [`LedgerRepository`](crate::LedgerRepository) goes through it as well.
pub fn sale_document(sale: &Sale, timezone: &Timezone) -> SaleDocument {
    SaleDocument {
        id: sale.id,
        branch_id: sale.branch_id,
        date: timezone.local_date(sale.created_at),
        currency: sale.currency,
        sub_total: sale.sub_total,
        discount_total: sale.discount_total,
        tax_total: sale.tax_total,
        inclusive_tax: sale.inclusive_tax(),
        grand_total: sale.grand_total,
        is_paid: sale.is_paid(),
        journal_entry_id: sale.journal_entry_id,
    }
}
