//! Posting rules and reference numbers
//!
//! A source document describes its journal entry as a list of rules:
//! "debit the account mapped to `cash` with the grand total", "credit
//! `tax_payable` with the tax". Rules name semantic keys, not accounts; the
//! engine resolves them through the branch's account mappings.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::mapping::MappingKey;

/// Prefix of reversal entry references
pub const REVERSAL_PREFIX: &str = "REV";

/// Prefix of manual journal voucher references
pub const MANUAL_PREFIX: &str = "JV";

/// Side of a journal line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Debit,
    Credit,
}

/// One debit or credit derived from a source document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingRule {
    /// Semantic account the amount is booked to
    pub key: MappingKey,
    pub side: Side,
    /// Amount (always non-negative)
    pub amount: Decimal,
}

/// Builder for the rules of one entry
///
/// # Example
///
/// ```rust,ignore
/// let rules = RuleSet::new()
///     .debit(MappingKey::Cash, grand_total)
///     .credit(MappingKey::SalesRevenue, sub_total)
///     .credit_if_positive(MappingKey::TaxPayable, tax_total)
///     .into_rules();
/// ```
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<PostingRule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a debit rule
    pub fn debit(mut self, key: MappingKey, amount: Decimal) -> Self {
        self.rules.push(PostingRule { key, side: Side::Debit, amount });
        self
    }

    /// Adds a credit rule
    pub fn credit(mut self, key: MappingKey, amount: Decimal) -> Self {
        self.rules.push(PostingRule { key, side: Side::Credit, amount });
        self
    }

    /// Adds a debit rule only when `amount` is greater than zero
    pub fn debit_if_positive(self, key: MappingKey, amount: Decimal) -> Self {
        if amount > Decimal::ZERO {
            self.debit(key, amount)
        } else {
            self
        }
    }

    /// Adds a credit rule only when `amount` is greater than zero
    pub fn credit_if_positive(self, key: MappingKey, amount: Decimal) -> Self {
        if amount > Decimal::ZERO {
            self.credit(key, amount)
        } else {
            self
        }
    }

    pub fn into_rules(self) -> Vec<PostingRule> {
        self.rules
    }
}

/// Formats a journal reference number: `{PREFIX}-{YYYYMMDD}-{id zero-padded to 6}`
///
/// Ids wider than six digits are printed in full.
pub fn reference_number(prefix: &str, id: i64, date: NaiveDate) -> String {
    format!("{}-{}-{:06}", prefix, date.format("%Y%m%d"), id)
}
